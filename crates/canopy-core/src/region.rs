//! Regions: the geometries statistics are aggregated over, and the two ways
//! of producing them (point buffers and administrative polygons).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{MultiPolygon, Point, Polygon, DEFAULT_CIRCLE_SEGMENTS};

/// Buffer radii applied to every point site, in grid units.
pub const DEFAULT_BUFFER_RADII: [f64; 3] = [1000.0, 3000.0, 5000.0];

/// Administrative level of a region; decides its output columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionKind {
    Village,
    VillageTract,
    Township,
    State,
}

impl RegionKind {
    /// Short form used in output file names.
    pub fn slug(self) -> &'static str {
        match self {
            RegionKind::Village => "village",
            RegionKind::VillageTract => "VT",
            RegionKind::Township => "TS",
            RegionKind::State => "state",
        }
    }

    /// Whether regions of this kind come from point sites.
    pub fn is_point_based(self) -> bool {
        matches!(self, RegionKind::Village)
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegionKind::Village => "village",
            RegionKind::VillageTract => "village_tract",
            RegionKind::Township => "township",
            RegionKind::State => "state",
        };
        f.write_str(s)
    }
}

/// A named geometry statistics are computed over.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub kind: RegionKind,
    pub name: String,
    /// Administrative code (PCODE) for polygon regions.
    pub code: Option<String>,
    /// Buffer radius for point-derived regions.
    pub buffer: Option<f64>,
    pub geometry: MultiPolygon,
}

// ── Sources ───────────────────────────────────────────────────────────────────

/// A named point location, e.g. a village.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointSite {
    pub name: String,
    pub x: f64,
    pub y: f64,
}

impl PointSite {
    pub fn location(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A named administrative polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonFeature {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    pub geometry: MultiPolygon,
}

// ── Expansion ─────────────────────────────────────────────────────────────────

/// Buffer every site at every radius.
///
/// Output is grouped by radius, then by site order, so all 1000-unit buffers
/// come first.
pub fn expand_points(sites: &[PointSite], radii: &[f64], segments: usize) -> Vec<Region> {
    let segments = if segments < 3 { DEFAULT_CIRCLE_SEGMENTS } else { segments };
    let regions: Vec<Region> = radii
        .iter()
        .flat_map(|&radius| {
            sites.iter().map(move |site| Region {
                kind: RegionKind::Village,
                name: site.name.clone(),
                code: None,
                buffer: Some(radius),
                geometry: Polygon::circle(site.location(), radius, segments).into(),
            })
        })
        .collect();
    debug!(sites = sites.len(), radii = radii.len(), regions = regions.len(), "expanded point sites");
    regions
}

/// Wrap polygon features as regions of `kind`.
pub fn polygon_regions(kind: RegionKind, features: Vec<PolygonFeature>) -> Vec<Region> {
    features
        .into_iter()
        .map(|f| Region { kind, name: f.name, code: f.code, buffer: None, geometry: f.geometry })
        .collect()
}

// ── Area-of-interest filter ───────────────────────────────────────────────────

/// Reference geometry used to discard irrelevant polygons before the year
/// expansion.
#[derive(Debug, Clone)]
pub enum AreaOfInterest {
    Points(Vec<Point>),
    Polygons(Vec<MultiPolygon>),
}

impl AreaOfInterest {
    fn touches(&self, geom: &MultiPolygon) -> bool {
        match self {
            AreaOfInterest::Points(pts) => {
                let bbox = geom.bbox();
                pts.iter().any(|&p| bbox.contains_point(p) && geom.contains(p))
            }
            AreaOfInterest::Polygons(polys) => polys.iter().any(|p| geom.intersects(p)),
        }
    }
}

/// Keep regions that intersect the area of interest, preserving order.
pub fn filter_by_area(regions: Vec<Region>, aoi: &AreaOfInterest) -> Vec<Region> {
    let before = regions.len();
    let kept: Vec<Region> = regions.into_iter().filter(|r| aoi.touches(&r.geometry)).collect();
    debug!(before, after = kept.len(), "area-of-interest filter");
    kept
}
