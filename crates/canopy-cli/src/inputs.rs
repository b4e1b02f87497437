//! Loading rasters and regions named by the config.

use anyhow::{Context, Result};
use tracing::info;

use canopy_core::region::{expand_points, filter_by_area, polygon_regions};
use canopy_core::sources::{load_event_raster, load_grid, load_points, load_polygons};
use canopy_core::{AreaOfInterest, CellArea, EventStack, GridSpec, Region};

use crate::config::{CanopyConfig, CategoryToml, CellAreaToml, FilterKind};

/// Load and cross-check the three event rasters.
pub fn load_events(cfg: &CanopyConfig) -> Result<EventStack> {
    let r = &cfg.rasters;
    let estab = load_event_raster(&cfg.resolve(&r.establishment), "establishment", r.establishment_nodata)?;
    let gain = load_event_raster(&cfg.resolve(&r.gain), "gain", r.gain_nodata)?;
    let loss = load_event_raster(&cfg.resolve(&r.loss), "loss", r.loss_nodata)?;
    let stack = EventStack::new(estab, gain, loss).context("event rasters are inconsistent")?;
    info!(grid = %stack.spec(), "event rasters loaded");
    Ok(stack)
}

pub fn cell_area(cfg: &CanopyConfig, spec: &GridSpec) -> Result<CellArea> {
    let area = match &cfg.cell_area {
        CellAreaToml::Planar => CellArea::planar(spec),
        CellAreaToml::Geographic => CellArea::geographic(spec),
        CellAreaToml::Uniform { value } => CellArea::Uniform(*value),
        CellAreaToml::Raster { path } => CellArea::Raster(load_grid(&cfg.resolve(path), "cell area")?),
    };
    area.check(spec).context("cell area raster does not match the event grid")?;
    Ok(area)
}

/// Build the regions of one category, applying its area-of-interest filter.
pub fn category_regions(cfg: &CanopyConfig, cat: &CategoryToml) -> Result<Vec<Region>> {
    let source = cfg.resolve(&cat.source);
    let regions = if cat.kind.is_point_based() {
        let sites = load_points(&source)?;
        expand_points(&sites, &cfg.buffers.radii, cfg.buffers.segments)
    } else {
        polygon_regions(cat.kind, load_polygons(&source)?)
    };

    let Some(filter) = &cat.filter else {
        return Ok(regions);
    };
    let path = cfg.resolve(&filter.path);
    let aoi = match filter.kind {
        FilterKind::Points => {
            AreaOfInterest::Points(load_points(&path)?.iter().map(|s| s.location()).collect())
        }
        FilterKind::Polygons => {
            AreaOfInterest::Polygons(load_polygons(&path)?.into_iter().map(|f| f.geometry).collect())
        }
    };
    Ok(filter_by_area(regions, &aoi))
}
