//! Control-region shuffler: random relocation and rotation of polygons inside
//! a base region, used to build control samples.

use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::ShuffleError;
use crate::geometry::{BBox, MultiPolygon, Point};

/// Placement attempts per polygon before the last candidate is kept.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 1000;

/// Draws per random interior point.
const MAX_POINT_DRAWS: usize = 100_000;

/// Relocate every polygon to a random spot inside `base`.
///
/// Output order matches input order. A polygon that never fits is returned in
/// its last candidate position.
pub fn shuffle_all<R: Rng + ?Sized>(
    polygons: &[MultiPolygon],
    base: &MultiPolygon,
    rng: &mut R,
) -> Result<Vec<MultiPolygon>, ShuffleError> {
    if base.is_empty() || base.area() <= 0.0 {
        return Err(ShuffleError::EmptyBase);
    }
    info!(polygons = polygons.len(), "shuffling");
    let mut out = Vec::with_capacity(polygons.len());
    for (i, poly) in polygons.iter().enumerate() {
        let (placed, attempts) = shuffle_one(poly, base, rng)?;
        if attempts > MAX_PLACEMENT_ATTEMPTS {
            warn!(index = i, "polygon never fit inside the base region, keeping last candidate");
        } else {
            debug!(index = i, attempts, "placed");
        }
        out.push(placed);
    }
    Ok(out)
}

/// Returns the placed polygon and the attempts used; more than
/// [`MAX_PLACEMENT_ATTEMPTS`] means it did not fit.
fn shuffle_one<R: Rng + ?Sized>(
    poly: &MultiPolygon,
    base: &MultiPolygon,
    rng: &mut R,
) -> Result<(MultiPolygon, usize), ShuffleError> {
    let extent = base.bbox();
    let mut candidate = place(poly, base, &extent, rng)?;
    let mut attempts = 1;
    while !candidate.within(base) {
        if attempts > MAX_PLACEMENT_ATTEMPTS {
            break;
        }
        candidate = place(poly, base, &extent, rng)?;
        attempts += 1;
    }
    Ok((candidate, attempts))
}

/// One move-rotate-wrap candidate.
fn place<R: Rng + ?Sized>(
    poly: &MultiPolygon,
    base: &MultiPolygon,
    extent: &BBox,
    rng: &mut R,
) -> Result<MultiPolygon, ShuffleError> {
    let target = random_point(base, extent, rng)?;
    let c = poly.centroid();
    let moved = poly.translate(target.x - c.x, target.y - c.y);
    let angle = rng.gen_range(0.0..360.0);
    let rotated = moved.rotate(angle, moved.centroid());
    Ok(wrap_into(&rotated, extent))
}

/// Uniform point inside `base` by rejection sampling over its extent.
fn random_point<R: Rng + ?Sized>(
    base: &MultiPolygon,
    extent: &BBox,
    rng: &mut R,
) -> Result<Point, ShuffleError> {
    for _ in 0..MAX_POINT_DRAWS {
        let p = Point::new(
            rng.gen_range(extent.min_x..=extent.max_x),
            rng.gen_range(extent.min_y..=extent.max_y),
        );
        if base.contains(p) {
            return Ok(p);
        }
    }
    Err(ShuffleError::NoInteriorPoint { draws: MAX_POINT_DRAWS })
}

/// Shift each component whose extent leaves `extent` by one extent width or
/// height, according to where its centroid fell.
fn wrap_into(geom: &MultiPolygon, extent: &BBox) -> MultiPolygon {
    let (w, h) = (extent.width(), extent.height());
    let parts = geom
        .polygons()
        .iter()
        .map(|p| {
            let part = MultiPolygon::from(p.clone());
            if extent.contains_bbox(&part.bbox()) {
                return part;
            }
            let c = part.centroid();
            let dx = if c.x < extent.min_x {
                w
            } else if c.x > extent.max_x {
                -w
            } else {
                0.0
            };
            let dy = if c.y < extent.min_y {
                h
            } else if c.y > extent.max_y {
                -h
            } else {
                0.0
            };
            part.translate(dx, dy)
        })
        .flat_map(|m| m.0)
        .collect();
    MultiPolygon(parts)
}
