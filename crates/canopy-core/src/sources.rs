//! JSON input and output for rasters and region sources.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ForestError;
use crate::events::EventRaster;
use crate::grid::Grid;
use crate::region::{PointSite, PolygonFeature};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot open {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid raster in {path}")]
    Raster {
        path: PathBuf,
        #[source]
        source: ForestError,
    },
}

/// Deserialize a JSON document from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io { path: path.to_owned(), source })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|source| SourceError::Json { path: path.to_owned(), source })
}

/// Serialize `value` as pretty JSON to `path`.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), SourceError> {
    let io_err = |source| SourceError::Io { path: path.to_owned(), source };
    let file = File::create(path).map_err(io_err)?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, value)
        .map_err(|source| SourceError::Json { path: path.to_owned(), source })?;
    w.flush().map_err(io_err)
}

/// Load a raster, checking its data against its declared grid.
pub fn load_grid<T: DeserializeOwned>(path: &Path, layer: &'static str) -> Result<Grid<T>, SourceError> {
    let grid: Grid<T> = read_json(path)?;
    grid.check_shape(layer)
        .map_err(|source| SourceError::Raster { path: path.to_owned(), source })?;
    Ok(grid)
}

/// Load an event raster and normalize `nodata` cells to "no event".
pub fn load_event_raster(
    path: &Path,
    layer: &'static str,
    nodata: Option<i32>,
) -> Result<EventRaster, SourceError> {
    let grid = load_grid::<i32>(path, layer)?;
    let raster = EventRaster::normalized(grid, nodata);
    tracing::debug!(layer, path = %path.display(), events = raster.event_count(), "loaded event raster");
    Ok(raster)
}

pub fn load_points(path: &Path) -> Result<Vec<PointSite>, SourceError> {
    read_json(path)
}

pub fn load_polygons(path: &Path) -> Result<Vec<PolygonFeature>, SourceError> {
    read_json(path)
}
