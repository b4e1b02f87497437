//! Series command: forest cell count per year, as JSON on stdout.

use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info_span;

use canopy_core::{build_year_series, Epoch, YearSeries};

use crate::cli::SeriesArgs;
use crate::config::CanopyConfig;
use crate::inputs;

#[derive(Debug, Serialize, PartialEq)]
struct YearCount {
    year: i32,
    forest_cells: usize,
}

pub fn run(args: SeriesArgs) -> Result<()> {
    let _cmd = info_span!("series").entered();
    let cfg = CanopyConfig::load(&args.config)?;
    let events = inputs::load_events(&cfg)?;
    let series = build_year_series(&events, cfg.year_range()?).context("failed to build year series")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &counts(&series, cfg.epoch()))?;
    writeln!(out)?;
    Ok(())
}

fn counts(series: &YearSeries, epoch: Epoch) -> Vec<YearCount> {
    series
        .iter()
        .map(|m| YearCount { year: epoch.to_calendar(m.year()), forest_cells: m.forest_cells() })
        .collect()
}
