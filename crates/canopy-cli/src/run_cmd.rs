//! Run command: forest series, per-region statistics, one CSV per category.

use std::fs::{self, File};
use std::io::BufWriter;

use anyhow::{bail, Context, Result};
use tracing::{info, info_span, warn};

use canopy_core::export::{file_name, write_csv};
use canopy_core::{build_year_series, project_all, run_batch, ZonalAggregator};

use crate::cli::RunArgs;
use crate::config::CanopyConfig;
use crate::inputs;

pub fn run(args: RunArgs) -> Result<()> {
    let _cmd = info_span!("run").entered();

    // 1. Config
    let cfg = CanopyConfig::load(&args.config)?;
    if cfg.categories.is_empty() {
        bail!("no [[category]] entries in {}", args.config.display());
    }
    let range = cfg.year_range()?;
    let out_dir = args.output.clone().unwrap_or_else(|| cfg.resolve(&cfg.output_dir));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;

    // 2. Events and year series
    let events = inputs::load_events(&cfg)?;
    let series = build_year_series(&events, range).context("failed to build year series")?;

    // 3. Aggregator
    let area = inputs::cell_area(&cfg, events.spec())?;
    let aggregator = ZonalAggregator::new(&events, &series, &area, cfg.reducer()?)?;
    let batch_cfg = cfg.batch_config();

    // 4. One batch and one CSV per category
    let mut failed = 0;
    for cat in &cfg.categories {
        let _cat = info_span!("category", name = %cat.name, kind = %cat.kind).entered();
        let regions = inputs::category_regions(&cfg, cat)
            .with_context(|| format!("failed to load regions for category {}", cat.name))?;
        if regions.is_empty() {
            warn!("no regions left after filtering");
        }

        let report = run_batch(&regions, range, &aggregator, &batch_cfg);
        failed += report.summary.failed;
        let rows = project_all(&report.records, &regions, cfg.epoch());

        let path = out_dir.join(file_name(cat.kind, &cat.name));
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        write_csv(BufWriter::new(file), cat.kind, &rows)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), rows = rows.len(), "wrote csv");
    }

    if failed > 0 {
        warn!(failed, "some reductions failed; their rows carry a failed status");
    }
    Ok(())
}
