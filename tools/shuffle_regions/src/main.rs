//! shuffle_regions: build a control sample by moving every input polygon to a
//! random position and rotation inside a base region.
//!
//! Usage:
//!   shuffle_regions --input tracts.json --base state.json --output control.json --seed 7
//!
//! Input, base and output are JSON arrays of polygon features
//! (`name`, optional `code`, `geometry`). All base features are merged into a
//! single base region. Names and codes are carried over unchanged.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use canopy_core::shuffle::shuffle_all;
use canopy_core::sources::{load_polygons, write_json};
use canopy_core::{MultiPolygon, PolygonFeature};

#[derive(Parser)]
#[command(name = "shuffle_regions", about = "Randomly relocate polygons inside a base region")]
struct Args {
    /// Polygon features to relocate.
    #[arg(long)]
    input: PathBuf,

    /// Polygon features forming the base region.
    #[arg(long)]
    base: PathBuf,

    /// Output path for the relocated features.
    #[arg(long)]
    output: PathBuf,

    /// RNG seed.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    let args = Args::parse();

    let features = load_polygons(&args.input)?;
    let base_features = load_polygons(&args.base)?;
    if base_features.is_empty() {
        bail!("{} holds no base polygons", args.base.display());
    }
    let base = MultiPolygon(base_features.into_iter().flat_map(|f| f.geometry.0).collect());

    eprintln!("Shuffling {} polygons (seed {}) ...", features.len(), args.seed);
    let mut rng = StdRng::seed_from_u64(args.seed);
    let geometries: Vec<MultiPolygon> = features.iter().map(|f| f.geometry.clone()).collect();
    let shuffled = shuffle_all(&geometries, &base, &mut rng).context("shuffle failed")?;

    let out: Vec<PolygonFeature> = features
        .into_iter()
        .zip(shuffled)
        .map(|(f, geometry)| PolygonFeature { geometry, ..f })
        .collect();
    write_json(&args.output, &out)?;
    eprintln!("  -> {}", args.output.display());
    Ok(())
}
