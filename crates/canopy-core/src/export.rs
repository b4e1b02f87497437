//! CSV export of flat records.

use std::io;

use crate::projection::{identity_columns, FlatRecord};
use crate::region::RegionKind;

const VALUE_COLUMNS: [&str; 7] = [
    "total_forest",
    "forest_loss",
    "forest_gain",
    "total_forest_base",
    "percent_forest_loss",
    "percent_forest_gain",
    "status",
];

/// Header row for a region kind.
pub fn header(kind: RegionKind) -> Vec<&'static str> {
    let mut cols = vec!["year"];
    cols.extend(identity_columns(kind));
    cols.extend(VALUE_COLUMNS);
    cols
}

/// Output file name for one region category.
pub fn file_name(kind: RegionKind, category: &str) -> String {
    format!("timeseries_{}_forest_change_{category}.csv", kind.slug())
}

/// Write the header and one row per record.
pub fn write_csv<W: io::Write>(writer: W, kind: RegionKind, records: &[FlatRecord]) -> csv::Result<()> {
    let mut w = csv::Writer::from_writer(writer);
    w.write_record(header(kind))?;
    for rec in records {
        let [name, ident] = rec.identity_values();
        let cell = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        w.write_record([
            rec.year.to_string(),
            name,
            ident,
            cell(rec.total_forest),
            cell(rec.forest_loss),
            cell(rec.forest_gain),
            cell(rec.total_forest_base),
            cell(rec.percent_forest_loss),
            cell(rec.percent_forest_gain),
            rec.status.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
