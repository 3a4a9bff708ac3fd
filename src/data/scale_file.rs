use std::path::Path;

use crate::error::{HistoError, Result};
use crate::processing::scale::{Bucket, Scale, ScaleKind, BUCKET_COUNT};
use crate::state::settings::{APP_NAME, VERSION};

/// Second field of a scale file's first line.
pub fn scale_label(kind: ScaleKind, y_axis_name: &str) -> String {
    match kind {
        ScaleKind::Rpm => "RPM SCALE".to_string(),
        ScaleKind::YAxis => format!("{y_axis_name} SCALE"),
    }
}

/// Read a scale file: a `<tool> <version>,<LABEL>` line followed by
/// seventeen `index,min,value,max` lines. The label must match the axis
/// (case-insensitive) or the file is rejected.
pub fn read_scale(path: &Path, kind: ScaleKind, y_axis_name: &str) -> Result<Scale> {
    let bad = |reason: String| HistoError::ScaleFileFormat {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let records: Vec<csv::StringRecord> = reader.records().collect::<std::result::Result<_, _>>()?;
    if records.len() != BUCKET_COUNT + 1 {
        return Err(bad(format!(
            "expected {} lines, found {}",
            BUCKET_COUNT + 1,
            records.len()
        )));
    }

    let expected = scale_label(kind, y_axis_name);
    let label = records[0].get(1).unwrap_or_default();
    if !label.eq_ignore_ascii_case(&expected) {
        return Err(bad(format!("this is not a {expected} file (found {label:?})")));
    }

    let mut buckets = Vec::with_capacity(BUCKET_COUNT);
    for (line, record) in records[1..].iter().enumerate() {
        let field = |i: usize| -> Result<f64> {
            record
                .get(i)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| bad(format!("line {} has no numeric field {i}", line + 2)))
        };
        buckets.push(Bucket::new(field(1)?, field(2)?, field(3)?));
    }

    Scale::from_buckets(kind, buckets).map_err(|e| bad(e.to_string()))
}

pub fn write_scale(path: &Path, scale: &Scale, y_axis_name: &str) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    writer.write_record([
        format!("{APP_NAME} {VERSION}"),
        scale_label(scale.kind(), y_axis_name),
    ])?;
    for (i, b) in scale.buckets().iter().enumerate() {
        writer.write_record([
            i.to_string(),
            b.min.to_string(),
            b.value.to_string(),
            b.max.to_string(),
        ])?;
    }
    writer.flush()?;
    tracing::info!("Saved {} to {:?}", scale_label(scale.kind(), y_axis_name), path);
    Ok(())
}
