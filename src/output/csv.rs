use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::diff::MismatchDetail;

/// Write the mismatch report, header line first, replacing any previous file.
pub fn write_mismatch_report(path: &Path, detail: &MismatchDetail) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to open report {}", path.display()))?;
    writer.write_record(&detail.headers)?;
    for row in &detail.rows {
        let record = row.iter().map(|value| value.as_csv()).collect::<Vec<_>>();
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}
