// src/file.rs

use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::config::options::{ColumnSet, ExportOptions};
use crate::csv::write_row;
use crate::error::Result;
use crate::record::{ID_COLUMN, TransactionRecord, headers};

/// `YYYYMMDD_HHMMSS`, local time.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Write `records` to the file `export` points at (stamped with `stamp` when no
/// explicit name was given). Records without an id never reach the file.
/// Returns the path written and the number of rows.
pub fn export_records(export: &ExportOptions, records: &[TransactionRecord], stamp: &str) -> Result<(PathBuf, usize)> {
    let path = export.out_path(stamp);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let extended = match export.columns {
        ColumnSet::Base | ColumnSet::IdsOnly => false,
        ColumnSet::Extended => true,
        ColumnSet::Auto => records.iter().any(|r| r.enrichment.is_some()),
    };
    let ids_only = export.columns == ColumnSet::IdsOnly;
    let sep = export.format.delim();

    let mut out = BufWriter::new(File::create(&path)?);
    if export.include_headers {
        let header = if ids_only { vec![s!(ID_COLUMN)] } else { headers(extended) };
        write_row(&mut out, &header, sep)?;
    }
    let mut written = 0usize;
    for rec in records.iter().filter(|r| r.has_id()) {
        let row = if ids_only { vec![rec.transaction_id.clone()] } else { rec.to_row(extended) };
        write_row(&mut out, &row, sep)?;
        written += 1;
    }
    out.flush()?;

    let dropped = records.len() - written;
    if dropped > 0 {
        tracing::warn!(dropped, "records without transaction id left out of export");
    }
    tracing::info!(path = %path.display(), rows = written, extended, "export written");
    Ok((path, written))
}

/// Raw record dump next to the export, for re-processing without a browser.
pub fn write_json(path: &Path, records: &[TransactionRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }
    let out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(out, records).map_err(io::Error::from)?;
    Ok(())
}

pub fn ensure_directory(dir: &Path) -> io::Result<()> {
    if dir.exists() && !dir.is_dir() {
        return Err(io::Error::other(format!("Path exists but is not a directory: {}", dir.display())));
    }
    if !dir.exists() { fs::create_dir_all(dir)?; }
    Ok(())
}

pub fn looks_like_dir_hint(p: &Path) -> bool {
    let s = p.to_string_lossy();
    s.ends_with('/') || s.ends_with('\\')
}
