//! Export of aligned rows and summaries.
//!
//! Supports CSV files (optionally gzip-compressed) and JSON logging.

use anyhow::Result;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Writes `rows` as CSV with a header line, replacing any existing file.
///
/// With `gzip`, the output is compressed and `.gz` is appended to the file
/// name. Returns the path actually written.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T], gzip: bool) -> Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let target = if gzip {
        let mut name = path.as_os_str().to_owned();
        name.push(".gz");
        PathBuf::from(name)
    } else {
        path.to_path_buf()
    };
    debug!(path = %target.display(), rows = rows.len(), gzip, "Writing CSV");

    let file = File::create(&target)?;
    if gzip {
        let encoder = write_rows(GzEncoder::new(file, Compression::default()), rows)?;
        encoder.finish()?.flush()?;
    } else {
        write_rows(file, rows)?;
    }

    Ok(target)
}

fn write_rows<W: Write, T: Serialize>(sink: W, rows: &[T]) -> Result<W> {
    let mut writer = csv::Writer::from_writer(sink);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(writer.into_inner().map_err(|e| e.into_error())?)
}
