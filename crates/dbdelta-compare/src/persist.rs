//! JSON persistence of comparison results

use crate::compare::Comparison;
use dbdelta_core::Result;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Write a comparison to `path`, replacing any existing file
pub fn save_comparison_json(comparison: &Comparison, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, comparison)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    tracing::debug!(path = %path.display(), "comparison saved");
    Ok(())
}

/// Read a comparison written by [`save_comparison_json`]
pub fn load_comparison_json(path: impl AsRef<Path>) -> Result<Comparison> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
