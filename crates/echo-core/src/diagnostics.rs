//! Impulse response export
//!
//! The estimated impulse response can be handed to a sink for offline
//! inspection. Export is best effort: a failing sink never fails a
//! cancellation pass.

use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{EchoError, Result};

/// Destination for impulse response magnitudes
pub trait ImpulseSink: Send + Sync {
    /// Store `magnitudes` (one value per tap, circular index order) under `id`
    fn record(&self, id: &str, magnitudes: &[f64]) -> Result<()>;
}

/// A sink plus the identifier to record one pass under
#[derive(Clone, Copy)]
pub struct ImpulseExport<'a> {
    /// Caller-chosen key for this pass
    pub id: &'a str,
    /// Where the magnitudes go
    pub sink: &'a dyn ImpulseSink,
}

impl<'a> ImpulseExport<'a> {
    /// Pair an identifier with a sink
    pub fn new(id: &'a str, sink: &'a dyn ImpulseSink) -> Self {
        Self { id, sink }
    }
}

/// Writes each impulse response to `<directory>/<id>.txt`, one magnitude per line
#[derive(Debug, Clone)]
pub struct FileImpulseSink {
    directory: PathBuf,
}

impl FileImpulseSink {
    /// Create a sink writing into `directory` (created on first write)
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Target directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File an identifier is written to
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_id(id)?;
        Ok(self.directory.join(format!("{id}.txt")))
    }
}

impl ImpulseSink for FileImpulseSink {
    fn record(&self, id: &str, magnitudes: &[f64]) -> Result<()> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.directory)?;

        let mut writer = BufWriter::new(fs::File::create(&path)?);
        for magnitude in magnitudes {
            writeln!(writer, "{magnitude}")?;
        }
        writer.flush()?;

        debug!("Wrote {} impulse taps to {}", magnitudes.len(), path.display());
        Ok(())
    }
}

/// Keeps impulse responses in memory, keyed by identifier
#[derive(Debug, Default)]
pub struct MemoryImpulseSink {
    records: Mutex<HashMap<String, Vec<f64>>>,
}

impl MemoryImpulseSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Magnitudes recorded under `id`, if any
    pub fn get(&self, id: &str) -> Option<Vec<f64>> {
        self.records.lock().get(id).cloned()
    }

    /// Number of recorded responses
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl ImpulseSink for MemoryImpulseSink {
    fn record(&self, id: &str, magnitudes: &[f64]) -> Result<()> {
        validate_id(id)?;
        self.records.lock().insert(id.to_string(), magnitudes.to_vec());
        Ok(())
    }
}

/// Identifiers become file names, so path syntax is rejected
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(EchoError::sink_error("impulse identifier is empty"));
    }
    if id.contains(['/', '\\']) || id == "." || id == ".." {
        return Err(EchoError::sink_error(format!(
            "impulse identifier '{id}' must not contain path separators"
        )));
    }
    Ok(())
}
