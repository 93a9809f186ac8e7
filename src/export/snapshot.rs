//! JSON snapshots of a genome.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::Genome;

use super::ExportError;

/// A genome together with the canvas it was evolved for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenomeSnapshot {
    pub width: u32,
    pub height: u32,
    /// Generation the genome was taken from.
    pub generation: usize,
    pub genome: Genome,
}

impl GenomeSnapshot {
    pub fn new(genome: &Genome, (width, height): (u32, u32), generation: usize) -> Self {
        Self {
            width,
            height,
            generation,
            genome: genome.clone(),
        }
    }
}

pub fn save_snapshot<P: AsRef<Path>>(
    path: P,
    snapshot: &GenomeSnapshot,
) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(snapshot)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a snapshot. The genome comes back stale.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<GenomeSnapshot, ExportError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
