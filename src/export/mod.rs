//! Artifact export for the best genome of a run.
//!
//! Three projections of a genome are supported, none of which feed back into
//! the search:
//!
//! - SVG: one `<circle>` element per visible gene over a background rect
//! - JSON: a [`GenomeSnapshot`] that can be loaded back
//! - PNG: the rendered canvas

mod snapshot;
mod svg;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::schema::{Genome, RenderStyle, ReportConfig};

pub use snapshot::{GenomeSnapshot, load_snapshot, save_snapshot};
pub use svg::{save_svg, write_svg};

/// Errors raised while writing artifacts.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Writes the configured artifacts for a genome.
#[derive(Debug, Clone)]
pub struct Exporter {
    report: ReportConfig,
    size: (u32, u32),
    style: RenderStyle,
}

impl Exporter {
    pub fn new(report: ReportConfig, size: (u32, u32), style: RenderStyle) -> Self {
        Self {
            report,
            size,
            style,
        }
    }

    /// Write every configured artifact. Returns the paths written.
    ///
    /// Each artifact is written beside its destination and renamed over it,
    /// so readers only ever see a complete file.
    pub fn export(&self, genome: &Genome, generation: usize) -> Result<Vec<PathBuf>, ExportError> {
        let mut written = Vec::new();

        if let Some(path) = &self.report.svg_path {
            replace_file(path, |staging| Ok(save_svg(staging, genome, self.size, self.style)?))?;
            written.push(path.clone());
        }

        if let Some(path) = &self.report.json_path {
            let snapshot = GenomeSnapshot::new(genome, self.size, generation);
            replace_file(path, |staging| save_snapshot(staging, &snapshot))?;
            written.push(path.clone());
        }

        if let Some(path) = &self.report.png_path {
            let canvas = genome.render(self.size, self.style);
            replace_file(path, |staging| Ok(canvas.save_png(staging)?))?;
            written.push(path.clone());
        }

        Ok(written)
    }
}

/// Sibling path an artifact is written to before being renamed into place.
/// The extension is kept so format detection still works.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".partial-{name}"))
}

fn replace_file<F>(path: &Path, write: F) -> Result<(), ExportError>
where
    F: FnOnce(&Path) -> Result<(), ExportError>,
{
    let staging = staging_path(path);
    if let Err(e) = write(&staging) {
        let _ = fs::remove_file(&staging);
        return Err(e);
    }
    fs::rename(&staging, path)?;
    Ok(())
}
