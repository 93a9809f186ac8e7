//! Compute module - Rendering, image statistics and evolutionary search.

mod blur;
mod canvas;

pub mod evolution;

pub use blur::*;
pub use canvas::*;
