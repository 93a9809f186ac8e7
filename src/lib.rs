//! Circle Evolve - approximate a raster image with evolved circles.
//!
//! A population of genomes, each an ordered list of filled circles, is
//! rendered and scored against a target image. The best genomes are kept as
//! parents and the rest of the population is refilled by uniform crossover
//! and mutation, so the best score never gets worse over time.
//!
//! # Architecture
//!
//! - `schema`: Configuration and genome data types
//! - `compute`: Canvas rasterizer, blur, metrics and the evolutionary engine
//! - `export`: SVG / JSON / PNG artifacts of the best genome
//!
//! # Example
//!
//! ```rust,no_run
//! use circle_evolve::{Canvas, EvolutionConfig, EvolutionEngine};
//!
//! let target = Canvas::open("portrait.png").unwrap();
//! let config = EvolutionConfig {
//!     random_seed: Some(42),
//!     ..Default::default()
//! };
//!
//! let mut engine = EvolutionEngine::new(config, target).unwrap();
//! let cancel = engine.cancel_handle();
//! let result = engine.run_with_callback(|progress| {
//!     if progress.generation >= 10_000 {
//!         cancel.store(true, std::sync::atomic::Ordering::Relaxed);
//!     }
//! });
//! println!(
//!     "Best score after {} generations: {}",
//!     result.stats.generations, result.stats.best_score
//! );
//! ```

pub mod compute;
pub mod export;
pub mod schema;

// Re-export commonly used types
pub use compute::Canvas;
pub use compute::evolution::{Comparator, EvolutionEngine, Population};
pub use schema::{EvolutionConfig, Gene, Genome};
