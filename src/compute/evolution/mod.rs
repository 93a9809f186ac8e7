//! Evolutionary search over circle paintings.
//!
//! # Overview
//!
//! - **Genome Operations** (`genome`): random generation, crossover, mutation
//!   and rendering
//! - **Comparator** (`comparator`): pluggable image difference metrics
//! - **Population** (`population`): the fixed-size breeding pool
//! - **Search** (`search`): the generation loop, progress and stopping
//! - **Target Sources** (`source`): replacement targets for live runs
//!
//! # Example
//!
//! ```rust,no_run
//! use circle_evolve::compute::Canvas;
//! use circle_evolve::compute::evolution::EvolutionEngine;
//! use circle_evolve::schema::EvolutionConfig;
//!
//! let target = Canvas::open("target.png").unwrap();
//! let mut config = EvolutionConfig::default();
//! config.population.max_generations = Some(1000);
//!
//! let mut engine = EvolutionEngine::new(config, target).unwrap();
//! let result = engine.run_with_callback(|progress| {
//!     println!("Generation {}: best = {:.0}", progress.generation, progress.best_score);
//! });
//! println!("Best score: {:.0}", result.stats.best_score);
//! ```
//!
//! # Score Convention
//!
//! Scores are differences: lower is better for every metric.
//!
//! - `SumSquaredError`: sum of squared RGB byte differences
//! - `StructuralSimilarity`: 3 minus the summed per-channel mean SSIM

mod comparator;
mod genome;
mod population;
mod search;
mod source;

pub use comparator::{
    COMPARED_CHANNELS, Comparator, Metric, StructuralSimilarity, SumSquaredError,
};
pub use genome::GenomeRng;
pub use population::Population;
pub use search::{EvolutionEngine, EvolutionProgress, EvolutionResult, EvolutionStats, StopReason};
pub use source::{ReloadingFileSource, TargetSource};
