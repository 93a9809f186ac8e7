//! Generation loop driving a population towards the target image.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::compute::Canvas;
use crate::schema::{ConfigError, EvolutionConfig, Genome};

use super::comparator::Comparator;
use super::genome::GenomeRng;
use super::population::Population;
use super::source::TargetSource;

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    Cancelled,
    MaxGenerations,
    TargetReached,
}

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone)]
pub struct EvolutionProgress {
    /// Index of the generation just completed, starting at 0.
    pub generation: usize,
    /// Scores of the current parents, best first.
    pub elite_scores: Vec<f64>,
    /// Best score seen so far.
    pub best_score: f64,
    /// Genomes evaluated since the run started.
    pub evaluations: u64,
    /// Copy of the current best genome.
    pub best: Genome,
}

/// Summary statistics of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionStats {
    pub generations: usize,
    pub total_evaluations: u64,
    pub best_score: f64,
    pub elapsed_seconds: f64,
    pub evaluations_per_second: f64,
    pub stop_reason: StopReason,
}

/// Outcome of [`EvolutionEngine::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionResult {
    pub best: Genome,
    pub stats: EvolutionStats,
    /// Best score after each generation.
    pub history: Vec<f64>,
}

/// Evolution engine that runs the search.
pub struct EvolutionEngine {
    config: EvolutionConfig,
    rng: GenomeRng,
    comparator: Comparator,
    population: Population,
    source: Option<Box<dyn TargetSource>>,
    history: Vec<f64>,
    generation: usize,
    evaluations: u64,
    best_score: f64,
    cancelled: Arc<AtomicBool>,
}

impl EvolutionEngine {
    /// Validate the configuration and seed a random population for `target`.
    pub fn new(config: EvolutionConfig, target: Canvas) -> Result<Self, ConfigError> {
        config.validate()?;
        if target.pixel_count() == 0 {
            let (width, height) = target.size();
            return Err(ConfigError::EmptyTarget { width, height });
        }

        let mut rng = match config.random_seed {
            Some(seed) => GenomeRng::new(seed),
            None => GenomeRng::random(),
        };
        let comparator = Comparator::new(target, config.metric);
        let population = Population::new(&config, comparator.size(), &mut rng);

        Ok(Self {
            config,
            rng,
            comparator,
            population,
            source: None,
            history: Vec::new(),
            generation: 0,
            evaluations: 0,
            best_score: f64::INFINITY,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Poll `source` for a new target every `refresh_interval` generations.
    pub fn with_target_source(mut self, source: Box<dyn TargetSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Get cancellation handle.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    pub fn comparator(&self) -> &Comparator {
        &self.comparator
    }

    /// Replace the target. Every genome is re-scored on the next generation.
    pub fn set_target(&mut self, target: Canvas) {
        self.comparator.set_target(target);
        // Scores against the old target are not comparable.
        self.best_score = f64::INFINITY;
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Generations completed so far.
    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Run a single generation step.
    pub fn step(&mut self) {
        self.refresh_target();

        let evaluated = self.population.step(&mut self.comparator, &mut self.rng);
        self.evaluations += evaluated as u64;

        let gen_best = self.population.best().score();
        if gen_best < self.best_score {
            self.best_score = gen_best;
        }
        self.history.push(gen_best);
        self.generation += 1;
    }

    /// Pull a new frame from the target source when one is due.
    fn refresh_target(&mut self) {
        let Some(interval) = self.config.refresh_interval else {
            return;
        };
        if self.generation == 0 || self.generation % interval != 0 {
            return;
        }
        let Some(source) = self.source.as_mut() else {
            return;
        };

        match source.poll() {
            Ok(Some(frame)) if frame.size() == self.comparator.size() => {
                log::info!("Generation {}: target refreshed", self.generation);
                self.set_target(frame);
            }
            Ok(Some(frame)) => {
                log::warn!(
                    "Ignoring target frame of size {:?}, expected {:?}",
                    frame.size(),
                    self.comparator.size()
                );
            }
            Ok(None) => {}
            Err(e) => log::warn!("Target refresh failed: {}", e),
        }
    }

    /// Get current progress.
    pub fn progress(&self) -> EvolutionProgress {
        EvolutionProgress {
            generation: self.generation.saturating_sub(1),
            elite_scores: self.population.elite().iter().map(|g| g.score()).collect(),
            best_score: self.best_score,
            evaluations: self.evaluations,
            best: self.population.best().clone(),
        }
    }

    /// Check if evolution should stop.
    fn should_stop(&self) -> Option<StopReason> {
        if self.cancelled.load(Ordering::Relaxed) {
            return Some(StopReason::Cancelled);
        }

        if let Some(max) = self.config.population.max_generations
            && self.generation >= max
        {
            return Some(StopReason::MaxGenerations);
        }

        if let Some(target) = self.config.population.target_score
            && self.best_score <= target
        {
            return Some(StopReason::TargetReached);
        }

        None
    }

    /// Run evolution, calling `callback` every `report.interval` generations.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> EvolutionResult
    where
        F: FnMut(&EvolutionProgress),
    {
        let start_time = Instant::now();
        let (width, height) = self.comparator.size();
        log::info!(
            "Evolving {} genomes of {} circles ({} parents) against {}x{} target, metric {}",
            self.population.len(),
            self.config.genes,
            self.config.population.elite,
            width,
            height,
            self.comparator.metric_name()
        );

        let interval = self.config.report.interval.max(1);
        let stop_reason = loop {
            if let Some(reason) = self.should_stop() {
                break reason;
            }

            self.step();

            if (self.generation - 1) % interval == 0 {
                let progress = self.progress();
                log::debug!(
                    "Generation {}: best {:.1}, {} evaluations",
                    progress.generation,
                    progress.best_score,
                    progress.evaluations
                );
                callback(&progress);
            }
        };

        // Score the last batch of children so the reported best is current.
        self.evaluations += self.population.evaluate_all(&self.comparator) as u64;
        self.comparator.finish_pass();
        self.population.rank_and_prune();
        let best = self.population.best().clone();
        if best.score() < self.best_score {
            self.best_score = best.score();
        }

        let elapsed = start_time.elapsed().as_secs_f64();
        log::info!(
            "Stopped after {} generations ({:?}), best score {:.1}",
            self.generation,
            stop_reason,
            self.best_score
        );

        EvolutionResult {
            best,
            stats: EvolutionStats {
                generations: self.generation,
                total_evaluations: self.evaluations,
                best_score: self.best_score,
                elapsed_seconds: elapsed,
                evaluations_per_second: if elapsed > 0.0 {
                    self.evaluations as f64 / elapsed
                } else {
                    0.0
                },
                stop_reason,
            },
            history: self.history.clone(),
        }
    }

    /// Run evolution (blocking).
    pub fn run(&mut self) -> EvolutionResult {
        self.run_with_callback(|_| {})
    }
}
