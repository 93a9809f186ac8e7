//! Configuration types for a circle-painting evolution run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Population and stopping settings.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Number of circles per genome.
    #[serde(default = "default_genes")]
    pub genes: usize,
    /// Inclusive pixel radius range used when a gene is randomized.
    #[serde(default = "default_radius_range")]
    pub radius_range: (i32, i32),
    /// Randomize and mutate the alpha channel. Otherwise alpha stays opaque.
    #[serde(default)]
    pub allow_alpha: bool,
    /// Fill applied to the scratch canvas before genes are drawn.
    #[serde(default)]
    pub background: Background,
    /// How a circle is composited over what is already on the canvas.
    #[serde(default)]
    pub compositing: Compositing,
    /// Image difference metric.
    #[serde(default)]
    pub metric: MetricKind,
    /// Per-operator mutation probabilities and magnitudes.
    #[serde(default)]
    pub mutation: MutationConfig,
    /// Progress reporting and artifact export.
    #[serde(default)]
    pub report: ReportConfig,
    /// Generations between polls of the target source. `None` keeps the
    /// initial target for the whole run.
    #[serde(default)]
    pub refresh_interval: Option<usize>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population: PopulationConfig::default(),
            genes: default_genes(),
            radius_range: default_radius_range(),
            allow_alpha: false,
            background: Background::default(),
            compositing: Compositing::default(),
            metric: MetricKind::default(),
            mutation: MutationConfig::default(),
            report: ReportConfig::default(),
            refresh_interval: None,
            random_seed: None,
        }
    }
}

fn default_genes() -> usize {
    128
}
fn default_radius_range() -> (i32, i32) {
    (10, 50)
}

/// Population size, elite size and stopping conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationConfig {
    /// Number of genomes in the arena (M).
    #[serde(default = "default_population_size")]
    pub size: usize,
    /// Number of best genomes kept as parents each generation (K).
    #[serde(default = "default_elite")]
    pub elite: usize,
    /// Stop after this many generations. `None` runs until cancelled.
    #[serde(default)]
    pub max_generations: Option<usize>,
    /// Stop once the best score is at or below this value.
    #[serde(default)]
    pub target_score: Option<f64>,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            size: default_population_size(),
            elite: default_elite(),
            max_generations: None,
            target_score: None,
        }
    }
}

fn default_population_size() -> usize {
    128
}
fn default_elite() -> usize {
    16
}

/// Mutation operator probabilities. Each operator fires independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MutationConfig {
    /// Replace every parameter of a gene.
    #[serde(default = "default_full_reroll_p")]
    pub full_reroll_p: f64,
    /// Move a gene by one of three jump scales.
    #[serde(default = "default_move_p")]
    pub move_p: f64,
    /// Nudge the radius.
    #[serde(default = "default_resize_p")]
    pub resize_p: f64,
    /// Per channel: replace with a fresh random byte.
    #[serde(default = "default_color_p")]
    pub color_set_p: f64,
    /// Per channel: add a small signed delta.
    #[serde(default = "default_color_p")]
    pub color_jitter_p: f64,
    /// Per gene slot: exchange with a random slot of the same genome.
    #[serde(default = "default_swap_p")]
    pub swap_p: f64,
    /// Largest absolute radius change of a resize.
    #[serde(default = "default_resize_delta")]
    pub resize_delta: i32,
    /// Largest absolute channel change of a color jitter.
    #[serde(default = "default_color_delta")]
    pub color_delta: i32,
    /// Medium move jitter as a fraction of the canvas size.
    #[serde(default = "default_medium_move")]
    pub medium_move: f32,
    /// Small move jitter as a fraction of the canvas size.
    #[serde(default = "default_small_move")]
    pub small_move: f32,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            full_reroll_p: default_full_reroll_p(),
            move_p: default_move_p(),
            resize_p: default_resize_p(),
            color_set_p: default_color_p(),
            color_jitter_p: default_color_p(),
            swap_p: default_swap_p(),
            resize_delta: default_resize_delta(),
            color_delta: default_color_delta(),
            medium_move: default_medium_move(),
            small_move: default_small_move(),
        }
    }
}

impl MutationConfig {
    /// Every operator disabled. Handy for tests that need inert mutation.
    pub fn disabled() -> Self {
        Self {
            full_reroll_p: 0.0,
            move_p: 0.0,
            resize_p: 0.0,
            color_set_p: 0.0,
            color_jitter_p: 0.0,
            swap_p: 0.0,
            ..Self::default()
        }
    }

    fn probabilities(&self) -> [(&'static str, f64); 6] {
        [
            ("full_reroll_p", self.full_reroll_p),
            ("move_p", self.move_p),
            ("resize_p", self.resize_p),
            ("color_set_p", self.color_set_p),
            ("color_jitter_p", self.color_jitter_p),
            ("swap_p", self.swap_p),
        ]
    }
}

fn default_full_reroll_p() -> f64 {
    1.0 / 400.0
}
fn default_move_p() -> f64 {
    1.0 / 200.0
}
fn default_resize_p() -> f64 {
    1.0 / 400.0
}
fn default_color_p() -> f64 {
    1.0 / 200.0
}
fn default_swap_p() -> f64 {
    1.0 / 400.0
}
fn default_resize_delta() -> i32 {
    3
}
fn default_color_delta() -> i32 {
    20
}
fn default_medium_move() -> f32 {
    0.08
}
fn default_small_move() -> f32 {
    0.01
}

/// Progress reporting and export cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Generations between progress reports and exports (R).
    #[serde(default = "default_report_interval")]
    pub interval: usize,
    /// Where the best genome is written as SVG.
    #[serde(default = "default_svg_path")]
    pub svg_path: Option<PathBuf>,
    /// Where the best genome is written as JSON.
    #[serde(default)]
    pub json_path: Option<PathBuf>,
    /// Where the best genome's rendering is written as PNG.
    #[serde(default)]
    pub png_path: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interval: default_report_interval(),
            svg_path: default_svg_path(),
            json_path: None,
            png_path: None,
        }
    }
}

fn default_report_interval() -> usize {
    10
}
fn default_svg_path() -> Option<PathBuf> {
    Some(PathBuf::from("output.svg"))
}

impl EvolutionConfig {
    /// How genomes of this run are painted.
    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            background: self.background,
            compositing: self.compositing,
        }
    }
}

/// Background and compositing used when a genome is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStyle {
    pub background: Background,
    pub compositing: Compositing,
}

/// Canvas fill drawn before any gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Background {
    #[default]
    White,
    Black,
    Transparent,
}

impl Background {
    /// RGBA bytes of the fill.
    pub fn rgba(self) -> [u8; 4] {
        match self {
            Background::White => [255, 255, 255, 255],
            Background::Black => [0, 0, 0, 255],
            Background::Transparent => [0, 0, 0, 0],
        }
    }
}

/// Compositing mode for circle draws.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Compositing {
    /// Source-over alpha blending. Identical to `Occlude` for opaque colors.
    #[default]
    Blend,
    /// Covered pixels are overwritten with the circle color.
    Occlude,
}

/// Image difference metric selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MetricKind {
    /// Sum of squared per-channel errors.
    #[default]
    SumSquaredError,
    /// Windowed structural similarity, reported as a difference.
    StructuralSimilarity,
}

/// Upper bound on `resize_delta`.
pub const MAX_RESIZE_DELTA: i32 = 1 << 16;
/// Upper bound on `color_delta`; a larger jitter wraps past every byte value.
pub const MAX_COLOR_DELTA: i32 = 255;

impl EvolutionConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population.size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.population.elite == 0 || self.population.elite >= self.population.size {
            return Err(ConfigError::InvalidElite {
                elite: self.population.elite,
                size: self.population.size,
            });
        }
        if self.genes == 0 {
            return Err(ConfigError::NoGenes);
        }
        let (lo, hi) = self.radius_range;
        if lo < 0 || lo > hi {
            return Err(ConfigError::InvalidRadiusRange { lo, hi });
        }
        for (name, p) in self.mutation.probabilities() {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::InvalidProbability { name, value: p });
            }
        }
        let m = &self.mutation;
        for (name, value, max) in [
            ("resize_delta", m.resize_delta, MAX_RESIZE_DELTA),
            ("color_delta", m.color_delta, MAX_COLOR_DELTA),
        ] {
            if !(0..=max).contains(&value) {
                return Err(ConfigError::InvalidDelta { name, value, max });
            }
        }
        for (name, value) in [("medium_move", m.medium_move), ("small_move", m.small_move)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidMoveFraction { name, value });
            }
        }
        if self.report.interval == 0 {
            return Err(ConfigError::ZeroInterval("report.interval"));
        }
        if self.refresh_interval == Some(0) {
            return Err(ConfigError::ZeroInterval("refresh_interval"));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be non-zero")]
    EmptyPopulation,
    #[error("Elite count {elite} must be in 1..{size}")]
    InvalidElite { elite: usize, size: usize },
    #[error("Genome must contain at least one gene")]
    NoGenes,
    #[error("Radius range ({lo}, {hi}) must be non-negative and ordered")]
    InvalidRadiusRange { lo: i32, hi: i32 },
    #[error("Probability {name} = {value} is outside [0, 1]")]
    InvalidProbability { name: &'static str, value: f64 },
    #[error("Mutation delta {name} = {value} is outside [0, {max}]")]
    InvalidDelta {
        name: &'static str,
        value: i32,
        max: i32,
    },
    #[error("Move fraction {name} = {value} is outside [0, 1]")]
    InvalidMoveFraction { name: &'static str, value: f32 },
    #[error("Target image {width}x{height} must have non-zero dimensions")]
    EmptyTarget { width: u32, height: u32 },
    #[error("{0} must be non-zero")]
    ZeroInterval(&'static str),
}
