//! Genome data types: circles, paintings and the space they live in.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::EvolutionConfig;

/// One filled circle.
///
/// Position and radius are in absolute pixels of the target image. A negative
/// radius marks the circle invisible; it keeps taking part in crossover and
/// mutation and can grow back into view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    /// RGBA bytes.
    pub color: [u8; 4],
}

impl Gene {
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.radius >= 0
    }
}

/// Canvas size and randomization bounds shared by every gene of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneSpace {
    pub width: u32,
    pub height: u32,
    /// Inclusive radius range for freshly randomized genes.
    pub radius_range: (i32, i32),
    pub allow_alpha: bool,
}

impl GeneSpace {
    pub fn new(config: &EvolutionConfig, (width, height): (u32, u32)) -> Self {
        Self {
            width,
            height,
            radius_range: config.radius_range,
            allow_alpha: config.allow_alpha,
        }
    }

    /// Number of color channels subject to randomization.
    #[inline]
    pub fn color_channels(&self) -> usize {
        if self.allow_alpha { 4 } else { 3 }
    }
}

/// A candidate painting: an ordered list of circles plus its cached score.
///
/// Genes are drawn in order, so later circles cover earlier ones. The gene
/// count never changes after construction. `score` is only meaningful while
/// the genome is not stale; lower scores are better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    genes: Vec<Gene>,
    #[serde(with = "score_serde")]
    score: f64,
    #[serde(skip, default = "stale_default")]
    stale: bool,
}

fn stale_default() -> bool {
    true
}

/// Scores are written as `null` while unscored (infinite), since JSON has no
/// representation for non-finite numbers.
mod score_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(score: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        let finite = score.is_finite().then_some(*score);
        finite.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

impl Genome {
    /// Wrap a gene list. The new genome is stale until evaluated.
    pub fn new(genes: Vec<Gene>) -> Self {
        Self {
            genes,
            score: f64::INFINITY,
            stale: true,
        }
    }

    #[inline]
    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    /// Mutable view of the genes. Marks the genome stale.
    pub fn genes_mut(&mut self) -> &mut [Gene] {
        self.stale = true;
        &mut self.genes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Last computed score. Meaningless while `is_stale()`.
    #[inline]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[inline]
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    /// Store a freshly computed score and clear the stale flag.
    pub(crate) fn set_score(&mut self, score: f64) {
        self.score = score;
        self.stale = false;
    }

    /// Retire a slot: it sorts after every live genome and is re-scored if
    /// it survives.
    pub(crate) fn mark_dead(&mut self) {
        self.score = f64::INFINITY;
        self.stale = true;
    }

    /// Ascending score order (lower difference first).
    #[inline]
    pub fn cmp_score(&self, other: &Genome) -> Ordering {
        self.score.total_cmp(&other.score)
    }

    /// Score-only equality used for duplicate pruning. Genomes with different
    /// genes but the same score compare equal.
    #[inline]
    pub fn same_score(&self, other: &Genome) -> bool {
        self.score == other.score
    }

    pub(crate) fn genes_raw_mut(&mut self) -> &mut [Gene] {
        &mut self.genes
    }
}
