//! Image difference metrics and the comparator that scores candidates.
//!
//! Every metric reports a *difference*: lower is better and identical images
//! score zero. Genome ordering relies on this regardless of which metric is
//! active.

use crate::compute::{Canvas, GaussianKernel, gaussian_blur_into};
use crate::schema::MetricKind;

/// Number of color channels compared. Alpha is ignored.
pub const COMPARED_CHANNELS: usize = 3;

/// Pluggable image difference.
pub trait Metric: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Cache target-only statistics. Called whenever the target changes.
    fn prepare(&mut self, _target: &Canvas) {}

    /// Dissimilarity between target and candidate; lower is better.
    fn diff(&self, target: &Canvas, candidate: &Canvas) -> f64;
}

impl MetricKind {
    /// Instantiate the metric.
    pub fn build(self) -> Box<dyn Metric> {
        match self {
            MetricKind::SumSquaredError => Box::new(SumSquaredError),
            MetricKind::StructuralSimilarity => Box::new(StructuralSimilarity::default()),
        }
    }
}

/// Sum over pixels and RGB channels of the squared byte difference.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumSquaredError;

impl Metric for SumSquaredError {
    fn name(&self) -> &'static str {
        "sse"
    }

    fn diff(&self, target: &Canvas, candidate: &Canvas) -> f64 {
        let total: u64 = target
            .data()
            .chunks_exact(4)
            .zip(candidate.data().chunks_exact(4))
            .map(|(a, b)| {
                (0..COMPARED_CHANNELS)
                    .map(|c| {
                        let d = a[c] as i32 - b[c] as i32;
                        (d * d) as u64
                    })
                    .sum::<u64>()
            })
            .sum();
        total as f64
    }
}

// Stabilizing constants for 8-bit data: (0.01 * 255)^2 and (0.03 * 255)^2.
const SSIM_C1: f64 = 6.5025;
const SSIM_C2: f64 = 58.5225;

/// Target statistics for one channel.
#[derive(Debug, Clone, Default)]
struct ChannelStats {
    plane: Vec<f32>,
    mu: Vec<f32>,
    /// Blurred square of the plane.
    e_sq: Vec<f32>,
}

/// Windowed structural similarity, Gaussian window (11 taps, sigma 1.5).
///
/// The mean SSIM of each RGB channel is summed and subtracted from the number
/// of channels, so identical images score 0 and the worst case is 6.
#[derive(Debug, Clone)]
pub struct StructuralSimilarity {
    kernel: GaussianKernel,
    width: usize,
    height: usize,
    target: Vec<ChannelStats>,
}

impl Default for StructuralSimilarity {
    fn default() -> Self {
        Self::new(11, 1.5)
    }
}

impl StructuralSimilarity {
    pub fn new(window: usize, sigma: f32) -> Self {
        Self {
            kernel: GaussianKernel::new(window, sigma),
            width: 0,
            height: 0,
            target: Vec::new(),
        }
    }

    fn channel_plane(canvas: &Canvas, channel: usize) -> Vec<f32> {
        canvas
            .data()
            .chunks_exact(4)
            .map(|px| px[channel] as f32)
            .collect()
    }

    fn blur(&self, input: &[f32], scratch: &mut [f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; input.len()];
        gaussian_blur_into(input, self.width, self.height, &self.kernel, scratch, &mut out);
        out
    }

    /// Mean SSIM of one channel against the cached target statistics.
    fn channel_ssim(&self, stats: &ChannelStats, candidate: &[f32], scratch: &mut [f32]) -> f64 {
        let mu2 = self.blur(candidate, scratch);
        let sq: Vec<f32> = candidate.iter().map(|v| v * v).collect();
        let e_sq = self.blur(&sq, scratch);
        let cross: Vec<f32> = stats
            .plane
            .iter()
            .zip(candidate)
            .map(|(a, b)| a * b)
            .collect();
        let e_cross = self.blur(&cross, scratch);

        let mut total = 0.0f64;
        for i in 0..candidate.len() {
            let mu1 = stats.mu[i] as f64;
            let mu2_i = mu2[i] as f64;
            let mu1_mu2 = mu1 * mu2_i;
            let sigma1_sq = stats.e_sq[i] as f64 - mu1 * mu1;
            let sigma2_sq = e_sq[i] as f64 - mu2_i * mu2_i;
            let sigma12 = e_cross[i] as f64 - mu1_mu2;

            let numerator = (2.0 * mu1_mu2 + SSIM_C1) * (2.0 * sigma12 + SSIM_C2);
            let denominator =
                (mu1 * mu1 + mu2_i * mu2_i + SSIM_C1) * (sigma1_sq + sigma2_sq + SSIM_C2);
            total += numerator / denominator;
        }
        total / candidate.len() as f64
    }
}

impl Metric for StructuralSimilarity {
    fn name(&self) -> &'static str {
        "ssim"
    }

    fn prepare(&mut self, target: &Canvas) {
        self.width = target.width() as usize;
        self.height = target.height() as usize;
        let mut scratch = vec![0.0f32; target.pixel_count()];

        let stats = (0..COMPARED_CHANNELS)
            .map(|c| {
                let plane = Self::channel_plane(target, c);
                let mu = self.blur(&plane, &mut scratch);
                let sq: Vec<f32> = plane.iter().map(|v| v * v).collect();
                let e_sq = self.blur(&sq, &mut scratch);
                ChannelStats { plane, mu, e_sq }
            })
            .collect();
        self.target = stats;
    }

    fn diff(&self, target: &Canvas, candidate: &Canvas) -> f64 {
        assert_eq!(
            (self.width, self.height),
            (target.width() as usize, target.height() as usize),
            "structural similarity was prepared for a different target"
        );
        let mut scratch = vec![0.0f32; candidate.pixel_count()];
        let similarity: f64 = self
            .target
            .iter()
            .enumerate()
            .map(|(c, stats)| {
                let plane = Self::channel_plane(candidate, c);
                self.channel_ssim(stats, &plane, &mut scratch)
            })
            .sum();
        COMPARED_CHANNELS as f64 - similarity
    }
}

/// Fitness oracle: owns the current target and the active metric.
pub struct Comparator {
    target: Canvas,
    metric: Box<dyn Metric>,
    just_changed: bool,
}

impl Comparator {
    /// Create a comparator using a built-in metric.
    pub fn new(target: Canvas, kind: MetricKind) -> Self {
        Self::with_metric(target, kind.build())
    }

    /// Create a comparator using a custom metric.
    pub fn with_metric(target: Canvas, mut metric: Box<dyn Metric>) -> Self {
        metric.prepare(&target);
        Self {
            target,
            metric,
            just_changed: false,
        }
    }

    /// Replace the target. The next evaluation pass re-scores every genome.
    ///
    /// Panics if the new target's size differs from the current one.
    pub fn set_target(&mut self, target: Canvas) {
        assert_eq!(
            target.size(),
            self.target.size(),
            "replacement target must keep the original dimensions"
        );
        self.metric.prepare(&target);
        self.target = target;
        self.just_changed = true;
    }

    /// True for the one evaluation pass following `set_target`.
    #[inline]
    pub fn just_changed(&self) -> bool {
        self.just_changed
    }

    /// End of an evaluation pass: cached scores are current again.
    pub fn finish_pass(&mut self) {
        self.just_changed = false;
    }

    #[inline]
    pub fn target(&self) -> &Canvas {
        &self.target
    }

    /// Target dimensions in pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        self.target.size()
    }

    pub fn metric_name(&self) -> &'static str {
        self.metric.name()
    }

    /// Difference between the target and `candidate`; lower is better.
    ///
    /// Panics on a size mismatch.
    pub fn diff(&self, candidate: &Canvas) -> f64 {
        assert_eq!(
            candidate.size(),
            self.target.size(),
            "candidate canvas size does not match target"
        );
        self.metric.diff(&self.target, candidate)
    }
}
