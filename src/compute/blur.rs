//! Separable Gaussian smoothing for windowed image statistics.

/// Normalized 1D Gaussian kernel.
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    /// Kernel taps, centered, summing to 1.
    pub taps: Vec<f32>,
}

impl GaussianKernel {
    /// Build a kernel of `size` taps (odd) with standard deviation `sigma`.
    pub fn new(size: usize, sigma: f32) -> Self {
        assert!(size % 2 == 1, "Gaussian kernel size must be odd, got {size}");
        let half = (size / 2) as f32;
        let mut taps: Vec<f32> = (0..size)
            .map(|i| {
                let d = i as f32 - half;
                (-d * d / (2.0 * sigma * sigma)).exp()
            })
            .collect();

        // Normalize so kernel sums to 1
        let sum: f32 = taps.iter().sum();
        for t in &mut taps {
            *t /= sum;
        }

        Self { taps }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.taps.len()
    }
}

/// Mirror an out-of-range coordinate back into `0..n` without repeating the
/// edge sample (`dcb|abcd|cba`).
#[inline]
pub fn reflect_coord(mut i: i64, n: usize) -> usize {
    let n = n as i64;
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i;
        } else if i >= n {
            i = 2 * n - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Blur a single-channel plane into pre-allocated buffers, horizontal pass
/// then vertical pass. `scratch` holds the horizontal pass.
pub fn gaussian_blur_into(
    input: &[f32],
    width: usize,
    height: usize,
    kernel: &GaussianKernel,
    scratch: &mut [f32],
    output: &mut [f32],
) {
    debug_assert_eq!(input.len(), width * height);
    let half = (kernel.size() / 2) as i64;
    let taps = &kernel.taps;

    for y in 0..height {
        let row = &input[y * width..(y + 1) * width];
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &t) in taps.iter().enumerate() {
                let sx = reflect_coord(x as i64 + k as i64 - half, width);
                sum += row[sx] * t;
            }
            scratch[y * width + x] = sum;
        }
    }

    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (k, &t) in taps.iter().enumerate() {
                let sy = reflect_coord(y as i64 + k as i64 - half, height);
                sum += scratch[sy * width + x] * t;
            }
            output[y * width + x] = sum;
        }
    }
}
