//! RGBA pixel buffers and the circle rasterizer.

use std::path::{Path, PathBuf};

use crate::schema::Compositing;

/// Errors raised while obtaining a target image.
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("Failed to load image {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Failed to read metadata of {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Image dimensions {width}x{height} must be non-zero")]
    Empty { width: u32, height: u32 },
    #[error("Pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Row-major RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    /// Transparent black canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Canvas filled with a single color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut canvas = Self::new(width, height);
        canvas.fill(rgba);
        canvas
    }

    /// Wrap an existing RGBA8 buffer.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self, TargetError> {
        if width == 0 || height == 0 {
            return Err(TargetError::Empty { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(TargetError::BufferSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode an image file into an RGBA8 canvas.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TargetError> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| TargetError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let rgba8 = img.to_rgba8();
        let (width, height) = rgba8.dimensions();
        Self::from_rgba(width, height, rgba8.into_raw())
    }

    /// Encode the canvas as PNG.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> image::ImageResult<()> {
        image::save_buffer(
            path,
            &self.data,
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
        )
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Raw RGBA bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        for px in self.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }

    /// Paint a filled circle. Pixels whose centers lie within `radius` of
    /// `(cx, cy)` are covered; negative radii draw nothing.
    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: i32, rgba: [u8; 4], mode: Compositing) {
        if radius < 0 {
            return;
        }
        let (cx, cy, r) = (cx as i64, cy as i64, radius as i64);
        let w = self.width as i64;
        let h = self.height as i64;

        let y0 = (cy - r).max(0);
        let y1 = (cy + r).min(h - 1);
        let r2 = r * r;

        for y in y0..=y1 {
            let dy = y - cy;
            let span = isqrt(r2 - dy * dy);
            let x0 = (cx - span).max(0);
            let x1 = (cx + span).min(w - 1);
            if x0 > x1 {
                continue;
            }
            let row = (y * w) as usize * 4;
            let start = row + x0 as usize * 4;
            let end = row + (x1 as usize + 1) * 4;
            let pixels = &mut self.data[start..end];

            match mode {
                Compositing::Occlude => {
                    for px in pixels.chunks_exact_mut(4) {
                        px.copy_from_slice(&rgba);
                    }
                }
                Compositing::Blend => {
                    for px in pixels.chunks_exact_mut(4) {
                        blend_over(px, rgba);
                    }
                }
            }
        }
    }
}

/// Source-over blend of a straight-alpha color onto one pixel.
#[inline]
fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    let a = src[3] as u32;
    if a == 255 {
        dst.copy_from_slice(&src);
        return;
    }
    let inv = 255 - a;
    for c in 0..3 {
        dst[c] = ((src[c] as u32 * a + dst[c] as u32 * inv + 127) / 255) as u8;
    }
    dst[3] = (a + (dst[3] as u32 * inv + 127) / 255) as u8;
}

/// Largest `s` with `s * s <= n`, for `n >= 0`.
#[inline]
fn isqrt(n: i64) -> i64 {
    if n <= 0 {
        return 0;
    }
    let mut s = (n as f64).sqrt() as i64;
    while s * s > n {
        s -= 1;
    }
    while (s + 1) * (s + 1) <= n {
        s += 1;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    #[test]
    fn test_isqrt() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(1), 1);
        assert_eq!(isqrt(24), 4);
        assert_eq!(isqrt(25), 5);
        assert_eq!(isqrt(-3), 0);
    }

    #[test]
    fn test_circle_coverage() {
        let mut canvas = Canvas::filled(11, 11, WHITE);
        canvas.fill_circle(5, 5, 3, RED, Compositing::Occlude);

        assert_eq!(canvas.pixel(5, 5), RED);
        assert_eq!(canvas.pixel(8, 5), RED);
        assert_eq!(canvas.pixel(5, 2), RED);
        // Corner of the bounding box lies outside the circle.
        assert_eq!(canvas.pixel(8, 8), WHITE);
        assert_eq!(canvas.pixel(9, 5), WHITE);
    }

    #[test]
    fn test_negative_radius_draws_nothing() {
        let mut canvas = Canvas::filled(4, 4, WHITE);
        canvas.fill_circle(2, 2, -1, RED, Compositing::Occlude);
        assert_eq!(canvas, Canvas::filled(4, 4, WHITE));
    }

    #[test]
    fn test_zero_radius_draws_center_pixel() {
        let mut canvas = Canvas::filled(4, 4, WHITE);
        canvas.fill_circle(1, 2, 0, RED, Compositing::Blend);
        assert_eq!(canvas.pixel(1, 2), RED);
        assert_eq!(canvas.pixel(2, 2), WHITE);
    }

    #[test]
    fn test_clipping_outside_canvas() {
        let mut canvas = Canvas::filled(4, 4, WHITE);
        canvas.fill_circle(-100, -100, 10, RED, Compositing::Occlude);
        canvas.fill_circle(1000, 2, 3, RED, Compositing::Occlude);
        assert_eq!(canvas, Canvas::filled(4, 4, WHITE));

        canvas.fill_circle(-1, -1, 2, RED, Compositing::Occlude);
        assert_eq!(canvas.pixel(0, 0), RED);
    }

    #[test]
    fn test_later_draw_occludes_earlier() {
        let mut canvas = Canvas::filled(6, 6, WHITE);
        canvas.fill_circle(3, 3, 100, RED, Compositing::Blend);
        canvas.fill_circle(3, 3, 100, BLUE, Compositing::Blend);
        assert_eq!(canvas, Canvas::filled(6, 6, BLUE));
    }

    #[test]
    fn test_blend_half_alpha() {
        let mut canvas = Canvas::filled(1, 1, [0, 0, 0, 255]);
        canvas.fill_circle(0, 0, 1, [255, 255, 255, 128], Compositing::Blend);
        let px = canvas.pixel(0, 0);
        assert_eq!(px[0], 128);
        assert_eq!(px[3], 255);

        let mut occluded = Canvas::filled(1, 1, [0, 0, 0, 255]);
        occluded.fill_circle(0, 0, 1, [255, 255, 255, 128], Compositing::Occlude);
        assert_eq!(occluded.pixel(0, 0), [255, 255, 255, 128]);
    }

    #[test]
    fn test_from_rgba_validates() {
        assert!(matches!(
            Canvas::from_rgba(0, 3, vec![]),
            Err(TargetError::Empty { .. })
        ));
        assert!(matches!(
            Canvas::from_rgba(2, 2, vec![0; 15]),
            Err(TargetError::BufferSize {
                expected: 16,
                actual: 15
            })
        ));
        assert!(Canvas::from_rgba(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("target.png");

        let mut canvas = Canvas::filled(5, 3, WHITE);
        canvas.set_pixel(4, 2, RED);
        canvas.save_png(&path).unwrap();

        let loaded = Canvas::open(&path).unwrap();
        assert_eq!(loaded, canvas);
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Canvas::open(dir.path().join("missing.png"));
        assert!(matches!(result, Err(TargetError::Open { .. })));
    }
}
