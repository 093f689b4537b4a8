//! Drawing surface abstraction plus a software implementation.
//!
//! The [`Surface`] trait is the small slice of a 2D canvas API the compositor
//! needs: rectangle fills, stroked polylines and a save/restore transform
//! stack. [`PixelSurface`] implements it over an RGBA float buffer that is
//! uploaded to a Bevy image each frame.

use std::ops::{Deref, DerefMut};

use bevy::math::{Affine2, Vec2};

/// Straight (non-premultiplied) RGBA, each channel in `[0, 1]`.
pub type Rgba = [f32; 4];

pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Overwrites every pixel, ignoring blending and the transform.
    fn clear(&mut self, color: Rgba);
    /// Source-over fill of a device-space rectangle. The current transform is
    /// not applied.
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba);

    fn begin_path(&mut self);
    fn move_to(&mut self, x: f32, y: f32);
    fn line_to(&mut self, x: f32, y: f32);
    /// Strokes the current path. The path is kept until the next `begin_path`.
    fn stroke(&mut self, width: f32, color: Rgba);

    fn save(&mut self);
    /// Pops the last saved transform. No-op on an empty stack.
    fn restore(&mut self);
    fn translate(&mut self, x: f32, y: f32);
    fn rotate(&mut self, angle: f32);
    /// Number of outstanding `save` calls.
    fn transform_depth(&self) -> usize;
}

/// Scoped `save`/`restore` pair. The restore runs in `Drop`, so it happens
/// even if the draw inside the scope returns early or unwinds.
pub struct TransformGuard<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: Surface + ?Sized> TransformGuard<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        surface.save();
        Self { surface }
    }
}

impl<S: Surface + ?Sized> Deref for TransformGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: Surface + ?Sized> DerefMut for TransformGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: Surface + ?Sized> Drop for TransformGuard<'_, S> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}

/// Current transform plus saved copies, canvas style: `translate`/`rotate`
/// post-multiply, so later calls act in the already-transformed space.
#[derive(Clone, Debug)]
pub struct TransformStack {
    current: Affine2,
    saved: Vec<Affine2>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self { current: Affine2::IDENTITY, saved: Vec::new() }
    }
}

impl TransformStack {
    pub fn current(&self) -> Affine2 {
        self.current
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn save(&mut self) {
        self.saved.push(self.current);
    }

    pub fn restore(&mut self) {
        if let Some(previous) = self.saved.pop() {
            self.current = previous;
        }
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.current = self.current * Affine2::from_translation(Vec2::new(x, y));
    }

    pub fn rotate(&mut self, angle: f32) {
        self.current = self.current * Affine2::from_angle(angle);
    }

    pub fn apply(&self, x: f32, y: f32) -> Vec2 {
        self.current.transform_point2(Vec2::new(x, y))
    }
}

/// Software canvas: row-major RGBA floats, origin top-left, y down.
///
/// Colors are stored already sRGB-encoded and blended in that space, the
/// same way a browser 2D canvas does.
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
    transform: TransformStack,
    /// Device-space segments of the current path.
    path: Vec<(Vec2, Vec2)>,
    cursor: Option<Vec2>,
    coverage: Vec<f32>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        let mut surface = Self {
            width: 0,
            height: 0,
            pixels: Vec::new(),
            transform: TransformStack::default(),
            path: Vec::new(),
            cursor: None,
            coverage: Vec::new(),
        };
        surface.resize(width, height, fill);
        surface
    }

    /// Reallocates for a new size and fills with `fill`. Previous content
    /// and any outstanding transforms are dropped.
    pub fn resize(&mut self, width: u32, height: u32, fill: Rgba) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize(width as usize * height as usize, fill);
        self.transform = TransformStack::default();
        self.path.clear();
        self.cursor = None;
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y as usize * self.width as usize + x as usize).copied()
    }

    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// Quantizes into `out`, which must hold `width * height * 4` bytes.
    /// Extra or missing bytes are left untouched.
    pub fn write_rgba8(&self, out: &mut [u8]) {
        for (dst, src) in out.chunks_exact_mut(4).zip(&self.pixels) {
            for (d, s) in dst.iter_mut().zip(src) {
                *d = (s.clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    }

    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = vec![0; self.pixels.len() * 4];
        self.write_rgba8(&mut out);
        out
    }

    fn blend(&mut self, idx: usize, color: Rgba, alpha: f32) {
        if alpha <= 0.0 {
            return;
        }
        let dst = &mut self.pixels[idx];
        let inv = 1.0 - alpha;
        let out_a = alpha + dst[3] * inv;
        if out_a <= 0.0 {
            *dst = [0.0; 4];
            return;
        }
        for i in 0..3 {
            dst[i] = (color[i] * alpha + dst[i] * dst[3] * inv) / out_a;
        }
        dst[3] = out_a;
    }

    /// Pixel-space bounding box `(x0, y0, x1, y1)` clipped to the surface,
    /// exclusive on the max side. `None` when fully outside.
    fn clip_box(&self, min: Vec2, max: Vec2) -> Option<(usize, usize, usize, usize)> {
        let x0 = min.x.floor().max(0.0);
        let y0 = min.y.floor().max(0.0);
        let x1 = max.x.ceil().min(self.width as f32);
        let y1 = max.y.ceil().min(self.height as f32);
        if !(x0 < x1 && y0 < y1) {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

/// Distance from `p` to the segment `a`-`b`.
fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

impl Surface for PixelSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self, color: Rgba) {
        self.pixels.fill(color);
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        let min = Vec2::new(x.min(x + w), y.min(y + h));
        let max = Vec2::new(x.max(x + w), y.max(y + h));
        let Some((x0, y0, x1, y1)) = self.clip_box(min, max) else { return };
        let width = self.width as usize;
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend(py * width + px, color, color[3]);
            }
        }
    }

    fn begin_path(&mut self) {
        self.path.clear();
        self.cursor = None;
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.cursor = Some(self.transform.apply(x, y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let to = self.transform.apply(x, y);
        if let Some(from) = self.cursor {
            self.path.push((from, to));
        }
        self.cursor = Some(to);
    }

    fn stroke(&mut self, width: f32, color: Rgba) {
        if self.path.is_empty() || !(width > 0.0) || color[3] <= 0.0 {
            return;
        }
        let half = width * 0.5;
        let pad = Vec2::splat(half + 1.0);
        let (mut min, mut max) = (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY));
        for &(a, b) in &self.path {
            min = min.min(a.min(b));
            max = max.max(a.max(b));
        }
        let Some((x0, y0, x1, y1)) = self.clip_box(min - pad, max + pad) else { return };

        // Max coverage over all segments so joints are not blended twice.
        let box_w = x1 - x0;
        self.coverage.clear();
        self.coverage.resize(box_w * (y1 - y0), 0.0);
        for &(a, b) in &self.path {
            for py in y0..y1 {
                for px in x0..x1 {
                    let center = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                    let c = (half + 0.5 - segment_distance(center, a, b)).clamp(0.0, 1.0);
                    let slot = &mut self.coverage[(py - y0) * box_w + (px - x0)];
                    *slot = slot.max(c);
                }
            }
        }

        let width_px = self.width as usize;
        for py in y0..y1 {
            for px in x0..x1 {
                let c = self.coverage[(py - y0) * box_w + (px - x0)];
                self.blend(py * width_px + px, color, color[3] * c);
            }
        }
    }

    fn save(&mut self) {
        self.transform.save();
    }

    fn restore(&mut self) {
        self.transform.restore();
    }

    fn translate(&mut self, x: f32, y: f32) {
        self.transform.translate(x, y);
    }

    fn rotate(&mut self, angle: f32) {
        self.transform.rotate(angle);
    }

    fn transform_depth(&self) -> usize {
        self.transform.depth()
    }
}
