//! # Graphics Context Abstraction
//!
//! The renderer never owns the GL surface. The hosting environment supplies a
//! [`GraphicsContext`] and may lose and recreate its surface at any time; the
//! core only clears, submits draw calls, reads back single pixels and polls
//! for errors through this trait.
//!
//! [`RecordingContext`] is a headless implementation that records every call.
//! It backs the tests and the headless viewer.

use std::fmt;

use bitflags::bitflags;
use thiserror::Error;

use crate::camera::Viewport;
use crate::foundation::math::{Mat4, Point3, Vec3};

bitflags! {
    /// Buffers cleared at the start of a pass
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        /// Color buffer
        const COLOR = 0b0001;
        /// Depth buffer
        const DEPTH = 0b0010;
    }
}

/// Error codes reported by the graphics context after a pass
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlError {
    /// An enum argument was out of range
    #[error("Invalid enum")]
    InvalidEnum,
    /// A numeric argument was out of range
    #[error("Invalid value")]
    InvalidValue,
    /// The operation is not allowed in the current state
    #[error("Invalid operation")]
    InvalidOperation,
    /// The framebuffer object is not complete
    #[error("Invalid framebuffer operation")]
    InvalidFramebufferOperation,
    /// Not enough memory left to execute the command
    #[error("Out of memory")]
    OutOfMemory,
    /// Any other code
    #[error("Unknown GL error 0x{0:04x}")]
    Unknown(u32),
}

impl GlError {
    /// Map a raw GL error code; `GL_NO_ERROR` maps to `None`
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => None,
            0x0500 => Some(Self::InvalidEnum),
            0x0501 => Some(Self::InvalidValue),
            0x0502 => Some(Self::InvalidOperation),
            0x0505 => Some(Self::OutOfMemory),
            0x0506 => Some(Self::InvalidFramebufferOperation),
            other => Some(Self::Unknown(other)),
        }
    }
}

/// How the vertices of a draw call are assembled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    /// Independent points
    Points,
    /// Independent line segments, two vertices each
    Lines,
    /// Connected line strip
    LineStrip,
    /// Independent triangles, three vertices each
    Triangles,
}

impl PrimitiveMode {
    /// Whether `count` vertices form whole primitives
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Self::Points => true,
            Self::Lines => count % 2 == 0,
            Self::LineStrip => count != 1,
            Self::Triangles => count % 3 == 0,
        }
    }
}

/// A flat-colored batch of geometry in model coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    /// Primitive assembly
    pub mode: PrimitiveMode,
    /// Vertex positions in model space
    pub vertices: Vec<Vec3>,
    /// RGBA color
    pub color: [f32; 4],
    /// Model matrix current when the call was issued
    pub model: Mat4,
    /// Projection * view * model
    pub mvp: Mat4,
    /// Drawn in the selection pass, lighting and blending must stay off
    pub flat: bool,
}

impl DrawCall {
    /// Vertex positions in the fixed frame
    pub fn world_vertices(&self) -> impl Iterator<Item = Point3> + '_ {
        self.vertices
            .iter()
            .map(move |v| self.model.transform_point(&Point3::from(*v)))
    }
}

/// Immediate-mode graphics context supplied by the host
pub trait GraphicsContext {
    /// Set the color used by [`GraphicsContext::clear`]
    fn set_clear_color(&mut self, rgba: [f32; 4]);

    /// Clear the selected buffers
    fn clear(&mut self, mask: ClearMask);

    /// Submit one draw call
    fn submit(&mut self, call: DrawCall);

    /// Read one RGBA pixel from the framebuffer.
    ///
    /// # Arguments
    /// * `x` - Column, from the left
    /// * `y` - Row, from the bottom
    ///
    /// # Returns
    /// `None` when the coordinates are outside the surface
    fn read_pixel(&mut self, x: u32, y: u32) -> Option<[u8; 4]>;

    /// Take the pending error, if any, and reset the error state
    fn take_error(&mut self) -> Option<GlError>;

    /// Surface (re)created; cached GPU handles must be rebuilt on next use
    fn on_surface_created(&mut self) {}

    /// Surface resized
    fn on_surface_changed(&mut self, _viewport: Viewport) {}
}

/// Headless [`GraphicsContext`] that records what it is asked to do.
///
/// Read-back pixels come from a tiny rasterizer: the latest flat draw call
/// whose projected vertices cover the requested pixel wins. That is enough
/// to exercise the picking path without a GPU.
#[derive(Default)]
pub struct RecordingContext {
    clear_color: [f32; 4],
    clears: Vec<ClearMask>,
    calls: Vec<DrawCall>,
    viewport: Viewport,
    pending_error: Option<GlError>,
    surface_generation: u32,
    pixel_override: Option<[u8; 4]>,
}

impl fmt::Debug for RecordingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingContext")
            .field("clears", &self.clears.len())
            .field("calls", &self.calls.len())
            .field("viewport", &self.viewport)
            .field("pending_error", &self.pending_error)
            .finish()
    }
}

impl RecordingContext {
    /// Create a context for a surface of the given size
    pub fn new(viewport: Viewport) -> Self {
        Self { viewport, ..Self::default() }
    }

    /// Draw calls on the framebuffer since the last color clear
    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Clear operations since the last [`RecordingContext::reset`]
    pub fn clears(&self) -> &[ClearMask] {
        &self.clears
    }

    /// Current clear color
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Number of times the surface was created
    pub fn surface_generation(&self) -> u32 {
        self.surface_generation
    }

    /// Forget recorded calls
    pub fn reset(&mut self) {
        self.clears.clear();
        self.calls.clear();
    }

    /// Raise an error to be reported on the next poll
    pub fn inject_error(&mut self, error: GlError) {
        self.pending_error = Some(error);
    }

    /// Make every read-back return `pixel`
    pub fn set_pixel_override(&mut self, pixel: Option<[u8; 4]>) {
        self.pixel_override = pixel;
    }

    fn to_screen(&self, mvp: &Mat4, vertex: &Vec3) -> Option<(f32, f32)> {
        let clip = mvp * vertex.push(1.0);
        if clip.w <= f32::EPSILON {
            return None;
        }
        let (nx, ny) = (clip.x / clip.w, clip.y / clip.w);
        let width = self.viewport.width as f32;
        let height = self.viewport.height as f32;
        Some(((nx + 1.0) * 0.5 * width, (ny + 1.0) * 0.5 * height))
    }

    fn covers(&self, call: &DrawCall, x: f32, y: f32) -> bool {
        let screen: Vec<_> = call
            .vertices
            .iter()
            .filter_map(|v| self.to_screen(&call.mvp, v))
            .collect();
        if screen.is_empty() {
            return false;
        }
        // Bounding box test with a small pick tolerance for points and lines
        let tolerance = 2.0;
        let min_x = screen.iter().map(|p| p.0).fold(f32::INFINITY, f32::min) - tolerance;
        let max_x = screen.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max) + tolerance;
        let min_y = screen.iter().map(|p| p.1).fold(f32::INFINITY, f32::min) - tolerance;
        let max_y = screen.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max) + tolerance;
        x >= min_x && x <= max_x && y >= min_y && y <= max_y
    }
}

impl GraphicsContext for RecordingContext {
    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    fn clear(&mut self, mask: ClearMask) {
        if mask.contains(ClearMask::COLOR) {
            self.calls.clear();
        }
        self.clears.push(mask);
    }

    fn submit(&mut self, call: DrawCall) {
        if !call.mode.accepts(call.vertices.len()) {
            log::warn!("{:?} draw call with {} vertices", call.mode, call.vertices.len());
            self.pending_error.get_or_insert(GlError::InvalidValue);
        }
        self.calls.push(call);
    }

    fn read_pixel(&mut self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.viewport.width || y >= self.viewport.height {
            return None;
        }
        if let Some(pixel) = self.pixel_override {
            return Some(pixel);
        }
        let (px, py) = (x as f32 + 0.5, y as f32 + 0.5);
        let hit = self.calls.iter().rev().find(|call| call.flat && self.covers(call, px, py));
        let rgba = hit.map_or(self.clear_color, |call| call.color);
        Some(rgba.map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8))
    }

    fn take_error(&mut self) -> Option<GlError> {
        self.pending_error.take()
    }

    fn on_surface_created(&mut self) {
        self.surface_generation += 1;
        self.calls.clear();
    }

    fn on_surface_changed(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_call(vertices: Vec<Vec3>, color: [f32; 4]) -> DrawCall {
        DrawCall {
            mode: PrimitiveMode::Triangles,
            vertices,
            color,
            model: Mat4::identity(),
            mvp: Mat4::identity(),
            flat: true,
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(GlError::from_code(0), None);
        assert_eq!(GlError::from_code(0x0502), Some(GlError::InvalidOperation));
        assert_eq!(GlError::from_code(0x9999), Some(GlError::Unknown(0x9999)));
        assert_eq!(GlError::OutOfMemory.to_string(), "Out of memory");
    }

    #[test]
    fn test_primitive_vertex_counts() {
        assert!(PrimitiveMode::Lines.accepts(4));
        assert!(!PrimitiveMode::Lines.accepts(3));
        assert!(PrimitiveMode::Triangles.accepts(6));
        assert!(!PrimitiveMode::LineStrip.accepts(1));
    }

    #[test]
    fn test_malformed_call_raises_error_once() {
        let mut gl = RecordingContext::new(Viewport::new(4, 4));
        gl.submit(flat_call(vec![Vec3::zeros(); 2], [1.0; 4]));
        assert_eq!(gl.take_error(), Some(GlError::InvalidValue));
        assert_eq!(gl.take_error(), None);
    }

    #[test]
    fn test_read_pixel_hits_latest_flat_call() {
        let mut gl = RecordingContext::new(Viewport::new(100, 100));
        let quad = vec![
            Vec3::new(-0.5, -0.5, 0.0),
            Vec3::new(0.5, -0.5, 0.0),
            Vec3::new(0.5, 0.5, 0.0),
        ];
        gl.submit(flat_call(quad.clone(), [1.0, 0.0, 0.0, 1.0]));
        gl.submit(flat_call(quad, [0.0, 0.0, 1.0, 1.0]));

        assert_eq!(gl.read_pixel(50, 50), Some([0, 0, 255, 255]));
        assert_eq!(gl.read_pixel(2, 2), Some([0, 0, 0, 0]));
        assert_eq!(gl.read_pixel(100, 0), None);
    }

    #[test]
    fn test_clear_and_surface_lifecycle() {
        let mut gl = RecordingContext::new(Viewport::new(10, 10));
        gl.submit(flat_call(vec![Vec3::zeros(); 3], [1.0; 4]));
        gl.clear(ClearMask::COLOR | ClearMask::DEPTH);
        assert!(gl.calls().is_empty());
        assert_eq!(gl.clears(), &[ClearMask::COLOR | ClearMask::DEPTH]);

        gl.on_surface_created();
        gl.on_surface_changed(Viewport::new(20, 10));
        assert_eq!(gl.surface_generation(), 1);
        assert_eq!(gl.read_pixel(15, 5), Some([0, 0, 0, 0]));
    }
}
