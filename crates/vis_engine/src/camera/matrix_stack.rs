//! # Model Matrix Stack
//!
//! Fixed-depth stack of model matrices used while traversing the layer list.
//! Every operation composes onto the current (top) matrix in place, the same
//! way immediate-mode GL matrix calls do.
//!
//! Prefer [`MatrixStack::scope`] over manual `push`/`pop`: the returned guard
//! restores the previous matrix when it goes out of scope, also during
//! unwinding.

use std::ops::{Deref, DerefMut};

use thiserror::Error;

use crate::foundation::math::{Mat4, RigidTransform, Unit, Vec3, utils};

/// Number of matrices that can be saved at once
pub const MATRIX_STACK_DEPTH: usize = 16;

/// Matrix stack misuse. These indicate a caller bug, not a runtime condition.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixStackError {
    /// More pushes than the stack can hold
    #[error("Model matrix stack overflow (depth {0})")]
    Overflow(usize),

    /// A pop without a matching push
    #[error("Can not remove the last element in the model matrix stack")]
    Underflow,
}

/// Current model matrix plus a bounded stack of saved copies
#[derive(Debug, Clone)]
pub struct MatrixStack {
    current: Mat4,
    saved: [Mat4; MATRIX_STACK_DEPTH],
    depth: usize,
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl MatrixStack {
    /// Create a stack whose current matrix is the identity
    pub fn new() -> Self {
        Self {
            current: Mat4::identity(),
            saved: [Mat4::identity(); MATRIX_STACK_DEPTH],
            depth: 0,
        }
    }

    /// The current model matrix
    pub fn current(&self) -> &Mat4 {
        &self.current
    }

    /// Number of saved matrices
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Save a copy of the current matrix
    pub fn try_push(&mut self) -> Result<(), MatrixStackError> {
        if self.depth == MATRIX_STACK_DEPTH {
            return Err(MatrixStackError::Overflow(MATRIX_STACK_DEPTH));
        }
        self.saved[self.depth] = self.current;
        self.depth += 1;
        Ok(())
    }

    /// Restore the most recently saved matrix
    pub fn try_pop(&mut self) -> Result<(), MatrixStackError> {
        if self.depth == 0 {
            return Err(MatrixStackError::Underflow);
        }
        self.depth -= 1;
        self.current = self.saved[self.depth];
        Ok(())
    }

    /// Save a copy of the current matrix.
    ///
    /// # Panics
    /// Panics when the stack is full, which means pushes and pops are not
    /// balanced somewhere in the caller.
    pub fn push(&mut self) {
        if let Err(e) = self.try_push() {
            log::error!("{}", e);
            panic!("{}", e);
        }
    }

    /// Restore the most recently saved matrix.
    ///
    /// # Panics
    /// Panics when nothing was pushed, which means pushes and pops are not
    /// balanced somewhere in the caller.
    pub fn pop(&mut self) {
        if let Err(e) = self.try_pop() {
            log::error!("{}", e);
            panic!("{}", e);
        }
    }

    /// Push and return a guard that pops when dropped
    pub fn scope(&mut self) -> MatrixScope<'_> {
        let base_depth = self.depth;
        self.push();
        MatrixScope { stack: self, base_depth }
    }

    /// Replace the current matrix with the identity
    pub fn load_identity(&mut self) {
        self.current = Mat4::identity();
    }

    /// Post-multiply the current matrix
    pub fn multiply(&mut self, matrix: &Mat4) {
        self.current *= matrix;
    }

    /// Translate the current matrix
    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.current *= Mat4::new_translation(&Vec3::new(x, y, z));
    }

    /// Scale the current matrix
    pub fn scale(&mut self, sx: f32, sy: f32, sz: f32) {
        self.current *= Mat4::new_nonuniform_scaling(&Vec3::new(sx, sy, sz));
    }

    /// Rotate the current matrix by `angle_degrees` about the axis `(x, y, z)`.
    ///
    /// A zero-length axis leaves the matrix unchanged.
    pub fn rotate(&mut self, angle_degrees: f32, x: f32, y: f32, z: f32) {
        if let Some(axis) = Unit::try_new(Vec3::new(x, y, z), f32::EPSILON) {
            self.current *= Mat4::from_axis_angle(&axis, utils::deg_to_rad(angle_degrees));
        }
    }

    /// Apply a rigid transform: translate, then rotate
    pub fn apply_transform(&mut self, transform: &RigidTransform) {
        let t = transform.translation;
        self.translate(t.x, t.y, t.z);
        let angle = utils::rad_to_deg(transform.rotation_angle());
        if angle != 0.0 {
            if let Some(axis) = transform.rotation_axis() {
                self.rotate(angle, axis.x, axis.y, axis.z);
            }
        }
    }

    fn restore_to(&mut self, base_depth: usize) {
        if self.depth <= base_depth {
            log::error!(
                "Matrix scope closed at depth {} but was opened at depth {}",
                self.depth,
                base_depth
            );
            return;
        }
        while self.depth > base_depth {
            self.depth -= 1;
            self.current = self.saved[self.depth];
        }
    }
}

/// Guard returned by [`MatrixStack::scope`].
///
/// Dereferences to the stack; dropping it restores the matrix and depth that
/// were current when the scope was opened, even if the caller pushed more
/// without popping.
#[derive(Debug)]
pub struct MatrixScope<'a> {
    stack: &'a mut MatrixStack,
    base_depth: usize,
}

impl Deref for MatrixScope<'_> {
    type Target = MatrixStack;

    fn deref(&self) -> &MatrixStack {
        self.stack
    }
}

impl DerefMut for MatrixScope<'_> {
    fn deref_mut(&mut self) -> &mut MatrixStack {
        self.stack
    }
}

impl Drop for MatrixScope<'_> {
    fn drop(&mut self) {
        self.stack.restore_to(self.base_depth);
    }
}
