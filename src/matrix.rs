use nalgebra as na;
use na::{Matrix4, Unit, Vector3};

use crate::graphics::{GraphicsContext, UniformValue};
use crate::uniforms;

/// The model transform plus a stack of saved copies.
///
/// The current matrix is what `apply` uploads; every draw that should use it calls `apply`
/// right before drawing, the next `apply` fully replaces it.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixStack {
    current: Matrix4<f32>,
    saved: Vec<Matrix4<f32>>,
}

impl Default for MatrixStack {
    fn default() -> Self {
        return Self::new();
    }
}

impl MatrixStack {
    pub fn new() -> Self {
        return Self {
            current: Matrix4::identity(),
            saved: Vec::new(),
        };
    }

    /// Identity with zero translation.
    pub fn reset_translate_matrix(&mut self) {
        self.current = Matrix4::identity();
    }

    /// Rotates by `angle_degrees` around `axis`, which need not be normalized.
    /// The rotation is applied in the object's local frame (`m = m * R`). A zero axis is a no-op.
    pub fn rotate(&mut self, angle_degrees: f32, axis: Vector3<f32>) {
        let Some(axis) = Unit::try_new(axis, f32::EPSILON) else {
            return;
        };
        let rotation = Matrix4::from_axis_angle(&axis, angle_degrees.to_radians());
        self.current *= rotation;
    }

    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.current *= Matrix4::new_translation(&offset);
    }

    pub fn scale(&mut self, factors: Vector3<f32>) {
        self.current *= Matrix4::new_nonuniform_scaling(&factors);
    }

    /// Saves a copy of the current matrix.
    pub fn push(&mut self) {
        self.saved.push(self.current);
    }

    /// Restores the last saved matrix. Returns false if nothing was saved.
    pub fn pop(&mut self) -> bool {
        return match self.saved.pop() {
            Some(matrix) => {
                self.current = matrix;
                true
            }
            None => false,
        };
    }

    pub fn matrix(&self) -> &Matrix4<f32> {
        return &self.current;
    }

    /// The 16 column-major floats.
    pub fn as_slice(&self) -> &[f32] {
        return self.current.as_slice();
    }

    /// Uploads the current matrix as the model transform of the bound program.
    pub fn apply(&self, gfx: &mut dyn GraphicsContext) {
        debug_assert!(gfx.current_program().is_some(), "model matrix applied with no program in use");
        apply_matrix(gfx, &self.current);
    }
}

/// Uploads `matrix` as the model transform of the bound program.
pub fn apply_matrix(gfx: &mut dyn GraphicsContext, matrix: &Matrix4<f32>) {
    gfx.set_uniform(uniforms::MODEL, UniformValue::Mat4(*matrix));
}

#[cfg(test)]
mod tests {
    use super::*;
    use na::{vector, Point3};

    const EPS: f32 = 1e-4;

    fn transform(matrix: &Matrix4<f32>, point: Point3<f32>) -> Point3<f32> {
        return matrix.transform_point(&point);
    }

    #[test]
    fn reset_is_identity() {
        let mut stack = MatrixStack::new();
        stack.rotate(33.0, vector![1.0, 2.0, 3.0]);
        stack.translate(vector![4.0, 5.0, 6.0]);
        stack.reset_translate_matrix();
        let point = Point3::new(1.5, -2.0, 7.25);
        assert_eq!(transform(stack.matrix(), point), point);
        assert_eq!(stack.as_slice().len(), 16);
    }

    #[test]
    fn rotation_is_periodic() {
        let points = [Point3::new(1.0, 0.0, 0.0), Point3::new(0.3, -2.0, 5.0), Point3::new(-4.0, 1.0, 1.0)];
        for angle in [0.0, 17.5, 90.0, 245.0, 1000.0] {
            let mut a = MatrixStack::new();
            let mut b = MatrixStack::new();
            a.rotate(angle, vector![0.0, 1.0, 1.0]);
            b.rotate(angle + 360.0, vector![0.0, 1.0, 1.0]);
            for point in points {
                let difference = transform(a.matrix(), point) - transform(b.matrix(), point);
                assert!(difference.norm() < EPS, "angle {} point {:?}", angle, point);
            }
        }
    }

    #[test]
    fn axis_length_does_not_matter() {
        let mut a = MatrixStack::new();
        let mut b = MatrixStack::new();
        a.rotate(40.0, vector![0.0, 1.0, 1.0]);
        b.rotate(40.0, vector![0.0, 7.0, 7.0]);
        assert!((a.matrix() - b.matrix()).norm() < EPS);
    }

    #[test]
    fn zero_axis_is_ignored() {
        let mut stack = MatrixStack::new();
        stack.rotate(90.0, Vector3::zeros());
        assert_eq!(*stack.matrix(), Matrix4::identity());
    }

    #[test]
    fn rotation_acts_in_local_frame() {
        let mut stack = MatrixStack::new();
        stack.translate(vector![10.0, 0.0, 0.0]);
        stack.rotate(90.0, vector![0.0, 0.0, 1.0]);
        let moved = transform(stack.matrix(), Point3::new(1.0, 0.0, 0.0));
        assert!((moved - Point3::new(10.0, 1.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn push_and_pop_restore() {
        let mut stack = MatrixStack::new();
        stack.push();
        stack.scale(vector![2.0, 2.0, 2.0]);
        assert!(stack.pop());
        assert_eq!(*stack.matrix(), Matrix4::identity());
        assert!(!stack.pop());
    }
}
