//! Linear algebra type system for the kinematic tracker
//!
//! Per-axis blocks have compile-time shapes; the expanded N-axis matrices are
//! sized at runtime because the axis count is a construction parameter.

use nalgebra::{DMatrix, DVector, SMatrix};

// ===== Per-Axis Dimensions =====
pub const AXIS_ORDER: usize = 3; // position, velocity, acceleration
pub const AXIS_CONTROL_DIM: usize = 2; // velocity-rate, acceleration-rate
pub const DEFAULT_AXES: usize = 3; // x, y, z

// ===== Per-Axis Block Types =====
pub type AxisBlock = SMatrix<f64, AXIS_ORDER, AXIS_ORDER>; // 3×3
pub type AxisControlBlock = SMatrix<f64, AXIS_ORDER, AXIS_CONTROL_DIM>; // 3×2

// ===== Expanded (N-axis) Types =====
pub type StateVec = DVector<f64>;
pub type StateMat = DMatrix<f64>;
pub type ControlVec = DVector<f64>;
pub type MeasurementVec = DVector<f64>;
pub type MeasurementMat = DMatrix<f64>;

/// State length for `axes` independent axes.
pub const fn state_dim(axes: usize) -> usize {
    axes * AXIS_ORDER
}

/// Control vector length for `axes` independent axes.
pub const fn control_dim(axes: usize) -> usize {
    axes * AXIS_CONTROL_DIM
}

pub const fn position_index(axis: usize) -> usize {
    axis * AXIS_ORDER
}

pub const fn velocity_index(axis: usize) -> usize {
    axis * AXIS_ORDER + 1
}

pub const fn acceleration_index(axis: usize) -> usize {
    axis * AXIS_ORDER + 2
}

/// Largest absolute difference between `m` and its transpose.
///
/// Returns `f64::INFINITY` for non-square input so callers can treat it as
/// "not symmetric" without a separate shape check.
pub fn asymmetry(m: &DMatrix<f64>) -> f64 {
    if m.nrows() != m.ncols() {
        return f64::INFINITY;
    }
    let mut worst: f64 = 0.0;
    for i in 0..m.nrows() {
        for j in (i + 1)..m.ncols() {
            worst = worst.max((m[(i, j)] - m[(j, i)]).abs());
        }
    }
    worst
}

pub fn all_finite(m: &DMatrix<f64>) -> bool {
    m.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_layout() {
        assert_eq!(state_dim(DEFAULT_AXES), 9);
        assert_eq!(control_dim(DEFAULT_AXES), 6);
        assert_eq!(position_index(2), 6);
        assert_eq!(velocity_index(1), 4);
        assert_eq!(acceleration_index(0), 2);
    }

    #[test]
    fn test_asymmetry() {
        let sym = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.5, 2.0]);
        assert_eq!(asymmetry(&sym), 0.0);

        let skew = DMatrix::from_row_slice(2, 2, &[1.0, 0.5, 0.25, 2.0]);
        assert!((asymmetry(&skew) - 0.25).abs() < 1e-15);

        let rect = DMatrix::<f64>::zeros(2, 3);
        assert!(asymmetry(&rect).is_infinite());
    }
}
