/// Axis-wise block-diagonal expansion
///
/// A single-axis matrix is replicated along the diagonal of an N-axis matrix.
/// Axes are assumed fully decoupled: every off-diagonal block is zero. This is
/// the documented scope of the model, not something to be patched with cross
/// terms here.
use nalgebra::{DMatrix, SMatrix};

use crate::error::{FilterError, FilterResult};

fn check_axes(axes: usize) -> FilterResult<()> {
    if axes == 0 {
        return Err(FilterError::DegenerateModelParameters(
            "axis count must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Expand a fixed-size R×C block into an (N·R)×(N·C) block-diagonal matrix.
pub fn block_diagonal<const R: usize, const C: usize>(
    block: &SMatrix<f64, R, C>,
    axes: usize,
) -> FilterResult<DMatrix<f64>> {
    check_axes(axes)?;
    let mut out = DMatrix::<f64>::zeros(axes * R, axes * C);
    for i in 0..axes {
        out.fixed_view_mut::<R, C>(i * R, i * C).copy_from(block);
    }
    Ok(out)
}

/// Higher-order form: call `generator` once and expand its output.
///
/// ```
/// use kinematic_tracker_rs::expand::make_nd;
/// use kinematic_tracker_rs::model::axis_transition;
///
/// let f = make_nd(3, || axis_transition(0.01)).unwrap();
/// assert_eq!(f.shape(), (9, 9));
/// ```
pub fn make_nd<const R: usize, const C: usize, G>(
    axes: usize,
    generator: G,
) -> FilterResult<DMatrix<f64>>
where
    G: FnOnce() -> SMatrix<f64, R, C>,
{
    block_diagonal(&generator(), axes)
}

/// Runtime-shaped variant of [`block_diagonal`].
pub fn block_diagonal_dyn(block: &DMatrix<f64>, axes: usize) -> FilterResult<DMatrix<f64>> {
    check_axes(axes)?;
    let (rows, cols) = block.shape();
    let mut out = DMatrix::<f64>::zeros(axes * rows, axes * cols);
    for i in 0..axes {
        out.view_mut((i * rows, i * cols), (rows, cols))
            .copy_from(block);
    }
    Ok(out)
}

/// Copy out diagonal block `axis` of a block-diagonal matrix.
pub fn axis_block(
    m: &DMatrix<f64>,
    axis: usize,
    rows: usize,
    cols: usize,
) -> FilterResult<DMatrix<f64>> {
    let (r0, c0) = (axis * rows, axis * cols);
    if r0 + rows > m.nrows() || c0 + cols > m.ncols() {
        return Err(FilterError::shape(
            "axis_block",
            (r0 + rows, c0 + cols),
            m.shape(),
        ));
    }
    Ok(m.view((r0, c0), (rows, cols)).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2x3, Matrix3, Matrix3x2};

    fn assert_block_diagonal(m: &DMatrix<f64>, block: &DMatrix<f64>, axes: usize) {
        let (rows, cols) = block.shape();
        assert_eq!(m.shape(), (axes * rows, axes * cols));
        for i in 0..m.nrows() {
            for j in 0..m.ncols() {
                let (bi, bj) = (i / rows, j / cols);
                if bi == bj {
                    assert_eq!(m[(i, j)], block[(i % rows, j % cols)]);
                } else {
                    assert_eq!(m[(i, j)], 0.0, "off-block entry ({i}, {j})");
                }
            }
        }
    }

    #[test]
    fn test_square_block_for_several_axis_counts() {
        let block = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let dyn_block = DMatrix::from_iterator(3, 3, block.iter().copied());
        for axes in [1, 2, 3, 5] {
            let m = block_diagonal(&block, axes).unwrap();
            assert_block_diagonal(&m, &dyn_block, axes);
        }
    }

    #[test]
    fn test_rectangular_block_for_several_axis_counts() {
        let block = Matrix3x2::new(0.1, 0.2, 1.0, 0.3, 0.0, 1.0);
        let dyn_block = DMatrix::from_iterator(3, 2, block.iter().copied());
        for axes in [1, 2, 3, 5] {
            let m = make_nd(axes, || block).unwrap();
            assert_block_diagonal(&m, &dyn_block, axes);
        }
    }

    #[test]
    fn test_wide_block_and_dyn_agree() {
        let block = Matrix2x3::new(1.0, 0.0, -1.0, 2.0, 3.0, 4.0);
        let dyn_block = DMatrix::from_iterator(2, 3, block.iter().copied());
        let fixed = block_diagonal(&block, 4).unwrap();
        let dynamic = block_diagonal_dyn(&dyn_block, 4).unwrap();
        assert_eq!(fixed, dynamic);
        assert_block_diagonal(&dynamic, &dyn_block, 4);
    }

    #[test]
    fn test_zero_axes_rejected() {
        let block = Matrix3::<f64>::identity();
        assert!(matches!(
            block_diagonal(&block, 0),
            Err(FilterError::DegenerateModelParameters(_))
        ));
    }

    #[test]
    fn test_axis_block_extraction() {
        let block = Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0);
        let m = block_diagonal(&block, 3).unwrap();
        let second = axis_block(&m, 1, 3, 3).unwrap();
        assert_eq!(second, DMatrix::from_iterator(3, 3, block.iter().copied()));
        assert!(axis_block(&m, 3, 3, 3).is_err());
    }
}
