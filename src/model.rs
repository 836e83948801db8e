//! Constant-acceleration kinematic model
//!
//! Per-axis state is `[position, velocity, acceleration]`. Per-axis control is
//! `[velocity-rate, acceleration-rate]`: the controller cannot command position
//! directly, so the control block is 3×2 while the transition block is 3×3.

use log::debug;
use nalgebra::DMatrix;

use crate::error::{FilterError, FilterResult};
use crate::expand::{block_diagonal, make_nd};
use crate::types::{
    control_dim, position_index, state_dim, AxisBlock, AxisControlBlock, StateMat, StateVec,
    AXIS_ORDER,
};

/// Single-axis transition block.
pub fn axis_transition(dt: f64) -> AxisBlock {
    AxisBlock::new(
        1.0, dt, 0.5 * dt * dt, //
        0.0, 1.0, dt, //
        0.0, 0.0, 1.0,
    )
}

/// Single-axis control block.
pub fn axis_control(dt: f64) -> AxisControlBlock {
    AxisControlBlock::new(
        dt, 0.5 * dt * dt, //
        1.0, dt, //
        0.0, 1.0,
    )
}

/// Single-axis starting covariance: only position is uncertain at epoch.
pub fn axis_initial_uncertainty(position_std: f64) -> AxisBlock {
    let mut p = AxisBlock::zeros();
    p[(0, 0)] = position_std * position_std;
    p
}

fn check_non_negative(name: &str, value: f64) -> FilterResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(FilterError::DegenerateModelParameters(format!(
            "{name} must be finite and non-negative, got {value}"
        )));
    }
    Ok(())
}

/// F, G and Q for one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepMatrices {
    pub dt: f64,
    pub transition: StateMat,
    pub control: DMatrix<f64>,
    pub process_noise: StateMat,
}

/// Builds N-axis kinematic matrices from the per-axis generators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KinematicModel {
    axes: usize,
}

impl KinematicModel {
    pub fn new(axes: usize) -> FilterResult<Self> {
        if axes == 0 {
            return Err(FilterError::DegenerateModelParameters(
                "axis count must be at least 1".to_string(),
            ));
        }
        Ok(Self { axes })
    }

    pub fn axes(&self) -> usize {
        self.axes
    }

    pub fn state_dim(&self) -> usize {
        state_dim(self.axes)
    }

    pub fn control_dim(&self) -> usize {
        control_dim(self.axes)
    }

    pub fn transition(&self, dt: f64) -> FilterResult<StateMat> {
        check_non_negative("dt", dt)?;
        make_nd(self.axes, || axis_transition(dt))
    }

    /// Expanded control matrix. A zero-length interval applies no control.
    pub fn control(&self, dt: f64) -> FilterResult<DMatrix<f64>> {
        check_non_negative("dt", dt)?;
        if dt == 0.0 {
            return Ok(DMatrix::zeros(self.state_dim(), self.control_dim()));
        }
        make_nd(self.axes, || axis_control(dt))
    }

    /// Discrete constant-acceleration noise: `accel_std² · G · Gᵀ`.
    ///
    /// `accel_std == 0` is accepted and yields an exactly-zero matrix, i.e. the
    /// filter fully trusts the motion model.
    pub fn process_noise(&self, dt: f64, accel_std: f64) -> FilterResult<StateMat> {
        check_non_negative("accel_std", accel_std)?;
        let g = self.control(dt)?;
        let n = self.state_dim();
        if accel_std == 0.0 || dt == 0.0 {
            return Ok(StateMat::zeros(n, n));
        }
        Ok(&g * g.transpose() * (accel_std * accel_std))
    }

    /// Observe the position of every axis (m = N).
    pub fn observation(&self) -> DMatrix<f64> {
        let mut h = DMatrix::<f64>::zeros(self.axes, self.state_dim());
        for axis in 0..self.axes {
            h[(axis, position_index(axis))] = 1.0;
        }
        h
    }

    /// Observe the positions of a subset of axes, one row per listed axis.
    pub fn partial_observation(&self, observed_axes: &[usize]) -> FilterResult<DMatrix<f64>> {
        if observed_axes.is_empty() {
            return Err(FilterError::DegenerateModelParameters(
                "at least one axis must be observed".to_string(),
            ));
        }
        let mut h = DMatrix::<f64>::zeros(observed_axes.len(), self.state_dim());
        for (row, &axis) in observed_axes.iter().enumerate() {
            if axis >= self.axes {
                return Err(FilterError::DegenerateModelParameters(format!(
                    "observed axis {axis} out of range for {} axes",
                    self.axes
                )));
            }
            if observed_axes[..row].contains(&axis) {
                return Err(FilterError::DegenerateModelParameters(format!(
                    "axis {axis} observed twice"
                )));
            }
            h[(row, position_index(axis))] = 1.0;
        }
        Ok(h)
    }

    /// Position entries set, velocity and acceleration zero.
    pub fn initial_state(&self, positions: &[f64]) -> FilterResult<StateVec> {
        if positions.len() != self.axes {
            return Err(FilterError::length(
                "initial_state",
                self.axes,
                positions.len(),
            ));
        }
        if positions.iter().any(|p| !p.is_finite()) {
            return Err(FilterError::NonFinite {
                operation: "initial_state",
            });
        }
        let mut x = StateVec::zeros(self.state_dim());
        for (axis, &p) in positions.iter().enumerate() {
            x[axis * AXIS_ORDER] = p;
        }
        Ok(x)
    }

    pub fn initial_uncertainty(&self, position_std: f64) -> FilterResult<StateMat> {
        check_non_negative("initial position std", position_std)?;
        block_diagonal(&axis_initial_uncertainty(position_std), self.axes)
    }

    pub fn step_matrices(&self, dt: f64, accel_std: f64) -> FilterResult<StepMatrices> {
        Ok(StepMatrices {
            dt,
            transition: self.transition(dt)?,
            control: self.control(dt)?,
            process_noise: self.process_noise(dt, accel_std)?,
        })
    }
}

/// Recomputes F, G, Q only when Δt changes.
#[derive(Clone, Debug)]
pub struct StepMatrixCache {
    model: KinematicModel,
    accel_std: f64,
    cached: Option<StepMatrices>,
}

impl StepMatrixCache {
    pub fn new(model: KinematicModel, accel_std: f64) -> FilterResult<Self> {
        check_non_negative("accel_std", accel_std)?;
        Ok(Self {
            model,
            accel_std,
            cached: None,
        })
    }

    pub fn get(&mut self, dt: f64) -> FilterResult<&StepMatrices> {
        let stale = match &self.cached {
            Some(m) => m.dt != dt,
            None => true,
        };
        if stale {
            debug!("Rebuilding step matrices for dt={dt}");
            self.cached = Some(self.model.step_matrices(dt, self.accel_std)?);
        }
        self.cached.as_ref().ok_or_else(|| {
            FilterError::DegenerateModelParameters("step matrices unavailable".to_string())
        })
    }
}
