//! Reference motion/sensor collaborator
//!
//! Produces control vectors and noisy, intermittent position measurements of
//! a target seen from a moving platform. The estimator only depends on the
//! [`MotionSource`] trait; this simulator exists so the binary and the tests
//! have something realistic to track.

use std::f64::consts::TAU;

use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::TrackerConfig;
use crate::error::FilterResult;
use crate::model::{KinematicModel, StepMatrices};
use crate::types::{
    position_index, ControlVec, MeasurementMat, MeasurementVec, StateVec, AXIS_CONTROL_DIM,
};

/// One noisy position observation and its covariance.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub position: MeasurementVec,
    pub covariance: MeasurementMat,
}

impl Measurement {
    /// Per-component standard deviation (diagonal only).
    pub fn std_devs(&self) -> Vec<f64> {
        self.covariance
            .diagonal()
            .iter()
            .map(|v| v.max(0.0).sqrt())
            .collect()
    }
}

/// Source of controls and measurements for the estimation loop.
pub trait MotionSource {
    /// Control applied over the upcoming interval.
    fn control_vector(&mut self) -> ControlVec;

    /// Advance one interval; `None` when the sensor produced nothing.
    fn step(&mut self) -> Option<Measurement>;

    fn true_position(&self) -> Vec<f64>;

    /// Seconds since the start of the run
    fn elapsed(&self) -> f64;

    /// Length of the next interval [s]
    fn dt(&self) -> f64;
}

fn gaussian(rng: &mut StdRng, std: f64) -> f64 {
    if std <= 0.0 {
        return 0.0;
    }
    let n: f64 = rng.sample(StandardNormal);
    n * std
}

/// Target relative to a platform following a scripted sinusoidal command.
///
/// The truth evolves under the same constant-acceleration model the filter
/// uses, plus unmodelled acceleration noise. Sensor noise grows with range.
pub struct TargetSimulator {
    model: KinematicModel,
    step_matrices: StepMatrices,
    truth: StateVec,
    observed_axes: Vec<usize>,
    rng: StdRng,
    elapsed: f64,
    pending_control: Option<ControlVec>,

    control_amplitude: f64,
    control_frequency_hz: f64,
    truth_accel_std: f64,
    base_measurement_std: f64,
    range_noise_gain: f64,
    dropout_probability: f64,
}

impl TargetSimulator {
    pub fn from_config(config: &TrackerConfig) -> FilterResult<Self> {
        config.validate()?;
        let sim = &config.simulation;
        let model = KinematicModel::new(config.axes)?;
        let observed_axes = config
            .observed_axes
            .clone()
            .unwrap_or_else(|| (0..config.axes).collect());

        Ok(Self {
            model,
            step_matrices: model.step_matrices(config.dt, 0.0)?,
            truth: model.initial_state(&sim.target_position)?,
            observed_axes,
            rng: StdRng::seed_from_u64(config.seed),
            elapsed: 0.0,
            pending_control: None,
            control_amplitude: sim.control_amplitude,
            control_frequency_hz: sim.control_frequency_hz,
            truth_accel_std: sim.truth_accel_std,
            base_measurement_std: sim.base_measurement_std,
            range_noise_gain: sim.range_noise_gain,
            dropout_probability: sim.dropout_probability,
        })
    }

    fn scripted_control(&self) -> ControlVec {
        let axes = self.model.axes();
        let omega = TAU * self.control_frequency_hz;
        let mut u = ControlVec::zeros(self.model.control_dim());
        for axis in 0..axes {
            // Stagger the axes so they do not move in lockstep
            let phase = omega * self.elapsed + axis as f64 * TAU / axes as f64;
            u[AXIS_CONTROL_DIM * axis] = self.control_amplitude * phase.sin();
            u[AXIS_CONTROL_DIM * axis + 1] = self.control_amplitude * omega * phase.cos();
        }
        u
    }

    fn range(&self) -> f64 {
        (0..self.model.axes())
            .map(|axis| self.truth[position_index(axis)].powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl MotionSource for TargetSimulator {
    fn control_vector(&mut self) -> ControlVec {
        let u = self.scripted_control();
        self.pending_control = Some(u.clone());
        u
    }

    fn step(&mut self) -> Option<Measurement> {
        let u = match self.pending_control.take() {
            Some(u) => u,
            None => self.scripted_control(),
        };
        let g = &self.step_matrices.control;
        let w = DVector::from_fn(g.ncols(), |_, _| gaussian(&mut self.rng, self.truth_accel_std));
        self.truth = &self.step_matrices.transition * &self.truth + g * (u + w);
        self.elapsed += self.step_matrices.dt;

        if self.dropout_probability > 0.0 && self.rng.gen::<f64>() < self.dropout_probability {
            return None;
        }

        let std = self.base_measurement_std + self.range_noise_gain * self.range();
        let m = self.observed_axes.len();
        let mut position = MeasurementVec::zeros(m);
        for (row, &axis) in self.observed_axes.iter().enumerate() {
            position[row] = self.truth[position_index(axis)] + gaussian(&mut self.rng, std);
        }
        Some(Measurement {
            position,
            covariance: DMatrix::from_diagonal_element(m, m, std * std),
        })
    }

    fn true_position(&self) -> Vec<f64> {
        (0..self.model.axes())
            .map(|axis| self.truth[position_index(axis)])
            .collect()
    }

    fn elapsed(&self) -> f64 {
        self.elapsed
    }

    fn dt(&self) -> f64 {
        self.step_matrices.dt
    }
}
