//! Estimation loop: pull (control, measurement) from a [`MotionSource`],
//! predict, update, and record what a plotting/logging consumer needs.

use log::{info, warn};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::error::{FilterError, FilterResult};
use crate::filters::KalmanFilter;
use crate::model::{KinematicModel, StepMatrixCache};
use crate::simulation::{Measurement, MotionSource};
use crate::types::{position_index, ControlVec};

#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    /// A measurement was available and folded into the estimate
    pub measurement_accepted: bool,

    /// Why the measurement was dropped, if it was
    pub rejection: Option<FilterError>,
}

/// Filter plus the model it is driven with.
pub struct Tracker {
    filter: KalmanFilter,
    model: KinematicModel,
    step_cache: StepMatrixCache,
}

impl Tracker {
    pub fn from_config(config: &TrackerConfig) -> FilterResult<Self> {
        config.validate()?;
        let model = KinematicModel::new(config.axes)?;
        let observation = match &config.observed_axes {
            Some(axes) => model.partial_observation(axes)?,
            None => model.observation(),
        };
        let filter = KalmanFilter::with_tolerances(
            model.initial_state(&config.initial_position)?,
            model.initial_uncertainty(config.initial_position_std)?,
            observation,
            config.tolerances,
        )?;
        Ok(Self {
            filter,
            model,
            step_cache: StepMatrixCache::new(model, config.accel_std)?,
        })
    }

    /// Predict over `dt`, then fold in `measurement` when there is one.
    ///
    /// A singular innovation covariance or a non-finite result drops the
    /// measurement and keeps the predicted estimate; the next call's predict
    /// re-arms the filter. Any other error is returned untouched.
    pub fn step(
        &mut self,
        dt: f64,
        control: &ControlVec,
        measurement: Option<&Measurement>,
    ) -> FilterResult<StepOutcome> {
        let step = self.step_cache.get(dt)?;
        self.filter.predict_with(step, control)?;

        let Some(measurement) = measurement else {
            return Ok(StepOutcome {
                measurement_accepted: false,
                rejection: None,
            });
        };

        match self
            .filter
            .update(&measurement.position, &measurement.covariance)
        {
            Ok(_) => Ok(StepOutcome {
                measurement_accepted: true,
                rejection: None,
            }),
            Err(e) if e.is_recoverable_measurement() => {
                warn!("Dropping measurement: {e}");
                self.filter.note_rejected_measurement();
                Ok(StepOutcome {
                    measurement_accepted: false,
                    rejection: Some(e),
                })
            }
            Err(e) => Err(e),
        }
    }

    pub fn filter(&self) -> &KalmanFilter {
        &self.filter
    }

    pub fn model(&self) -> &KinematicModel {
        &self.model
    }

    fn position_std(&self) -> Vec<f64> {
        (0..self.model.axes())
            .map(|axis| {
                self.filter
                    .std_dev(position_index(axis))
                    .unwrap_or(f64::NAN)
            })
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub time: f64,
    pub truth: Vec<f64>,
    /// Raw measurement, in observation-row order
    pub measured: Option<Vec<f64>>,
    pub measurement_std: Option<Vec<f64>>,
    /// Estimated position per axis
    pub estimate: Vec<f64>,
    pub estimate_std: Vec<f64>,
    pub accepted: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    pub records: Vec<StepRecord>,
}

impl RunHistory {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn accepted_count(&self) -> usize {
        self.records.iter().filter(|r| r.accepted).count()
    }

    /// Root-mean-square position error against the truth, per axis.
    pub fn position_rmse(&self) -> Vec<f64> {
        let Some(first) = self.records.first() else {
            return Vec::new();
        };
        let axes = first.truth.len();
        (0..axes)
            .map(|axis| {
                let sum_sq: f64 = self
                    .records
                    .iter()
                    .map(|r| (r.estimate[axis] - r.truth[axis]).powi(2))
                    .sum();
                (sum_sq / self.records.len() as f64).sqrt()
            })
            .collect()
    }

    /// Table for plotting: one row per step.
    ///
    /// Columns: time, then for each axis truth, estimate, estimate std.
    pub fn to_ndarray(&self) -> Array2<f64> {
        let axes = self.records.first().map(|r| r.truth.len()).unwrap_or(0);
        let cols = 1 + 3 * axes;
        let mut table = Array2::<f64>::zeros((self.records.len(), cols));
        for (row, record) in self.records.iter().enumerate() {
            table[[row, 0]] = record.time;
            for axis in 0..axes {
                let base = 1 + 3 * axis;
                table[[row, base]] = record.truth[axis];
                table[[row, base + 1]] = record.estimate[axis];
                table[[row, base + 2]] = record.estimate_std[axis];
            }
        }
        table
    }
}

/// Run `config.steps` iterations of control → predict → update.
pub fn run<S: MotionSource>(config: &TrackerConfig, source: &mut S) -> FilterResult<(Tracker, RunHistory)> {
    let mut tracker = Tracker::from_config(config)?;
    let mut history = RunHistory::default();

    for _ in 0..config.steps {
        let control = source.control_vector();
        let dt = source.dt();
        let measurement = source.step();
        let outcome = tracker.step(dt, &control, measurement.as_ref())?;

        history.records.push(StepRecord {
            time: source.elapsed(),
            truth: source.true_position(),
            measured: measurement
                .as_ref()
                .map(|m| m.position.iter().copied().collect()),
            measurement_std: measurement.as_ref().map(Measurement::std_devs),
            estimate: (0..config.axes)
                .filter_map(|axis| tracker.filter().position(axis))
                .collect(),
            estimate_std: tracker.position_std(),
            accepted: outcome.measurement_accepted,
        });
    }

    info!(
        "Run complete: {} steps, {} measurements accepted, {} rejected",
        history.len(),
        history.accepted_count(),
        tracker.filter().rejected_updates()
    );
    Ok((tracker, history))
}
