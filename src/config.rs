use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};
use crate::filters::FilterTolerances;
use crate::model::KinematicModel;
use crate::types::DEFAULT_AXES;

/// Reference motion/sensor collaborator settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// True target position relative to the platform at t = 0 [m]
    pub target_position: Vec<f64>,

    /// Peak per-step velocity-rate command [m/s per step]
    pub control_amplitude: f64,

    /// Frequency of the scripted platform motion [Hz]
    pub control_frequency_hz: f64,

    /// Unmodelled acceleration noise applied to the truth [m/s²]
    pub truth_accel_std: f64,

    /// Sensor noise floor [m]
    pub base_measurement_std: f64,

    /// Extra sensor noise per metre of range (noise grows with distance)
    pub range_noise_gain: f64,

    /// Probability that a step yields no measurement
    pub dropout_probability: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            target_position: vec![0.0, 0.0, 0.8],
            control_amplitude: 0.002,
            control_frequency_hz: 2.0,
            truth_accel_std: 0.02,
            base_measurement_std: 0.01,
            range_noise_gain: 0.005,
            dropout_probability: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of independent axes (N)
    pub axes: usize,

    /// Time step [s]
    pub dt: f64,

    /// Acceleration noise std driving Q [m/s²]
    pub accel_std: f64,

    /// Initial position estimate, one entry per axis [m]
    pub initial_position: Vec<f64>,

    /// Initial position std, shared by all axes [m]
    pub initial_position_std: f64,

    /// Axes whose position is measured; `None` observes all of them
    pub observed_axes: Option<Vec<usize>>,

    pub steps: usize,
    pub seed: u64,
    pub tolerances: FilterTolerances,
    pub simulation: SimulationConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            axes: DEFAULT_AXES,
            dt: 0.01,
            accel_std: 0.02,
            initial_position: vec![0.0, 0.0, 0.6],
            initial_position_std: 0.2,
            observed_axes: None,
            steps: 40,
            seed: 0,
            tolerances: FilterTolerances::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

fn non_negative(name: &str, value: f64) -> FilterResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(FilterError::DegenerateModelParameters(format!(
            "{name} must be finite and non-negative, got {value}"
        )));
    }
    Ok(())
}

impl TrackerConfig {
    /// Load a JSON config; missing fields fall back to the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config {}", path.display()))?;
        let config: TrackerConfig = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FilterResult<()> {
        let model = KinematicModel::new(self.axes)?;
        non_negative("dt", self.dt)?;
        non_negative("accel_std", self.accel_std)?;
        non_negative("initial_position_std", self.initial_position_std)?;
        if self.initial_position.len() != self.axes {
            return Err(FilterError::length(
                "config (initial_position)",
                self.axes,
                self.initial_position.len(),
            ));
        }
        if let Some(observed) = &self.observed_axes {
            model.partial_observation(observed)?;
        }
        non_negative("tolerances.symmetry", self.tolerances.symmetry)?;
        if !(self.tolerances.max_condition >= 1.0) {
            return Err(FilterError::DegenerateModelParameters(format!(
                "tolerances.max_condition must be at least 1, got {}",
                self.tolerances.max_condition
            )));
        }

        let sim = &self.simulation;
        if sim.target_position.len() != self.axes {
            return Err(FilterError::length(
                "config (simulation.target_position)",
                self.axes,
                sim.target_position.len(),
            ));
        }
        non_negative("simulation.control_amplitude", sim.control_amplitude)?;
        non_negative("simulation.control_frequency_hz", sim.control_frequency_hz)?;
        non_negative("simulation.truth_accel_std", sim.truth_accel_std)?;
        non_negative("simulation.base_measurement_std", sim.base_measurement_std)?;
        non_negative("simulation.range_noise_gain", sim.range_noise_gain)?;
        if !(0.0..=1.0).contains(&sim.dropout_probability) {
            return Err(FilterError::DegenerateModelParameters(format!(
                "simulation.dropout_probability must be in [0, 1], got {}",
                sim.dropout_probability
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid_reference_run() {
        let config = TrackerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.axes, 3);
        assert_eq!(config.steps, 40);
        assert_eq!(config.initial_position, vec![0.0, 0.0, 0.6]);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "dt": 0.02, "simulation": { "dropout_probability": 0.25 } }"#;
        let config: TrackerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.dt, 0.02);
        assert_eq!(config.accel_std, 0.02);
        assert_eq!(config.simulation.dropout_probability, 0.25);
        assert_eq!(config.simulation.target_position, vec![0.0, 0.0, 0.8]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = TrackerConfig::default();
        config.dt = -0.01;
        assert!(matches!(
            config.validate(),
            Err(FilterError::DegenerateModelParameters(_))
        ));

        let mut config = TrackerConfig::default();
        config.initial_position = vec![0.0, 0.6];
        assert!(matches!(
            config.validate(),
            Err(FilterError::DimensionMismatch { .. })
        ));

        let mut config = TrackerConfig::default();
        config.observed_axes = Some(vec![0, 5]);
        assert!(config.validate().is_err());

        let mut config = TrackerConfig::default();
        config.simulation.dropout_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "kinematic_tracker_config_{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "axes": 2, "initial_position": [1.0, 2.0],
            "simulation": { "target_position": [1.5, 2.5] } }"#)
            .unwrap();
        let config = TrackerConfig::load(&path).unwrap();
        assert_eq!(config.axes, 2);
        std::fs::remove_file(&path).unwrap();

        assert!(TrackerConfig::load(Path::new("/nonexistent/tracker.json")).is_err());
    }
}
