//! Multi-axis linear Kalman filter for constant-acceleration tracking.
//!
//! A single-axis kinematic model (`[position, velocity, acceleration]`) is
//! expanded block-diagonally across N decoupled axes, and a filter runs the
//! predict/update recursion with a Joseph-form covariance update.

pub mod config;
pub mod driver;
pub mod error;
pub mod expand;
pub mod filters;
pub mod model;
pub mod simulation;
pub mod types;

pub use config::{SimulationConfig, TrackerConfig};
pub use driver::{run, RunHistory, StepOutcome, StepRecord, Tracker};
pub use error::{FilterError, FilterResult};
pub use filters::{FilterPhase, FilterSnapshot, FilterTolerances, KalmanFilter};
pub use model::{KinematicModel, StepMatrices, StepMatrixCache};
pub use simulation::{Measurement, MotionSource, TargetSimulator};
