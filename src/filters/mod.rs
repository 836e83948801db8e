/// Linear state estimators
pub mod kalman;

pub use kalman::{FilterPhase, FilterSnapshot, FilterTolerances, KalmanFilter};
