/// Linear Kalman filter over N decoupled constant-acceleration axes
///
/// State Vector (N·3):
/// [3i + 0]: position of axis i
/// [3i + 1]: velocity of axis i
/// [3i + 2]: acceleration of axis i
///
/// F, G and Q are supplied on every predict so Δt may vary between steps.
/// Every predict/update either fully succeeds or leaves (x, P) untouched.
use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};
use crate::model::StepMatrices;
use crate::types::{
    acceleration_index, all_finite, asymmetry, position_index, velocity_index, StateMat,
    StateVec, AXIS_ORDER,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterPhase {
    /// Fresh from construction, or after an update (ready for predict).
    Initialized,
    Predicted,
    Updated,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterTolerances {
    /// Max |Aᵢⱼ - Aⱼᵢ| accepted for Q, R and P₀, relative to max |Aᵢⱼ| (floored at 1)
    pub symmetry: f64,
    /// Largest eigenvalue ratio of the unit-diagonal rescaling of S before it
    /// is treated as singular
    pub max_condition: f64,
}

impl Default for FilterTolerances {
    fn default() -> Self {
        Self {
            symmetry: 1e-9,
            max_condition: 1e12,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FilterSnapshot {
    pub phase: FilterPhase,

    /// Per-axis estimates, in axis order
    pub position: Vec<f64>,
    pub velocity: Vec<f64>,
    pub acceleration: Vec<f64>,

    /// Marginal position standard deviation per axis
    pub position_std: Vec<f64>,

    /// Covariance trace for uncertainty
    pub covariance_trace: f64,

    /// Update counters
    pub predict_count: u64,
    pub update_count: u64,
    pub rejected_updates: u64,
}

#[derive(Clone, Debug)]
pub struct KalmanFilter {
    /// State vector [N·3]
    state: StateVec,

    /// Covariance matrix [N·3 x N·3]
    covariance: StateMat,

    /// Observation matrix H [m x N·3]
    observation: DMatrix<f64>,

    tolerances: FilterTolerances,
    phase: FilterPhase,

    /// z - H·x from the most recent accepted update
    last_innovation: Option<DVector<f64>>,

    predict_count: u64,
    update_count: u64,
    rejected_updates: u64,
}

fn check_shape(
    operation: &'static str,
    m: &DMatrix<f64>,
    expected: (usize, usize),
) -> FilterResult<()> {
    if m.shape() != expected {
        return Err(FilterError::shape(operation, expected, m.shape()));
    }
    Ok(())
}

fn check_symmetric(name: &'static str, m: &DMatrix<f64>, tolerance: f64) -> FilterResult<()> {
    let asym = asymmetry(m);
    if asym > tolerance * m.amax().max(1.0) {
        return Err(FilterError::InvalidCovarianceInput {
            name,
            asymmetry: asym,
        });
    }
    Ok(())
}

/// Condition number of D^-1/2·S·D^-1/2 with D = diag(S).
///
/// Per-axis scale differences cancel out, so only correlation between
/// observation rows can make this large. Assumes a positive diagonal.
fn scaled_condition(s: &DMatrix<f64>) -> f64 {
    let inv_sqrt = s.diagonal().map(|d| 1.0 / d.sqrt());
    let scaled = DMatrix::from_fn(s.nrows(), s.ncols(), |i, j| {
        s[(i, j)] * inv_sqrt[i] * inv_sqrt[j]
    });
    let eigenvalues = scaled.symmetric_eigen().eigenvalues;
    let min_eig = eigenvalues.min();
    if min_eig > 0.0 {
        eigenvalues.max() / min_eig
    } else {
        f64::INFINITY
    }
}

fn symmetrize(m: StateMat) -> StateMat {
    let t = m.transpose();
    (m + t) * 0.5
}

impl KalmanFilter {
    pub fn new(
        initial_state: StateVec,
        initial_covariance: StateMat,
        observation: DMatrix<f64>,
    ) -> FilterResult<Self> {
        Self::with_tolerances(
            initial_state,
            initial_covariance,
            observation,
            FilterTolerances::default(),
        )
    }

    pub fn with_tolerances(
        initial_state: StateVec,
        initial_covariance: StateMat,
        observation: DMatrix<f64>,
        tolerances: FilterTolerances,
    ) -> FilterResult<Self> {
        let n = initial_state.len();
        if n == 0 || n % AXIS_ORDER != 0 {
            return Err(FilterError::DimensionMismatch {
                operation: "new",
                expected: format!("a positive multiple of {AXIS_ORDER}"),
                actual: n.to_string(),
            });
        }
        check_shape("new (covariance)", &initial_covariance, (n, n))?;
        if observation.nrows() == 0 || observation.ncols() != n {
            return Err(FilterError::shape(
                "new (observation)",
                (observation.nrows().max(1), n),
                observation.shape(),
            ));
        }
        if !initial_state.iter().all(|v| v.is_finite())
            || !all_finite(&initial_covariance)
            || !all_finite(&observation)
        {
            return Err(FilterError::NonFinite { operation: "new" });
        }
        check_symmetric("P0", &initial_covariance, tolerances.symmetry)?;

        debug!(
            "Kalman filter initialised: {} states, {} observations",
            n,
            observation.nrows()
        );

        Ok(Self {
            state: initial_state,
            covariance: initial_covariance,
            observation,
            tolerances,
            phase: FilterPhase::Initialized,
            last_innovation: None,
            predict_count: 0,
            update_count: 0,
            rejected_updates: 0,
        })
    }

    /// Time update: x ← F·x + G·u, P ← F·P·Fᵀ + Q.
    pub fn predict(
        &mut self,
        transition: &StateMat,
        control_matrix: &DMatrix<f64>,
        process_noise: &StateMat,
        control: &DVector<f64>,
    ) -> FilterResult<()> {
        let n = self.state.len();
        check_shape("predict (transition)", transition, (n, n))?;
        if control_matrix.nrows() != n {
            return Err(FilterError::shape(
                "predict (control matrix)",
                (n, control_matrix.ncols()),
                control_matrix.shape(),
            ));
        }
        if control.len() != control_matrix.ncols() {
            return Err(FilterError::length(
                "predict (control vector)",
                control_matrix.ncols(),
                control.len(),
            ));
        }
        check_shape("predict (process noise)", process_noise, (n, n))?;
        if !all_finite(transition)
            || !all_finite(control_matrix)
            || !all_finite(process_noise)
            || !control.iter().all(|v| v.is_finite())
        {
            return Err(FilterError::NonFinite {
                operation: "predict",
            });
        }
        check_symmetric("Q", process_noise, self.tolerances.symmetry)?;

        let x_pred = transition * &self.state + control_matrix * control;
        let p_pred = symmetrize(transition * &self.covariance * transition.transpose() + process_noise);

        if !x_pred.iter().all(|v| v.is_finite()) || !all_finite(&p_pred) {
            return Err(FilterError::NonFinite {
                operation: "predict",
            });
        }

        self.state = x_pred;
        self.covariance = p_pred;
        self.phase = FilterPhase::Predicted;
        self.predict_count += 1;
        trace!(
            "predict #{}: trace(P) = {:.6e}",
            self.predict_count,
            self.covariance.trace()
        );
        Ok(())
    }

    pub fn predict_with(&mut self, step: &StepMatrices, control: &DVector<f64>) -> FilterResult<()> {
        self.predict(&step.transition, &step.control, &step.process_noise, control)
    }

    /// Identity "no motion" predict: leaves (x, P) as they are but arms the
    /// filter for an update.
    pub fn predict_stationary(&mut self) -> FilterResult<()> {
        let n = self.state.len();
        let identity = StateMat::identity(n, n);
        let zero_q = StateMat::zeros(n, n);
        let no_control = DMatrix::<f64>::zeros(n, 0);
        self.predict(&identity, &no_control, &zero_q, &DVector::zeros(0))
    }

    /// Measurement update with Joseph-form covariance.
    ///
    /// S must be positive definite and no worse conditioned than
    /// `tolerances.max_condition`; otherwise the update is refused and the
    /// predicted state is kept.
    pub fn update(
        &mut self,
        measurement: &DVector<f64>,
        measurement_noise: &DMatrix<f64>,
    ) -> FilterResult<(&StateVec, &StateMat)> {
        if self.phase != FilterPhase::Predicted {
            return Err(FilterError::UpdateWithoutPredict);
        }
        let n = self.state.len();
        let m = self.observation.nrows();
        if measurement.len() != m {
            return Err(FilterError::length(
                "update (measurement)",
                m,
                measurement.len(),
            ));
        }
        check_shape("update (measurement noise)", measurement_noise, (m, m))?;
        if !measurement.iter().all(|v| v.is_finite()) || !all_finite(measurement_noise) {
            return Err(FilterError::NonFinite {
                operation: "update",
            });
        }
        check_symmetric("R", measurement_noise, self.tolerances.symmetry)?;

        let h = &self.observation;
        let h_t = h.transpose();
        let p = &self.covariance;

        // Innovation covariance: S = H*P*H^T + R
        let s = h * p * &h_t + measurement_noise;
        let min_eig = s.clone().symmetric_eigen().eigenvalues.min();
        let condition = if min_eig > 0.0 {
            scaled_condition(&s)
        } else {
            f64::INFINITY
        };
        if !(min_eig > 0.0) || !(condition <= self.tolerances.max_condition) {
            return Err(FilterError::SingularInnovationCovariance {
                min_eigenvalue: min_eig,
                condition,
            });
        }
        let s_inv = s
            .try_inverse()
            .ok_or(FilterError::SingularInnovationCovariance {
                min_eigenvalue: min_eig,
                condition,
            })?;

        // Kalman gain: K = P*H^T*S^-1
        let k = p * &h_t * s_inv;
        let innovation = measurement - h * &self.state;
        let x_new = &self.state + &k * &innovation;

        // Joseph form: P = (I - K*H)*P*(I - K*H)^T + K*R*K^T
        let i_kh = StateMat::identity(n, n) - &k * h;
        let p_new = symmetrize(
            &i_kh * p * i_kh.transpose() + &k * measurement_noise * k.transpose(),
        );

        if !x_new.iter().all(|v| v.is_finite()) || !all_finite(&p_new) {
            return Err(FilterError::NonFinite {
                operation: "update",
            });
        }

        self.state = x_new;
        self.covariance = p_new;
        self.last_innovation = Some(innovation);
        self.phase = FilterPhase::Updated;
        self.update_count += 1;
        trace!(
            "update #{}: cond(S) = {:.3e}, trace(P) = {:.6e}",
            self.update_count,
            condition,
            self.covariance.trace()
        );
        Ok((&self.state, &self.covariance))
    }

    /// Count a measurement the caller chose to drop after a failed update.
    pub fn note_rejected_measurement(&mut self) {
        self.rejected_updates += 1;
    }

    pub fn state(&self) -> &StateVec {
        &self.state
    }

    pub fn covariance(&self) -> &StateMat {
        &self.covariance
    }

    pub fn observation(&self) -> &DMatrix<f64> {
        &self.observation
    }

    pub fn tolerances(&self) -> &FilterTolerances {
        &self.tolerances
    }

    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    pub fn axes(&self) -> usize {
        self.state.len() / AXIS_ORDER
    }

    pub fn innovation(&self) -> Option<&DVector<f64>> {
        self.last_innovation.as_ref()
    }

    /// Marginal standard deviation of one state component.
    ///
    /// Reads the diagonal only; cross-axis independence is not implied.
    pub fn std_dev(&self, index: usize) -> FilterResult<f64> {
        if index >= self.state.len() {
            return Err(FilterError::length("std_dev", self.state.len(), index));
        }
        Ok(self.covariance[(index, index)].max(0.0).sqrt())
    }

    pub fn position(&self, axis: usize) -> Option<f64> {
        (axis < self.axes()).then(|| self.state[position_index(axis)])
    }

    pub fn velocity(&self, axis: usize) -> Option<f64> {
        (axis < self.axes()).then(|| self.state[velocity_index(axis)])
    }

    pub fn acceleration(&self, axis: usize) -> Option<f64> {
        (axis < self.axes()).then(|| self.state[acceleration_index(axis)])
    }

    pub fn predict_count(&self) -> u64 {
        self.predict_count
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn rejected_updates(&self) -> u64 {
        self.rejected_updates
    }

    /// Get current state snapshot
    pub fn snapshot(&self) -> FilterSnapshot {
        let axes = 0..self.axes();
        FilterSnapshot {
            phase: self.phase,
            position: axes.clone().map(|a| self.state[position_index(a)]).collect(),
            velocity: axes.clone().map(|a| self.state[velocity_index(a)]).collect(),
            acceleration: axes
                .clone()
                .map(|a| self.state[acceleration_index(a)])
                .collect(),
            position_std: axes
                .map(|a| {
                    let i = position_index(a);
                    self.covariance[(i, i)].max(0.0).sqrt()
                })
                .collect(),
            covariance_trace: self.covariance.trace(),
            predict_count: self.predict_count,
            update_count: self.update_count,
            rejected_updates: self.rejected_updates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::KinematicModel;
    use approx::assert_relative_eq;

    fn reference_filter() -> (KinematicModel, KalmanFilter) {
        let model = KinematicModel::new(3).unwrap();
        let x0 = model.initial_state(&[0.0, 0.0, 0.6]).unwrap();
        let p0 = model.initial_uncertainty(0.2).unwrap();
        let kf = KalmanFilter::new(x0, p0, model.observation()).unwrap();
        (model, kf)
    }

    fn assert_symmetric_psd(p: &StateMat) {
        assert!(asymmetry(p) < 1e-12, "asymmetry {}", asymmetry(p));
        let eig = p.clone().symmetric_eigen().eigenvalues;
        assert!(eig.min() >= -1e-12, "min eigenvalue {}", eig.min());
    }

    #[test]
    fn test_reference_scenario_moves_toward_measurement() {
        let (model, mut kf) = reference_filter();
        let step = model.step_matrices(0.01, 0.02).unwrap();
        kf.predict_with(&step, &DVector::zeros(6)).unwrap();
        assert_eq!(kf.phase(), FilterPhase::Predicted);

        let z = DVector::from_vec(vec![0.0, 0.0, 0.62]);
        let r = DMatrix::from_diagonal_element(3, 3, 1e-4);
        let (x, p) = kf.update(&z, &r).unwrap();
        let z_est = x[6];
        assert!(z_est > 0.6 && z_est < 0.62, "z estimate {z_est}");
        assert_symmetric_psd(p);
        assert_eq!(kf.phase(), FilterPhase::Updated);
        assert!(kf.std_dev(6).unwrap() < 0.2);
    }

    #[test]
    fn test_update_without_predict_rejected() {
        let (_, mut kf) = reference_filter();
        let z = DVector::from_vec(vec![0.0, 0.0, 0.62]);
        let r = DMatrix::from_diagonal_element(3, 3, 1e-4);
        assert_eq!(kf.update(&z, &r), Err(FilterError::UpdateWithoutPredict));

        kf.predict_stationary().unwrap();
        assert!(kf.update(&z, &r).is_ok());
        // A second update in the same step is a usage error again
        assert_eq!(
            kf.update(&z, &r).map(|_| ()),
            Err(FilterError::UpdateWithoutPredict)
        );
    }

    #[test]
    fn test_singular_innovation_leaves_state_unchanged() {
        let model = KinematicModel::new(3).unwrap();
        let x0 = model.initial_state(&[1.0, 2.0, 3.0]).unwrap();
        let mut p0 = model.initial_uncertainty(0.5).unwrap();
        // No uncertainty at all on the y axis
        p0[(3, 3)] = 0.0;
        let mut kf = KalmanFilter::new(x0.clone(), p0.clone(), model.observation()).unwrap();
        kf.predict_stationary().unwrap();

        let z = DVector::from_vec(vec![1.1, 2.1, 3.1]);
        let r = DMatrix::zeros(3, 3);
        let err = kf.update(&z, &r).unwrap_err();
        assert!(matches!(
            err,
            FilterError::SingularInnovationCovariance { .. }
        ));
        assert_eq!(kf.state(), &x0);
        assert_eq!(kf.covariance(), &p0);
        assert!(kf.state().iter().all(|v| v.is_finite()));
        assert_eq!(kf.phase(), FilterPhase::Predicted);
    }

    #[test]
    fn test_ill_conditioned_innovation_rejected() {
        let (_, kf) = reference_filter();
        let tolerances = FilterTolerances {
            symmetry: 1e-9,
            max_condition: 10.0,
        };
        let mut kf = KalmanFilter::with_tolerances(
            kf.state().clone(),
            kf.covariance().clone(),
            kf.observation().clone(),
            tolerances,
        )
        .unwrap();
        kf.predict_stationary().unwrap();
        let z = DVector::from_vec(vec![0.0, 0.0, 0.6]);
        // x and y readings almost perfectly correlated
        let r = DMatrix::from_row_slice(3, 3, &[1.0, 0.999, 0.0, 0.999, 1.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(matches!(
            kf.update(&z, &r),
            Err(FilterError::SingularInnovationCovariance { .. })
        ));
    }

    #[test]
    fn test_scale_spread_between_axes_is_not_ill_conditioning() {
        let (_, mut kf) = reference_filter();
        let z = DVector::from_vec(vec![0.01, -0.02, 0.62]);
        let r = DMatrix::from_diagonal(&DVector::from_vec(vec![1e-14, 1.0, 1.0]));
        for cycle in 0..5 {
            kf.predict_stationary().unwrap();
            assert!(kf.update(&z, &r).is_ok(), "update {cycle} refused");
        }
        assert_eq!(kf.update_count(), 5);
        assert_relative_eq!(kf.position(0).unwrap(), 0.01, epsilon = 1e-9);
        assert!(kf.std_dev(0).unwrap() < 1e-6);
        // The coarse axes still move toward their measurements
        assert!(kf.position(2).unwrap() > 0.6);
        assert_symmetric_psd(kf.covariance());
    }

    #[test]
    fn test_large_symmetric_noise_accepted() {
        let (_, mut kf) = reference_filter();
        kf.predict_stationary().unwrap();
        let (c, s) = (0.6_f64, 0.8_f64);
        let rot = DMatrix::from_row_slice(3, 3, &[c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0]);
        let diag = DMatrix::from_diagonal(&DVector::from_vec(vec![4e8, 2.5e7, 1e6]));
        let r = &rot * diag * rot.transpose();
        let z = DVector::from_vec(vec![0.0, 0.0, 0.6]);

        // Tiny next to entries of order 1e8, large next to the 1e-9 tolerance
        let mut skewed = r.clone();
        skewed[(0, 1)] += 1e3;
        assert!(matches!(
            kf.update(&z, &skewed),
            Err(FilterError::InvalidCovarianceInput { name: "R", .. })
        ));

        let mut rounded = r;
        rounded[(0, 1)] += 1e-6;
        assert!(asymmetry(&rounded) > 1e-9);
        assert!(kf.update(&z, &rounded).is_ok());
    }

    #[test]
    fn test_dimension_mismatch_is_atomic() {
        let (model, mut kf) = reference_filter();
        let before = (kf.state().clone(), kf.covariance().clone());
        let step = model.step_matrices(0.01, 0.02).unwrap();

        let err = kf.predict_with(&step, &DVector::zeros(5)).unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { .. }));
        assert_eq!((kf.state().clone(), kf.covariance().clone()), before);
        assert_eq!(kf.phase(), FilterPhase::Initialized);

        let small_f = StateMat::identity(6, 6);
        assert!(kf
            .predict(&small_f, &step.control, &step.process_noise, &DVector::zeros(6))
            .is_err());

        kf.predict_with(&step, &DVector::zeros(6)).unwrap();
        let predicted = (kf.state().clone(), kf.covariance().clone());
        let r = DMatrix::from_diagonal_element(2, 2, 1e-4);
        let err = kf.update(&DVector::zeros(3), &r).unwrap_err();
        assert!(matches!(err, FilterError::DimensionMismatch { .. }));
        assert_eq!((kf.state().clone(), kf.covariance().clone()), predicted);
    }

    #[test]
    fn test_asymmetric_noise_rejected() {
        let (model, mut kf) = reference_filter();
        let mut step = model.step_matrices(0.01, 0.02).unwrap();
        step.process_noise[(0, 1)] += 1e-3;
        assert!(matches!(
            kf.predict_with(&step, &DVector::zeros(6)),
            Err(FilterError::InvalidCovarianceInput { name: "Q", .. })
        ));

        kf.predict_stationary().unwrap();
        let mut r = DMatrix::from_diagonal_element(3, 3, 1e-4);
        r[(2, 0)] = 1e-5;
        assert!(matches!(
            kf.update(&DVector::zeros(3), &r),
            Err(FilterError::InvalidCovarianceInput { name: "R", .. })
        ));
    }

    #[test]
    fn test_non_finite_measurement_rejected() {
        let (_, mut kf) = reference_filter();
        kf.predict_stationary().unwrap();
        let z = DVector::from_vec(vec![0.0, f64::NAN, 0.6]);
        let r = DMatrix::from_diagonal_element(3, 3, 1e-4);
        assert!(matches!(
            kf.update(&z, &r),
            Err(FilterError::NonFinite { .. })
        ));
        assert!(kf.state().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_zero_dt_zero_noise_predict_keeps_covariance() {
        let (model, mut kf) = reference_filter();
        let p0 = kf.covariance().clone();
        let step = model.step_matrices(0.0, 0.0).unwrap();
        for _ in 0..10 {
            kf.predict_with(&step, &DVector::zeros(6)).unwrap();
        }
        assert_eq!(kf.covariance(), &p0);
    }

    #[test]
    fn test_predict_only_trace_non_decreasing() {
        let model = KinematicModel::new(3).unwrap();
        let x0 = model.initial_state(&[0.0, 0.0, 0.0]).unwrap();
        let p0 = StateMat::identity(9, 9) * 0.5;
        let mut kf = KalmanFilter::new(x0, p0, model.observation()).unwrap();
        let step = model.step_matrices(0.1, 0.0).unwrap();
        let mut last_trace = kf.covariance().trace();
        for _ in 0..50 {
            kf.predict_with(&step, &DVector::zeros(6)).unwrap();
            let t = kf.covariance().trace();
            assert!(t >= last_trace - 1e-12);
            last_trace = t;
            assert_symmetric_psd(kf.covariance());
        }
    }

    #[test]
    fn test_control_input_drives_state() {
        let (model, mut kf) = reference_filter();
        let step = model.step_matrices(0.5, 0.0).unwrap();
        // x axis: velocity-rate 1, acceleration-rate 2
        let u = DVector::from_vec(vec![1.0, 2.0, 0.0, 0.0, 0.0, 0.0]);
        kf.predict_with(&step, &u).unwrap();
        assert_relative_eq!(kf.position(0).unwrap(), 0.5 * 1.0 + 0.125 * 2.0);
        assert_relative_eq!(kf.velocity(0).unwrap(), 1.0 + 0.5 * 2.0);
        assert_relative_eq!(kf.acceleration(0).unwrap(), 2.0);
        assert_relative_eq!(kf.position(2).unwrap(), 0.6);
        assert!(kf.position(3).is_none());
    }

    #[test]
    fn test_snapshot_reports_per_axis_values() {
        let (model, mut kf) = reference_filter();
        let step = model.step_matrices(0.01, 0.02).unwrap();
        kf.predict_with(&step, &DVector::zeros(6)).unwrap();
        let r = DMatrix::from_diagonal_element(3, 3, 1e-4);
        kf.update(&DVector::from_vec(vec![0.0, 0.0, 0.62]), &r)
            .unwrap();
        kf.note_rejected_measurement();

        let snap = kf.snapshot();
        assert_eq!(snap.position.len(), 3);
        assert_eq!(snap.phase, FilterPhase::Updated);
        assert_eq!(snap.predict_count, 1);
        assert_eq!(snap.update_count, 1);
        assert_eq!(snap.rejected_updates, 1);
        assert_relative_eq!(snap.position_std[2], kf.std_dev(6).unwrap());
        assert_relative_eq!(snap.covariance_trace, kf.covariance().trace());
        assert!(kf.innovation().is_some());
    }

    #[test]
    fn test_construction_validation() {
        let model = KinematicModel::new(2).unwrap();
        let x0 = model.initial_state(&[0.0, 0.0]).unwrap();
        let p0 = model.initial_uncertainty(1.0).unwrap();

        assert!(KalmanFilter::new(x0.clone(), StateMat::identity(5, 5), model.observation()).is_err());
        assert!(KalmanFilter::new(x0.clone(), p0.clone(), DMatrix::zeros(2, 5)).is_err());
        assert!(KalmanFilter::new(DVector::zeros(4), StateMat::identity(4, 4), DMatrix::zeros(1, 4)).is_err());

        let mut skew = p0.clone();
        skew[(0, 1)] = 0.3;
        assert!(matches!(
            KalmanFilter::new(x0, skew, model.observation()),
            Err(FilterError::InvalidCovarianceInput { name: "P0", .. })
        ));
    }
}
