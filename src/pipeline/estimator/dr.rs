//! Doubly-robust (AIPW) learner for conditional average treatment effects
//!
//! Fitting proceeds in three stages:
//! 1. Cross-fit the nuisance models. For every fold, the outcome model is
//!    trained on `[X, T] -> Y` and the propensity model on `X -> T` using the
//!    remaining folds, then evaluated on the held-out rows.
//! 2. Build the pseudo-outcome
//!    `psi = mu1 - mu0 + T (Y - mu1) / p - (1 - T) (Y - mu0) / (1 - p)`.
//! 3. Regress `psi` on `X` with the final model; its predictions are the
//!    per-row effects.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;

use super::{
    validate_fit_input, Classifier, EstimatorConfig, EstimatorError, LinearRegression,
    LogisticRegression, Matrix, RandomForestRegressor, Regressor,
};

/// Nuisance statistics collected while fitting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitDiagnostics {
    pub n_rows: usize,
    pub n_treated: usize,
    pub n_control: usize,
    pub folds: usize,
    /// Smallest out-of-fold propensity before clipping
    pub propensity_min: f64,
    /// Largest out-of-fold propensity before clipping
    pub propensity_max: f64,
    /// Propensities moved by clipping
    pub clipped_propensities: usize,
}

/// DR learner over arbitrary outcome, propensity and final models
///
/// The stored models are unfitted templates; each fold fits a fresh clone.
#[derive(Debug, Clone)]
pub struct DrLearner<R, C, F> {
    model_regression: R,
    model_propensity: C,
    model_final: F,
    cv: usize,
    min_propensity: f64,
    seed: u64,
    fitted_final: Option<F>,
    n_features: Option<usize>,
    diagnostics: Option<FitDiagnostics>,
}

/// Random forest outcome model, logistic propensity, linear final stage
pub type DefaultDrLearner = DrLearner<RandomForestRegressor, LogisticRegression, LinearRegression>;

impl DefaultDrLearner {
    /// Build the default learner from an estimator configuration
    pub fn from_config(config: &EstimatorConfig) -> Result<Self, EstimatorError> {
        config.validate()?;
        Ok(DrLearner::new(
            RandomForestRegressor::new(config.forest_params()),
            LogisticRegression::new(config.logistic_c, config.logistic_max_iter),
            LinearRegression::new(),
        )
        .with_cv(config.cv_folds)
        .with_min_propensity(config.min_propensity)
        .with_seed(config.seed))
    }
}

impl<R, C, F> DrLearner<R, C, F>
where
    R: Regressor + Clone,
    C: Classifier + Clone,
    F: Regressor + Clone,
{
    pub fn new(model_regression: R, model_propensity: C, model_final: F) -> Self {
        Self {
            model_regression,
            model_propensity,
            model_final,
            cv: 2,
            min_propensity: 1e-6,
            seed: 0,
            fitted_final: None,
            n_features: None,
            diagnostics: None,
        }
    }

    pub fn with_cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self
    }

    pub fn with_min_propensity(mut self, min_propensity: f64) -> Self {
        self.min_propensity = min_propensity;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn diagnostics(&self) -> Option<&FitDiagnostics> {
        self.diagnostics.as_ref()
    }

    /// The fitted final-stage model
    pub fn final_model(&self) -> Option<&F> {
        self.fitted_final.as_ref()
    }

    /// Fit on outcome `y`, binary treatment `t` and covariates `x`
    pub fn fit(
        &mut self,
        y: &[f64],
        t: &[f64],
        x: &Matrix,
    ) -> Result<&FitDiagnostics, EstimatorError> {
        validate_fit_input(x, y, "DrLearner")?;
        if t.len() != x.rows() {
            return Err(EstimatorError::DimensionMismatch {
                what: "treatment length",
                expected: x.rows(),
                found: t.len(),
            });
        }
        if self.cv < 2 {
            return Err(EstimatorError::InvalidConfig(format!(
                "cv must be at least 2, got {}",
                self.cv
            )));
        }
        if !(0.0..0.5).contains(&self.min_propensity) {
            return Err(EstimatorError::InvalidConfig(format!(
                "min_propensity must be in [0, 0.5), got {}",
                self.min_propensity
            )));
        }

        let (n_treated, n_control) = count_arms(t)?;
        let folds = stratified_folds(t, self.cv, self.seed)?;

        let n = x.rows();
        let mut mu0 = vec![0.0; n];
        let mut mu1 = vec![0.0; n];
        let mut propensity = vec![0.0; n];

        for fold in 0..self.cv {
            let (train, test): (Vec<usize>, Vec<usize>) =
                (0..n).partition(|&i| folds[i] != fold);

            let x_train = x.select_rows(&train);
            let t_train: Vec<f64> = train.iter().map(|&i| t[i]).collect();
            let y_train: Vec<f64> = train.iter().map(|&i| y[i]).collect();
            let x_test = x.select_rows(&test);

            let mut outcome_model = self.model_regression.clone();
            outcome_model.fit(&x_train.with_appended_column(&t_train)?, &y_train)?;
            let fold_mu0 = outcome_model.predict(&x_test.with_constant_column(0.0))?;
            let fold_mu1 = outcome_model.predict(&x_test.with_constant_column(1.0))?;

            let mut propensity_model = self.model_propensity.clone();
            propensity_model.fit(&x_train, &t_train)?;
            let fold_p = propensity_model.predict_proba(&x_test)?;

            for (k, &i) in test.iter().enumerate() {
                mu0[i] = fold_mu0[k];
                mu1[i] = fold_mu1[k];
                propensity[i] = fold_p[k];
            }
        }

        let propensity_min = propensity.iter().copied().fold(f64::INFINITY, f64::min);
        let propensity_max = propensity.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let lower = self.min_propensity;
        let upper = 1.0 - self.min_propensity;
        let mut clipped = 0;
        for p in propensity.iter_mut() {
            if *p < lower || *p > upper {
                clipped += 1;
                *p = p.clamp(lower, upper);
            }
        }

        let pseudo_outcomes = aipw_pseudo_outcomes(y, t, &mu0, &mu1, &propensity);
        if pseudo_outcomes.iter().any(|v| !v.is_finite()) {
            return Err(EstimatorError::NonFinite("DR pseudo-outcomes"));
        }

        let mut final_model = self.model_final.clone();
        final_model.fit(x, &pseudo_outcomes)?;

        self.fitted_final = Some(final_model);
        self.n_features = Some(x.cols());
        Ok(&*self.diagnostics.insert(FitDiagnostics {
            n_rows: n,
            n_treated,
            n_control,
            folds: self.cv,
            propensity_min,
            propensity_max,
            clipped_propensities: clipped,
        }))
    }

    /// Per-row effect of moving from control (0) to treatment (1)
    pub fn effect(&self, x: &Matrix) -> Result<Vec<f64>, EstimatorError> {
        let (Some(final_model), Some(n_features)) = (self.fitted_final.as_ref(), self.n_features)
        else {
            return Err(EstimatorError::NotFitted("DrLearner"));
        };
        if x.cols() != n_features {
            return Err(EstimatorError::DimensionMismatch {
                what: "feature count",
                expected: n_features,
                found: x.cols(),
            });
        }
        let effects = final_model.predict(x)?;
        if effects.iter().any(|v| !v.is_finite()) {
            return Err(EstimatorError::NonFinite("DR effect"));
        }
        Ok(effects)
    }

    /// Average treatment effect over the rows of `x`
    pub fn ate(&self, x: &Matrix) -> Result<f64, EstimatorError> {
        let effects = self.effect(x)?;
        if effects.is_empty() {
            return Err(EstimatorError::EmptyInput);
        }
        Ok(effects.iter().sum::<f64>() / effects.len() as f64)
    }
}

/// Count treated and control rows, rejecting non-binary or one-armed input
fn count_arms(t: &[f64]) -> Result<(usize, usize), EstimatorError> {
    if let Some(&bad) = t.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(EstimatorError::NonBinaryLabels { value: bad });
    }
    let n_treated = t.iter().filter(|&&v| v == 1.0).count();
    let n_control = t.len() - n_treated;
    match (n_treated, n_control) {
        (0, _) => Err(EstimatorError::DegenerateTreatment { present: "control" }),
        (_, 0) => Err(EstimatorError::DegenerateTreatment { present: "treatment" }),
        counts => Ok(counts),
    }
}

/// Assign every row to one of `k` folds, shuffling within each arm
fn stratified_folds(t: &[f64], k: usize, seed: u64) -> Result<Vec<usize>, EstimatorError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut folds = vec![0; t.len()];

    for (arm, label) in [("control", 0.0), ("treatment", 1.0)] {
        let mut members: Vec<usize> = (0..t.len()).filter(|&i| t[i] == label).collect();
        if members.len() < k {
            return Err(EstimatorError::InsufficientSamples {
                arm,
                count: members.len(),
                folds: k,
            });
        }
        members.shuffle(&mut rng);
        for (position, &i) in members.iter().enumerate() {
            folds[i] = position % k;
        }
    }

    Ok(folds)
}

/// Augmented inverse-propensity-weighted pseudo-outcomes
fn aipw_pseudo_outcomes(
    y: &[f64],
    t: &[f64],
    mu0: &[f64],
    mu1: &[f64],
    propensity: &[f64],
) -> Vec<f64> {
    (0..y.len())
        .map(|i| {
            let p = propensity[i];
            let treated_term = t[i] * (y[i] - mu1[i]) / p;
            let control_term = (1.0 - t[i]) * (y[i] - mu0[i]) / (1.0 - p);
            mu1[i] - mu0[i] + treated_term - control_term
        })
        .collect()
}
