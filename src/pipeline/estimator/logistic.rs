//! L2-regularized logistic regression, used as the propensity model
//!
//! Minimizes `C * sum(logloss) + 0.5 * ||w||^2` with an unpenalized
//! intercept using Newton iterations.

use faer::Mat;

use super::linear::solve_spd;
use super::{validate_fit_input, validate_predict_input, Classifier, EstimatorError, Matrix};

const MODEL_NAME: &str = "LogisticRegression";

/// Newton iterations stop once the largest step falls below this
const STEP_TOLERANCE: f64 = 1e-8;

/// Lower bound on the IRLS weight p * (1 - p)
const MIN_CURVATURE: f64 = 1e-12;

#[inline]
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Binary logistic regression with an L2 penalty
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    c: f64,
    max_iter: usize,
    intercept: f64,
    coefficients: Option<Vec<f64>>,
    n_iter: usize,
    converged: bool,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(1.0, 100)
    }
}

impl LogisticRegression {
    /// `c` is the inverse regularization strength (larger = weaker penalty)
    pub fn new(c: f64, max_iter: usize) -> Self {
        Self {
            c,
            max_iter,
            intercept: 0.0,
            coefficients: None,
            n_iter: 0,
            converged: false,
        }
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    /// Newton iterations used by the last fit
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    fn linear_predictor(&self, beta: &[f64], row: &[f64]) -> f64 {
        beta[0] + row.iter().zip(&beta[1..]).map(|(v, b)| v * b).sum::<f64>()
    }
}

/// Check labels are 0/1 and both classes are present
fn validate_labels(y: &[f64]) -> Result<(), EstimatorError> {
    if let Some(&bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
        return Err(EstimatorError::NonBinaryLabels { value: bad });
    }
    let positives = y.iter().filter(|&&v| v == 1.0).count();
    if positives == 0 || positives == y.len() {
        return Err(EstimatorError::SingleClass {
            model: MODEL_NAME,
            class: y[0],
        });
    }
    Ok(())
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), EstimatorError> {
        validate_fit_input(x, y, MODEL_NAME)?;
        validate_labels(y)?;
        if !(self.c > 0.0 && self.c.is_finite()) {
            return Err(EstimatorError::InvalidConfig(format!(
                "logistic C must be positive, got {}",
                self.c
            )));
        }

        let p = x.cols() + 1;
        let penalty = 1.0 / self.c;
        let mut beta = vec![0.0; p];
        let mut converged = false;
        let mut iterations = 0;

        for _ in 0..self.max_iter {
            iterations += 1;

            let mut grad = Mat::<f64>::zeros(p, 1);
            let mut hess = Mat::<f64>::zeros(p, p);

            for (i, &yi) in y.iter().enumerate() {
                let row = x.row(i);
                let mu = sigmoid(self.linear_predictor(&beta, row));
                let residual = mu - yi;
                let curvature = (mu * (1.0 - mu)).max(MIN_CURVATURE);
                let design = |j: usize| if j == 0 { 1.0 } else { row[j - 1] };

                for a in 0..p {
                    let xa = design(a);
                    grad[(a, 0)] += residual * xa;
                    for b in 0..=a {
                        hess[(a, b)] += curvature * xa * design(b);
                    }
                }
            }
            for a in 0..p {
                for b in 0..a {
                    hess[(b, a)] = hess[(a, b)];
                }
            }

            // Penalize coefficients but not the intercept
            for j in 1..p {
                grad[(j, 0)] += penalty * beta[j];
                hess[(j, j)] += penalty;
            }

            let step = solve_spd(&hess, &grad, MODEL_NAME)?;
            let mut max_step = 0.0f64;
            for (j, b) in beta.iter_mut().enumerate() {
                let delta = step[(j, 0)];
                *b -= delta;
                max_step = max_step.max(delta.abs());
            }

            if !max_step.is_finite() {
                return Err(EstimatorError::NonFinite(MODEL_NAME));
            }
            if max_step < STEP_TOLERANCE {
                converged = true;
                break;
            }
        }

        if !converged {
            eprintln!(
                "Warning: {} did not converge after {} iterations",
                MODEL_NAME, iterations
            );
        }

        self.intercept = beta[0];
        self.coefficients = Some(beta[1..].to_vec());
        self.n_iter = iterations;
        self.converged = converged;
        Ok(())
    }

    fn predict_proba(&self, x: &Matrix) -> Result<Vec<f64>, EstimatorError> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(EstimatorError::NotFitted(MODEL_NAME))?;
        validate_predict_input(x, coefficients.len(), MODEL_NAME)?;

        Ok((0..x.rows())
            .map(|i| {
                let z = self.intercept
                    + x.row(i)
                        .iter()
                        .zip(coefficients.iter())
                        .map(|(v, c)| v * c)
                        .sum::<f64>();
                sigmoid(z)
            })
            .collect())
    }
}
