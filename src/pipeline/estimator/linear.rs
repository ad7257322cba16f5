//! Ordinary least squares, used as the final CATE model of the DR learner

use faer::prelude::*;
use faer::Side;

use super::{validate_fit_input, validate_predict_input, EstimatorError, Matrix, Regressor};

const MODEL_NAME: &str = "LinearRegression";

/// Relative ridge added to the diagonal, escalated when factorization fails
const JITTER_STEPS: [f64; 4] = [1e-10, 1e-8, 1e-6, 1e-4];

/// Solve `a * x = b` for symmetric positive (semi-)definite `a`
///
/// A ridge of `step * mean(|diag(a)|)` is always added, so collinear
/// designs (e.g. duplicated indicator columns) stay solvable.
pub(crate) fn solve_spd(
    a: &Mat<f64>,
    b: &Mat<f64>,
    context: &'static str,
) -> Result<Mat<f64>, EstimatorError> {
    let n = a.nrows();
    let mean_diag = (0..n).map(|i| a[(i, i)].abs()).sum::<f64>() / n.max(1) as f64;
    let scale = if mean_diag > 0.0 { mean_diag } else { 1.0 };

    for step in JITTER_STEPS {
        let mut jittered = a.clone();
        for i in 0..n {
            jittered[(i, i)] += step * scale;
        }
        if let Ok(chol) = jittered.cholesky(Side::Lower) {
            return Ok(chol.solve(b.as_ref()));
        }
    }

    Err(EstimatorError::SingularMatrix(context))
}

/// Linear model with intercept fitted by least squares
#[derive(Debug, Clone, Default)]
pub struct LinearRegression {
    intercept: f64,
    coefficients: Option<Vec<f64>>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Matrix, y: &[f64]) -> Result<(), EstimatorError> {
        validate_fit_input(x, y, MODEL_NAME)?;

        // Normal equations on the design [1, X]
        let p = x.cols() + 1;
        let mut xtx = Mat::<f64>::zeros(p, p);
        let mut xty = Mat::<f64>::zeros(p, 1);

        for (i, &yi) in y.iter().enumerate() {
            let row = x.row(i);
            let design = |j: usize| if j == 0 { 1.0 } else { row[j - 1] };
            for a in 0..p {
                let xa = design(a);
                xty[(a, 0)] += xa * yi;
                for b in 0..=a {
                    xtx[(a, b)] += xa * design(b);
                }
            }
        }
        for a in 0..p {
            for b in 0..a {
                xtx[(b, a)] = xtx[(a, b)];
            }
        }

        let beta = solve_spd(&xtx, &xty, MODEL_NAME)?;
        let intercept = beta[(0, 0)];
        let coefficients: Vec<f64> = (1..p).map(|j| beta[(j, 0)]).collect();

        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(EstimatorError::NonFinite(MODEL_NAME));
        }

        self.intercept = intercept;
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Matrix) -> Result<Vec<f64>, EstimatorError> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(EstimatorError::NotFitted(MODEL_NAME))?;
        validate_predict_input(x, coefficients.len(), MODEL_NAME)?;

        Ok((0..x.rows())
            .map(|i| {
                self.intercept
                    + x.row(i)
                        .iter()
                        .zip(coefficients.iter())
                        .map(|(v, c)| v * c)
                        .sum::<f64>()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_exact_linear_relationship() {
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let y: Vec<f64> = rows.iter().map(|r| 1.5 + 2.0 * r[0] - 0.5 * r[1]).collect();
        let x = Matrix::from_rows(&rows).unwrap();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        assert!((model.intercept() - 1.5).abs() < 1e-5);
        let coef = model.coefficients().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-5);
        assert!((coef[1] + 0.5).abs() < 1e-5);

        let preds = model.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-5);
        }
    }

    #[test]
    fn test_collinear_columns_still_solve() {
        // Second column duplicates the first
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| 3.0 * i as f64).collect();
        let x = Matrix::from_rows(&rows).unwrap();

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let preds = model.predict(&x).unwrap();
        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-3);
        }
    }

    #[test]
    fn test_intercept_only() {
        let x = Matrix::new(Vec::new(), 4, 0).unwrap();
        let mut model = LinearRegression::new();
        model.fit(&x, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((model.intercept() - 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let model = LinearRegression::new();
        let x = Matrix::from_rows(&[vec![1.0]]).unwrap();
        assert_eq!(model.predict(&x), Err(EstimatorError::NotFitted(MODEL_NAME)));
    }
}
