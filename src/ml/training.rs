//! Degree-2 polynomial regression over the 7-feature vector.
//!
//! Models are rebuilt wholesale each scheduling cycle from the current
//! rolling window; nothing is persisted or updated incrementally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Pollutant;

use super::{FeatureVector, ModelMetrics, TrainingRow, NUM_FEATURES};

/// Below this row count no model is produced and the forecast falls back
/// to the trend estimator.
pub const MIN_TRAINING_ROWS: usize = 10;

/// Expanded term count: intercept + linear + all degree-2 products.
const NUM_TERMS: usize = 1 + NUM_FEATURES + NUM_FEATURES * (NUM_FEATURES + 1) / 2;

/// Small ridge term keeps the normal equations solvable when features are
/// collinear (e.g. constant pressure across the whole window).
const RIDGE: f64 = 1e-6;

/// A fitted per-pollutant regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedModel {
    pub pollutant: Pollutant,
    pub coefficients: Vec<f64>,
    pub metrics: ModelMetrics,
    pub trained_at: DateTime<Utc>,
}

impl TrainedModel {
    /// Evaluate the regressor on one feature vector. Output is a raw
    /// concentration in the pollutant's canonical unit; the forecast
    /// engine applies weather adjustment and the non-negativity clamp.
    pub fn predict(&self, features: &FeatureVector) -> f64 {
        let terms = expand(&features.normalized());
        terms
            .iter()
            .zip(self.coefficients.iter())
            .map(|(t, c)| t * c)
            .sum()
    }
}

/// Degree-2 polynomial basis: `[1, x1..x7, x1*x1, x1*x2, .., x7*x7]`.
fn expand(x: &[f64; NUM_FEATURES]) -> [f64; NUM_TERMS] {
    let mut terms = [0.0; NUM_TERMS];
    terms[0] = 1.0;
    terms[1..=NUM_FEATURES].copy_from_slice(x);

    let mut k = 1 + NUM_FEATURES;
    for i in 0..NUM_FEATURES {
        for j in i..NUM_FEATURES {
            terms[k] = x[i] * x[j];
            k += 1;
        }
    }
    terms
}

/// Solve `A w = b` for a symmetric positive-definite A via Gaussian
/// elimination with partial pivoting. Returns `None` on a degenerate
/// system (should not happen with the ridge term in place).
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n).max_by(|&r1, &r2| {
            a[r1][col]
                .abs()
                .partial_cmp(&a[r2][col].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        if a[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut w = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for k in (row + 1)..n {
            acc -= a[row][k] * w[k];
        }
        w[row] = acc / a[row][row];
    }
    Some(w)
}

/// Fit a model for one pollutant. Returns `None` (not an error) when there
/// are too few rows; the caller must fall back to the trend forecast.
pub fn train(pollutant: Pollutant, rows: &[TrainingRow]) -> Option<TrainedModel> {
    if rows.len() < MIN_TRAINING_ROWS {
        debug!(
            %pollutant,
            rows = rows.len(),
            min = MIN_TRAINING_ROWS,
            "not enough training rows, skipping model"
        );
        return None;
    }

    let expanded: Vec<[f64; NUM_TERMS]> = rows
        .iter()
        .map(|r| expand(&r.features.normalized()))
        .collect();
    let targets: Vec<f64> = rows.iter().map(|r| r.target).collect();

    // Normal equations: (XᵀX + λI) w = Xᵀy.
    let mut xtx = vec![vec![0.0; NUM_TERMS]; NUM_TERMS];
    let mut xty = vec![0.0; NUM_TERMS];
    for (x, &y) in expanded.iter().zip(targets.iter()) {
        for i in 0..NUM_TERMS {
            xty[i] += x[i] * y;
            for j in 0..NUM_TERMS {
                xtx[i][j] += x[i] * x[j];
            }
        }
    }
    for (i, row) in xtx.iter_mut().enumerate() {
        row[i] += RIDGE;
    }

    let coefficients = solve(xtx, xty)?;

    let predictions: Vec<f64> = expanded
        .iter()
        .map(|x| {
            x.iter()
                .zip(coefficients.iter())
                .map(|(t, c)| t * c)
                .sum::<f64>()
        })
        .collect();

    let n = rows.len() as f64;
    let mse = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (p - t).powi(2))
        .sum::<f64>()
        / n;

    let mean = targets.iter().sum::<f64>() / n;
    let ss_tot: f64 = targets.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = predictions
        .iter()
        .zip(targets.iter())
        .map(|(p, t)| (t - p).powi(2))
        .sum();
    let r2 = if ss_tot.abs() < 1e-10 {
        0.0
    } else {
        1.0 - ss_res / ss_tot
    };

    debug!(%pollutant, rows = rows.len(), mse, r2, "trained model");

    Some(TrainedModel {
        pollutant,
        coefficients,
        metrics: ModelMetrics {
            mse,
            r2,
            n_samples: rows.len(),
        },
        trained_at: Utc::now(),
    })
}
