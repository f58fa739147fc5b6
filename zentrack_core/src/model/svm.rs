//! RBF-kernel support vector machine with probability outputs.
//!
//! One binary machine is trained per class (one-vs-rest) with sequential
//! minimal optimization. Each machine's decision value is mapped to a
//! probability by a Platt sigmoid fitted on the training decision values,
//! and the three probabilities are normalized to sum to one.

use super::{check_training_data, Estimator, Row, CLASS_COUNT};
use crate::{Error, Result, FEATURE_COUNT};
use serde::{Deserialize, Serialize};

/// SVM hyperparameters
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SvmParams {
    /// Soft-margin penalty
    pub c: f64,
    /// Kernel width; `None` uses `1 / (n_features * var(X))`
    pub gamma: Option<f64>,
    /// KKT violation tolerance
    pub tol: f64,
    /// Upper bound on optimization sweeps
    pub max_iter: usize,
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            gamma: None,
            tol: 1e-3,
            max_iter: 1000,
        }
    }
}

/// Fitted one-vs-rest machine for a single class
#[derive(Clone, Debug, Serialize, Deserialize)]
struct BinaryMachine {
    support_vectors: Vec<Row>,
    /// alpha_i * y_i for each support vector
    coefficients: Vec<f64>,
    bias: f64,
    platt_a: f64,
    platt_b: f64,
}

impl BinaryMachine {
    fn validate(&self) -> Result<()> {
        if self.support_vectors.len() != self.coefficients.len() {
            return Err(Error::InvalidArtifact(format!(
                "{} support vectors but {} coefficients",
                self.support_vectors.len(),
                self.coefficients.len()
            )));
        }

        let finite = self.bias.is_finite()
            && self.platt_a.is_finite()
            && self.platt_b.is_finite()
            && self.coefficients.iter().all(|c| c.is_finite())
            && self.support_vectors.iter().flatten().all(|v| v.is_finite());
        if !finite {
            return Err(Error::InvalidArtifact("non-finite SVM parameter".into()));
        }
        Ok(())
    }

    fn decision(&self, x: &Row, gamma: f64) -> f64 {
        self.support_vectors
            .iter()
            .zip(&self.coefficients)
            .map(|(sv, coef)| coef * rbf(sv, x, gamma))
            .sum::<f64>()
            + self.bias
    }

    fn probability(&self, x: &Row, gamma: f64) -> f64 {
        sigmoid_predict(self.decision(x, gamma), self.platt_a, self.platt_b)
    }
}

/// Kernel SVM classifier
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelSvm {
    params: SvmParams,
    gamma: f64,
    machines: Vec<BinaryMachine>,
}

impl KernelSvm {
    pub fn new(params: SvmParams) -> Self {
        Self {
            params,
            gamma: 0.0,
            machines: Vec::new(),
        }
    }

    pub fn params(&self) -> &SvmParams {
        &self.params
    }

    /// Effective kernel width after fitting
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn support_vector_count(&self) -> usize {
        self.machines.iter().map(|m| m.support_vectors.len()).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.machines.len() != CLASS_COUNT {
            return Err(Error::InvalidArtifact(format!(
                "expected {} binary machines, found {}",
                CLASS_COUNT,
                self.machines.len()
            )));
        }
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(Error::InvalidArtifact(format!("invalid gamma {}", self.gamma)));
        }
        self.machines.iter().try_for_each(BinaryMachine::validate)
    }
}

impl Estimator for KernelSvm {
    fn fit(&mut self, x: &[Row], y: &[usize]) -> Result<()> {
        check_training_data(x, y)?;

        self.gamma = match self.params.gamma {
            Some(g) => g,
            None => scale_gamma(x),
        };

        let kernel: Vec<Vec<f64>> = x
            .iter()
            .map(|a| x.iter().map(|b| rbf(a, b, self.gamma)).collect())
            .collect();

        let mut machines = Vec::with_capacity(CLASS_COUNT);
        for class in 0..CLASS_COUNT {
            let targets: Vec<f64> = y
                .iter()
                .map(|&label| if label == class { 1.0 } else { -1.0 })
                .collect();

            if !targets.iter().any(|&t| t > 0.0) || !targets.iter().any(|&t| t < 0.0) {
                return Err(Error::Training(format!(
                    "Class {} needs both positive and negative examples",
                    class
                )));
            }

            let mut smo = Smo::new(&kernel, &targets, self.params.c, self.params.tol);
            smo.solve(self.params.max_iter);

            let decisions: Vec<f64> = (0..x.len()).map(|i| smo.decision(i)).collect();
            let (platt_a, platt_b) = sigmoid_train(&decisions, &targets);

            let mut support_vectors = Vec::new();
            let mut coefficients = Vec::new();
            for (i, alpha) in smo.alpha.iter().enumerate() {
                if *alpha > 1e-8 {
                    support_vectors.push(x[i]);
                    coefficients.push(alpha * targets[i]);
                }
            }

            machines.push(BinaryMachine {
                support_vectors,
                coefficients,
                bias: smo.bias,
                platt_a,
                platt_b,
            });
        }

        self.machines = machines;
        tracing::debug!(
            "Fitted RBF SVM (gamma={:.4}) with {} support vectors",
            self.gamma,
            self.support_vector_count()
        );
        Ok(())
    }

    fn predict_proba(&self, x: &Row) -> [f64; CLASS_COUNT] {
        let uniform = [1.0 / CLASS_COUNT as f64; CLASS_COUNT];
        if self.machines.len() != CLASS_COUNT {
            return uniform;
        }

        let mut proba = [0.0; CLASS_COUNT];
        for (p, machine) in proba.iter_mut().zip(&self.machines) {
            *p = machine.probability(x, self.gamma);
        }

        let total: f64 = proba.iter().sum();
        if total <= f64::MIN_POSITIVE || !total.is_finite() {
            return uniform;
        }
        proba.map(|p| p / total)
    }
}

fn rbf(a: &Row, b: &Row, gamma: f64) -> f64 {
    let dist2: f64 = a.iter().zip(b).map(|(u, v)| (u - v) * (u - v)).sum();
    (-gamma * dist2).exp()
}

/// `1 / (n_features * var)` over every element of the matrix
fn scale_gamma(x: &[Row]) -> f64 {
    let values: Vec<f64> = x.iter().flat_map(|r| r.iter().copied()).collect();
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if var > f64::EPSILON {
        1.0 / (FEATURE_COUNT as f64 * var)
    } else {
        1.0
    }
}

/// Sequential minimal optimization over a precomputed kernel matrix
struct Smo<'a> {
    kernel: &'a [Vec<f64>],
    y: &'a [f64],
    c: f64,
    tol: f64,
    alpha: Vec<f64>,
    bias: f64,
}

impl<'a> Smo<'a> {
    fn new(kernel: &'a [Vec<f64>], y: &'a [f64], c: f64, tol: f64) -> Self {
        Self {
            kernel,
            y,
            c,
            tol,
            alpha: vec![0.0; y.len()],
            bias: 0.0,
        }
    }

    fn decision(&self, i: usize) -> f64 {
        self.alpha
            .iter()
            .zip(self.y)
            .enumerate()
            .map(|(j, (a, y))| a * y * self.kernel[j][i])
            .sum::<f64>()
            + self.bias
    }

    fn error(&self, i: usize) -> f64 {
        self.decision(i) - self.y[i]
    }

    fn violates_kkt(&self, i: usize) -> bool {
        let r = self.y[i] * self.error(i);
        (r < -self.tol && self.alpha[i] < self.c) || (r > self.tol && self.alpha[i] > 0.0)
    }

    /// Sweep until a full pass changes nothing
    fn solve(&mut self, max_iter: usize) {
        let n = self.y.len();
        for sweep in 0..max_iter {
            let mut changed = 0;
            for i in 0..n {
                if self.violates_kkt(i) && self.examine(i) {
                    changed += 1;
                }
            }
            if changed == 0 {
                tracing::trace!("SMO converged after {} sweeps", sweep + 1);
                return;
            }
        }
        tracing::debug!("SMO stopped at the sweep limit ({})", max_iter);
    }

    /// Pick a partner for `i`: largest |E_i - E_j| first, then every other index
    fn examine(&mut self, i: usize) -> bool {
        let n = self.y.len();
        let ei = self.error(i);
        let errors: Vec<f64> = (0..n).map(|j| self.error(j)).collect();

        let best = (0..n)
            .filter(|&j| j != i)
            .max_by(|&a, &b| (ei - errors[a]).abs().total_cmp(&(ei - errors[b]).abs()));

        if let Some(j) = best {
            if self.take_step(i, j) {
                return true;
            }
        }

        (1..n)
            .map(|offset| (i + offset) % n)
            .filter(|&j| Some(j) != best)
            .any(|j| self.take_step(i, j))
    }

    fn take_step(&mut self, i: usize, j: usize) -> bool {
        if i == j {
            return false;
        }

        let (yi, yj) = (self.y[i], self.y[j]);
        let (ai, aj) = (self.alpha[i], self.alpha[j]);
        let ei = self.error(i);
        let ej = self.error(j);

        let (low, high) = if yi != yj {
            ((aj - ai).max(0.0), (self.c + aj - ai).min(self.c))
        } else {
            ((ai + aj - self.c).max(0.0), (ai + aj).min(self.c))
        };
        if high - low < 1e-12 {
            return false;
        }

        let kii = self.kernel[i][i];
        let kjj = self.kernel[j][j];
        let kij = self.kernel[i][j];
        let eta = 2.0 * kij - kii - kjj;
        if eta >= 0.0 {
            return false;
        }

        let aj_new = (aj - yj * (ei - ej) / eta).clamp(low, high);
        if (aj_new - aj).abs() < 1e-5 {
            return false;
        }
        let ai_new = ai + yi * yj * (aj - aj_new);

        let b1 = self.bias - ei - yi * (ai_new - ai) * kii - yj * (aj_new - aj) * kij;
        let b2 = self.bias - ej - yi * (ai_new - ai) * kij - yj * (aj_new - aj) * kjj;
        self.bias = if ai_new > 0.0 && ai_new < self.c {
            b1
        } else if aj_new > 0.0 && aj_new < self.c {
            b2
        } else {
            (b1 + b2) / 2.0
        };

        self.alpha[i] = ai_new;
        self.alpha[j] = aj_new;
        true
    }
}

/// Fit Platt's sigmoid `P(y=1|f) = 1 / (1 + exp(A*f + B))`
///
/// Newton iterations with backtracking line search on regularized targets
/// (Lin, Lin & Weng 2007).
fn sigmoid_train(decisions: &[f64], targets: &[f64]) -> (f64, f64) {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    let prior1 = targets.iter().filter(|&&t| t > 0.0).count() as f64;
    let prior0 = targets.len() as f64 - prior1;

    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let t: Vec<f64> = targets
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decisions
            .iter()
            .zip(&t)
            .map(|(f, ti)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    ti * f_apb + (-f_apb).exp().ln_1p()
                } else {
                    (ti - 1.0) * f_apb + f_apb.exp().ln_1p()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..MAX_ITER {
        let (mut h11, mut h22, mut h21, mut g1, mut g2) = (SIGMA, SIGMA, 0.0, 0.0, 0.0);
        for (f, ti) in decisions.iter().zip(&t) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = ti - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < EPS && g2.abs() < EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let new_a = a + step * da;
            let new_b = b + step * db;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }

        if step < MIN_STEP {
            tracing::debug!("Platt line search failed; keeping last sigmoid");
            break;
        }
    }

    (a, b)
}

fn sigmoid_predict(decision: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision * a + b;
    if f_apb >= 0.0 {
        let e = (-f_apb).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}
