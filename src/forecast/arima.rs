//! ARIMA(p, d, q) estimation and forecasting.
//!
//! Estimation follows Hannan–Rissanen on the `d`-times differenced series `w`:
//!
//! 1. fit a long AR(m) by least squares to approximate the innovations
//! 2. regress `w_t` on `p` lags of `w` and `q` lags of those innovations to
//!    get `(φ, θ)`, plus a constant `c` only for an undifferenced model
//! 3. run the model once over the whole series to get final residuals and
//!    `σ²`; a missing day is replaced by the model's one-step prediction
//!
//! Forecast variance uses the ψ-weights of `φ(B)(1 - B)^d`, so the band widens
//! with the horizon the way an integrated model should.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;
use crate::math::{design_matrix, solve_least_squares};

/// Extra lags of the long autoregression beyond `p + q`.
const LONG_AR_EXTRA: usize = 4;

/// Roots are pulled inside this radius when an estimate is not stationary or
/// not invertible.
const MAX_ROOT_MODULUS: f64 = 0.98;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// A fit needs strictly more observed points than this.
    pub fn min_observations(&self) -> usize {
        2 * (self.p + self.q)
    }

    /// Only `d = 0` models carry a mean term; an integrated model has no
    /// drift.
    pub fn has_constant(&self) -> bool {
        self.d == 0
    }

    fn long_ar_order(&self) -> usize {
        self.p + self.q + LONG_AR_EXTRA
    }

    /// Estimated coefficients: constant (if any), `p` AR, `q` MA.
    fn param_count(&self) -> usize {
        usize::from(self.has_constant()) + self.p + self.q
    }
}

impl std::fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// One forecast step: point forecast and its standard error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastStep {
    pub mean: f64,
    pub std_error: f64,
}

impl ForecastStep {
    /// `(lower, upper)` at `mean ± z·se`.
    pub fn interval(&self, z: f64) -> (f64, f64) {
        (self.mean - z * self.std_error, self.mean + z * self.std_error)
    }
}

/// A fitted model plus the filtered in-sample state forecasting starts from.
#[derive(Debug, Clone)]
pub struct ArimaModel {
    order: ArimaOrder,
    constant: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    /// Level series with missing days imputed.
    levels: Vec<f64>,
    /// Differenced series, `levels.len() - d` long.
    diffs: Vec<f64>,
    residuals: Vec<f64>,
}

impl ArimaModel {
    /// Fit `order` to a daily series with gaps.
    ///
    /// Leading missing values are skipped. Fails with a model-fit error when
    /// there are too few observations or the regressions are degenerate.
    pub fn fit(values: &[Option<f64>], order: ArimaOrder) -> Result<Self, AppError> {
        let observed = values.iter().filter(|v| v.is_some()).count();
        if observed <= order.min_observations() {
            return Err(AppError::model_fit(format!(
                "{order} needs more than {} observations, the series has {observed}.",
                order.min_observations()
            )));
        }
        if values.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AppError::model_fit("Series contains non-finite values."));
        }

        let first = values.iter().position(Option::is_some).unwrap_or(0);
        let y = &values[first..];
        let coef = difference_coefficients(order.d);
        let diffs = difference(y, &coef);

        let innovations = if order.q > 0 {
            long_ar_innovations(&diffs, order.long_ar_order(), order.has_constant())?
        } else {
            vec![Some(0.0); diffs.len()]
        };
        let beta = arma_regression(&diffs, &innovations, order)?;

        let offset = usize::from(order.has_constant());
        let constant = if order.has_constant() { beta[0] } else { 0.0 };
        let mut ar: Vec<f64> = beta.iter().skip(offset).take(order.p).copied().collect();
        let mut ma: Vec<f64> = beta.iter().skip(offset + order.p).take(order.q).copied().collect();

        if pull_roots_inside(&mut ar, -1.0) {
            log::debug!("{order}: AR part was not stationary, roots pulled inside the unit circle");
        }
        if pull_roots_inside(&mut ma, 1.0) {
            log::debug!("{order}: MA part was not invertible, roots pulled inside the unit circle");
        }

        let mut model = Self {
            order,
            constant,
            ar,
            ma,
            sigma2: 0.0,
            levels: Vec::with_capacity(y.len()),
            diffs: Vec::with_capacity(diffs.len()),
            residuals: Vec::with_capacity(diffs.len()),
        };
        model.filter(y, &coef)?;

        log::debug!(
            "fitted {order}: c={:.4} ar={:?} ma={:?} sigma2={:.4}",
            model.constant,
            model.ar,
            model.ma,
            model.sigma2
        );
        Ok(model)
    }

    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn ar(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma(&self) -> &[f64] {
        &self.ma
    }

    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// In-sample levels with missing days replaced by their prediction.
    pub fn filled_levels(&self) -> &[f64] {
        &self.levels
    }

    /// Forecast `steps` days past the end of the fitted series.
    pub fn forecast(&self, steps: usize) -> Vec<ForecastStep> {
        let d = self.order.d;
        let coef = difference_coefficients(d);

        let mut diffs = self.diffs.clone();
        let mut residuals = self.residuals.clone();
        let mut levels = self.levels.clone();

        let mut cumulative = 0.0;
        let mut out = Vec::with_capacity(steps);
        for psi_h in self.psi_weights(steps) {
            let w = self.predict_diff(&diffs, &residuals, diffs.len());
            diffs.push(w);
            residuals.push(0.0);

            let t = levels.len();
            let level = w - (1..=d).map(|k| coef[k] * levels[t - k]).sum::<f64>();
            levels.push(level);

            cumulative += psi_h * psi_h;
            out.push(ForecastStep {
                mean: level,
                std_error: (self.sigma2 * cumulative).sqrt(),
            });
        }
        out
    }

    /// ψ-weights of the integrated model, `ψ_0 = 1`.
    pub fn psi_weights(&self, count: usize) -> Vec<f64> {
        // φ*(B) = φ(B)(1 - B)^d, stored as the coefficients of 1 - Σ φ*_i B^i.
        let mut poly: Vec<f64> = std::iter::once(1.0).chain(self.ar.iter().map(|a| -a)).collect();
        for _ in 0..self.order.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }
        let phi_star: Vec<f64> = poly.iter().skip(1).map(|c| -c).collect();

        let mut psi = Vec::with_capacity(count);
        for j in 0..count {
            if j == 0 {
                psi.push(1.0);
                continue;
            }
            let theta = self.ma.get(j - 1).copied().unwrap_or(0.0);
            let ar_part: f64 = (1..=j.min(phi_star.len())).map(|i| phi_star[i - 1] * psi[j - i]).sum();
            psi.push(theta + ar_part);
        }
        psi
    }

    /// One-step prediction of `diffs[s]` from everything before it.
    /// Pre-sample terms count as zero.
    fn predict_diff(&self, diffs: &[f64], residuals: &[f64], s: usize) -> f64 {
        let ar: f64 = self
            .ar
            .iter()
            .enumerate()
            .filter(|(i, _)| s > *i)
            .map(|(i, phi)| phi * diffs[s - 1 - i])
            .sum();
        let ma: f64 = self
            .ma
            .iter()
            .enumerate()
            .filter(|(j, _)| s > *j)
            .map(|(j, theta)| theta * residuals[s - 1 - j])
            .sum();
        self.constant + ar + ma
    }

    /// Run the fitted recursion over `y`, imputing gaps, and estimate σ².
    fn filter(&mut self, y: &[Option<f64>], coef: &[f64]) -> Result<(), AppError> {
        let d = self.order.d;
        for t in 0..d.min(y.len()) {
            let fallback = self.levels.last().copied().unwrap_or(0.0);
            self.levels.push(y[t].unwrap_or(fallback));
        }

        let burn_in = self.order.p.max(self.order.q);
        let mut sse = 0.0;
        let mut counted = 0usize;

        for t in d..y.len() {
            let s = t - d;
            let pred = self.predict_diff(&self.diffs, &self.residuals, s);
            let lagged: f64 = (1..=d).map(|k| coef[k] * self.levels[t - k]).sum();
            match y[t] {
                Some(v) => {
                    let w = v + lagged;
                    let e = w - pred;
                    self.levels.push(v);
                    self.diffs.push(w);
                    self.residuals.push(e);
                    if s >= burn_in {
                        sse += e * e;
                        counted += 1;
                    }
                }
                None => {
                    self.levels.push(pred - lagged);
                    self.diffs.push(pred);
                    self.residuals.push(0.0);
                }
            }
        }

        let params = self.order.param_count();
        if counted <= params {
            return Err(AppError::model_fit(format!(
                "{}: only {counted} usable residuals for {params} parameters.",
                self.order
            )));
        }
        self.sigma2 = sse / (counted - params) as f64;

        let finite = self.sigma2.is_finite()
            && self.levels.iter().chain(&self.residuals).all(|v| v.is_finite());
        if !finite {
            return Err(AppError::model_fit(format!(
                "{}: estimation diverged (non-finite residuals).",
                self.order
            )));
        }
        Ok(())
    }
}

/// `(1 - B)^d` as `[1, -d, ...]`, so `w_t = Σ coef[k]·y_{t-k}`.
fn difference_coefficients(d: usize) -> Vec<f64> {
    let mut coef = vec![1.0];
    for _ in 0..d {
        let mut next = vec![0.0; coef.len() + 1];
        for (i, c) in coef.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        coef = next;
    }
    coef
}

/// Differenced series; `None` wherever any level it depends on is missing.
fn difference(y: &[Option<f64>], coef: &[f64]) -> Vec<Option<f64>> {
    let d = coef.len() - 1;
    (d..y.len())
        .map(|t| {
            coef.iter()
                .enumerate()
                .map(|(k, c)| y[t - k].map(|v| c * v))
                .sum::<Option<f64>>()
        })
        .collect()
}

/// Complete regression rows: `(target, regressors)`, with a leading
/// intercept column when `intercept` is set.
fn lagged_rows(
    target: &[Option<f64>],
    lags: &[(&[Option<f64>], usize)],
    intercept: bool,
) -> (Vec<Vec<f64>>, Vec<f64>, Vec<usize>) {
    let start = lags.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut at = Vec::new();
    'rows: for t in start..target.len() {
        let Some(yt) = target[t] else { continue };
        let mut row = Vec::with_capacity(1 + lags.iter().map(|(_, n)| n).sum::<usize>());
        if intercept {
            row.push(1.0);
        }
        for (series, n) in lags {
            for i in 1..=*n {
                match series[t - i] {
                    Some(v) => row.push(v),
                    None => continue 'rows,
                }
            }
        }
        xs.push(row);
        ys.push(yt);
        at.push(t);
    }
    (xs, ys, at)
}

fn solve(xs: &[Vec<f64>], ys: &[f64], stage: &str) -> Result<DVector<f64>, AppError> {
    let cols = xs.first().map(Vec::len).unwrap_or(0);
    if cols == 0 && !xs.is_empty() {
        // Nothing to estimate (ARIMA(0,d,0) without a constant).
        return Ok(DVector::zeros(0));
    }
    if xs.len() <= cols {
        return Err(AppError::model_fit(format!(
            "{stage}: {} complete rows for {cols} coefficients.",
            xs.len()
        )));
    }
    let x: DMatrix<f64> = design_matrix(xs)
        .ok_or_else(|| AppError::model_fit(format!("{stage}: ragged design matrix.")))?;
    let y = DVector::from_column_slice(ys);
    solve_least_squares(&x, &y).ok_or_else(|| AppError::model_fit(format!("{stage}: least squares failed.")))
}

/// Stage 1: residuals of a long AR fit, `None` where the fit has no row.
fn long_ar_innovations(diffs: &[Option<f64>], m: usize, intercept: bool) -> Result<Vec<Option<f64>>, AppError> {
    let (xs, ys, at) = lagged_rows(diffs, &[(diffs, m)], intercept);
    let beta = solve(&xs, &ys, "long autoregression")?;

    let mut innovations = vec![None; diffs.len()];
    for ((row, y), t) in xs.iter().zip(&ys).zip(at) {
        let fitted: f64 = row.iter().zip(beta.iter()).map(|(x, b)| x * b).sum();
        innovations[t] = Some(y - fitted);
    }
    Ok(innovations)
}

/// Stage 2: `[c, φ_1..φ_p, θ_1..θ_q]`, without `c` for an integrated model.
fn arma_regression(
    diffs: &[Option<f64>],
    innovations: &[Option<f64>],
    order: ArimaOrder,
) -> Result<DVector<f64>, AppError> {
    let (xs, ys, _) = lagged_rows(
        diffs,
        &[(diffs, order.p), (innovations, order.q)],
        order.has_constant(),
    );
    solve(&xs, &ys, "ARMA regression")
}

/// Scale `coeffs` so every root of the lag polynomial lies inside
/// `MAX_ROOT_MODULUS`. `sign` is -1 for an AR polynomial `1 - Σ φ_i B^i` and
/// +1 for an MA polynomial `1 + Σ θ_j B^j`. Returns whether anything changed.
fn pull_roots_inside(coeffs: &mut [f64], sign: f64) -> bool {
    let n = coeffs.len();
    if n == 0 {
        return false;
    }
    // Companion matrix of z^n + sign·(c_1 z^{n-1} + ... + c_n); its eigenvalues
    // are the inverse roots of the lag polynomial.
    let companion = DMatrix::from_fn(n, n, |i, j| {
        if i == 0 {
            -sign * coeffs[j]
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    });
    let largest = companion
        .complex_eigenvalues()
        .iter()
        .map(|z| z.norm())
        .fold(0.0_f64, f64::max);
    if !largest.is_finite() || largest < 1.0 {
        return false;
    }

    let scale = MAX_ROOT_MODULUS / largest;
    let mut factor = 1.0;
    for c in coeffs.iter_mut() {
        factor *= scale;
        *c *= factor;
    }
    true
}
