//! Chebyshev polynomial kernel.
//!
//! Blocks store truncated Chebyshev-T series; this module evaluates them with
//! the Clenshaw recurrence, fits coefficients to irregularly spaced samples by
//! least squares, and unwraps angular sample sequences so that wrapping
//! quantities become continuous signals before fitting.

use nalgebra::{DMatrix, DVector};

use crate::weft_errors::WeftError;

/// Evaluate `Σ c_n · T_n(x)` with the Clenshaw recurrence.
///
/// Arguments
/// -----------------
/// * `coeffs`: Chebyshev coefficients, lowest order first.
/// * `x`: Evaluation point, must already lie in `[-1, 1]` (callers clamp).
///
/// Return
/// ----------
/// * The series value. An empty coefficient slice evaluates to `0.0`.
pub fn evaluate_chebyshev(coeffs: &[f64], x: f64) -> f64 {
    match coeffs.len() {
        0 => 0.0,
        1 => coeffs[0],
        _ => {
            let mut b_k1 = 0.0;
            let mut b_k2 = 0.0;
            let two_x = 2.0 * x;
            for &c in coeffs.iter().skip(1).rev() {
                let b_k = two_x * b_k1 - b_k2 + c;
                b_k2 = b_k1;
                b_k1 = b_k;
            }
            x * b_k1 - b_k2 + coeffs[0]
        }
    }
}

/// Least-squares fit of a degree-`degree` Chebyshev series to samples.
///
/// The samples may be irregularly spaced; `xs` must already be normalized to
/// `[-1, 1]`. The design matrix of `T_n(x_i)` values is built with the
/// three-term recurrence and solved through SVD.
///
/// Arguments
/// -----------------
/// * `xs`: Normalized sample abscissae.
/// * `ys`: Sample values, same length as `xs`.
/// * `degree`: Order of the truncated series.
///
/// Return
/// ----------
/// * Exactly `degree + 1` coefficients, lowest order first.
/// * [`WeftError::InsufficientSamples`] when fewer than `degree + 1` samples
///   are provided.
pub fn fit_chebyshev(xs: &[f64], ys: &[f64], degree: usize) -> Result<Vec<f64>, WeftError> {
    let n = xs.len();
    let n_coeffs = degree + 1;
    if n < n_coeffs || ys.len() < n_coeffs {
        return Err(WeftError::InsufficientSamples {
            needed: n_coeffs,
            got: n.min(ys.len()),
        });
    }

    let mut design = DMatrix::zeros(n, n_coeffs);
    for (i, &x) in xs.iter().enumerate() {
        design[(i, 0)] = 1.0;
        if n_coeffs > 1 {
            design[(i, 1)] = x;
        }
        for j in 2..n_coeffs {
            design[(i, j)] = 2.0 * x * design[(i, j - 1)] - design[(i, j - 2)];
        }
    }

    let rhs = DVector::from_column_slice(ys);
    let solution = design
        .svd(true, true)
        .solve(&rhs, 1e-12)
        .map_err(WeftError::FitFailed)?;

    Ok(solution.iter().copied().collect())
}

/// Unwrap a sequence of wrapping values into a continuous signal.
///
/// Whenever two consecutive values jump by more than half the span
/// `max - min`, the smaller-magnitude representative is chosen by adding or
/// subtracting whole spans. The inverse is applied implicitly on read through
/// the wrapping modulo.
pub fn unwrap_angles(values: &[f64], min: f64, max: f64) -> Vec<f64> {
    let span = max - min;
    let half_span = span / 2.0;

    let mut unwrapped = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return unwrapped;
    };
    unwrapped.push(first);

    let mut previous = first;
    for window in values.windows(2) {
        let mut diff = window[1] - window[0];
        if diff > half_span {
            diff -= span;
        } else if diff < -half_span {
            diff += span;
        }
        previous += diff;
        unwrapped.push(previous);
    }

    unwrapped
}
