//! Adaptive Simpson quadrature.
//!
//! Used for the comoving-distance and comoving-volume integrals, whose
//! integrands are smooth and strictly positive on the ranges of interest.

use thiserror::Error;

/// Maximum bisection depth before giving up on a subinterval.
const MAX_DEPTH: u32 = 48;

/// Failure modes of [`integrate`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntegrationError {
    /// Integration bounds were not finite.
    #[error("integration bounds must be finite, got [{lower}, {upper}]")]
    NonFiniteBounds {
        /// Lower bound.
        lower: f64,
        /// Upper bound.
        upper: f64,
    },
    /// The integrand produced a NaN or infinite value.
    #[error("integrand is not finite at x = {x}")]
    NonFiniteIntegrand {
        /// Abscissa at which the integrand misbehaved.
        x: f64,
    },
}

/// Integrate `f` over `[lower, upper]` to absolute tolerance `tol`.
///
/// Reversed bounds return the negated integral, equal bounds return zero.
pub fn integrate<F>(f: F, lower: f64, upper: f64, tol: f64) -> Result<f64, IntegrationError>
where
    F: Fn(f64) -> f64,
{
    if !lower.is_finite() || !upper.is_finite() {
        return Err(IntegrationError::NonFiniteBounds { lower, upper });
    }
    if lower == upper {
        return Ok(0.0);
    }
    if lower > upper {
        return integrate(f, upper, lower, tol).map(|v| -v);
    }

    let eval = |x: f64| -> Result<f64, IntegrationError> {
        let y = f(x);
        if y.is_finite() {
            Ok(y)
        } else {
            Err(IntegrationError::NonFiniteIntegrand { x })
        }
    };

    let fa = eval(lower)?;
    let fb = eval(upper)?;
    let mid = 0.5 * (lower + upper);
    let fm = eval(mid)?;
    let whole = simpson(lower, upper, fa, fm, fb);
    adaptive(&eval, lower, upper, fa, fm, fb, whole, tol.max(f64::EPSILON), MAX_DEPTH)
}

#[inline]
fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

#[allow(clippy::too_many_arguments)]
fn adaptive<F>(
    eval: &F,
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
    tol: f64,
    depth: u32,
) -> Result<f64, IntegrationError>
where
    F: Fn(f64) -> Result<f64, IntegrationError>,
{
    let m = 0.5 * (a + b);
    let lm = 0.5 * (a + m);
    let rm = 0.5 * (m + b);
    let flm = eval(lm)?;
    let frm = eval(rm)?;
    let left = simpson(a, m, fa, flm, fm);
    let right = simpson(m, b, fm, frm, fb);
    let delta = left + right - whole;

    if depth == 0 || delta.abs() <= 15.0 * tol {
        // Richardson extrapolation
        return Ok(left + right + delta / 15.0);
    }

    let l = adaptive(eval, a, m, fa, flm, fm, left, tol / 2.0, depth - 1)?;
    let r = adaptive(eval, m, b, fm, frm, fb, right, tol / 2.0, depth - 1)?;
    Ok(l + r)
}
