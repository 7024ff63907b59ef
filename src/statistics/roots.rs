//! Bracketing root finder.
//!
//! Monotone relations such as luminosity distance vs. redshift are inverted by
//! bisection with a secant step, which is robust and plenty fast for the
//! handful of inversions a volume computation needs.

use thiserror::Error;

/// Iteration cap; bisection halves the bracket each step.
const MAX_ITERATIONS: usize = 200;

/// Failure modes of [`find_root`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RootError {
    /// `f(lower)` and `f(upper)` have the same sign.
    #[error("root is not bracketed: f({lower}) = {f_lower}, f({upper}) = {f_upper}")]
    NotBracketed {
        /// Lower end of the bracket.
        lower: f64,
        /// Upper end of the bracket.
        upper: f64,
        /// Function value at `lower`.
        f_lower: f64,
        /// Function value at `upper`.
        f_upper: f64,
    },
    /// Function evaluated to NaN inside the bracket.
    #[error("function is not finite at x = {x}")]
    NonFinite {
        /// Offending abscissa.
        x: f64,
    },
}

/// Find `x` in `[lower, upper]` with `f(x) = 0` to absolute tolerance `tol`.
pub fn find_root<F>(f: F, lower: f64, upper: f64, tol: f64) -> Result<f64, RootError>
where
    F: Fn(f64) -> f64,
{
    let (mut a, mut b) = if lower <= upper {
        (lower, upper)
    } else {
        (upper, lower)
    };
    let mut fa = f(a);
    let mut fb = f(b);
    if !fa.is_finite() {
        return Err(RootError::NonFinite { x: a });
    }
    if !fb.is_finite() {
        return Err(RootError::NonFinite { x: b });
    }
    if fa == 0.0 {
        return Ok(a);
    }
    if fb == 0.0 {
        return Ok(b);
    }
    if fa.signum() == fb.signum() {
        return Err(RootError::NotBracketed {
            lower: a,
            upper: b,
            f_lower: fa,
            f_upper: fb,
        });
    }

    for _ in 0..MAX_ITERATIONS {
        // secant guess, fall back to bisection when it leaves the bracket
        let mut x = b - fb * (b - a) / (fb - fa);
        if !(x > a && x < b) {
            x = 0.5 * (a + b);
        }
        let fx = f(x);
        if !fx.is_finite() {
            return Err(RootError::NonFinite { x });
        }
        if fx == 0.0 {
            return Ok(x);
        }
        if fx.signum() == fa.signum() {
            a = x;
            fa = fx;
        } else {
            b = x;
            fb = fx;
        }
        // force a bisection step so one-sided secant updates still converge
        let m = 0.5 * (a + b);
        let fm = f(m);
        if !fm.is_finite() {
            return Err(RootError::NonFinite { x: m });
        }
        if fm == 0.0 {
            return Ok(m);
        }
        if fm.signum() == fa.signum() {
            a = m;
            fa = fm;
        } else {
            b = m;
            fb = fm;
        }
        if (b - a).abs() <= tol {
            break;
        }
    }
    Ok(0.5 * (a + b))
}
