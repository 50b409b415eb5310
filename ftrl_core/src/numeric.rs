use std::{
    fmt,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub},
    str::FromStr,
};

/// Exponents are clamped to `[-MAX_EXP, MAX_EXP]` before exponentiation.
const MAX_EXP: f64 = 50.0;

/// Lower clamp for predictions entering a log-loss.
const MIN_PRED: f64 = 1e-14;

/// Scalar abstraction over the two supported precisions.
///
/// Every component is generic over `Float` and monomorphized; the precision
/// is picked once at initialization and never dispatched at runtime.
pub trait Float:
    Copy
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + fmt::Debug
    + fmt::Display
    + FromStr
{
    const EPSILON: Self;

    fn zero() -> Self;
    fn one() -> Self;
    fn sqrt(self) -> Self;
    fn abs(self) -> Self;
    fn exp(self) -> Self;
    fn ln(self) -> Self;
    fn min(self, other: Self) -> Self;
    fn max(self, other: Self) -> Self;
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
}

macro_rules! impl_float {
    ($t:ty) => {
        impl Float for $t {
            const EPSILON: Self = <$t>::EPSILON;

            fn zero() -> Self {
                0.0
            }

            fn one() -> Self {
                1.0
            }

            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            fn exp(self) -> Self {
                <$t>::exp(self)
            }

            fn ln(self) -> Self {
                <$t>::ln(self)
            }

            fn min(self, other: Self) -> Self {
                <$t>::min(self, other)
            }

            fn max(self, other: Self) -> Self {
                <$t>::max(self, other)
            }

            fn from_f64(v: f64) -> Self {
                v as $t
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_float!(f32);
impl_float!(f64);

/// `exp` with the argument clamped to `[-50, 50]`.
pub fn safe_exp<T: Float>(x: T) -> T {
    let cap = T::from_f64(MAX_EXP);
    x.min(cap).max(-cap).exp()
}

pub fn sigmoid<T: Float>(x: T) -> T {
    T::one() / (T::one() + safe_exp(-x))
}

/// Equality within the machine epsilon of `T`.
pub fn approx_eq<T: Float>(a: T, b: T) -> bool {
    (a - b).abs() < T::EPSILON
}

pub fn approx_le<T: Float>(a: T, b: T) -> bool {
    approx_eq(a, b) || a < b
}

pub fn approx_gt<T: Float>(a: T, b: T) -> bool {
    !approx_eq(a, b) && a > b
}

/// Clamps a prediction to `[1e-14, 1 - 1e-14]`.
pub fn clamp_pred<T: Float>(p: T) -> T {
    p.min(T::one() - T::from_f64(MIN_PRED)).max(T::from_f64(MIN_PRED))
}

/// Clamped logistic loss. Any `y > 0` counts as the positive class.
pub fn log_loss<T: Float>(y: T, pred: T) -> T {
    let p = clamp_pred(pred);
    if y > T::zero() {
        -p.ln()
    } else {
        -(T::one() - p).max(T::from_f64(MIN_PRED)).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigmoid_saturates_at_clamped_bounds() {
        assert!(sigmoid(1e6f64) > 1.0 - 1e-12);
        assert!(sigmoid(-1e6f64) < 1e-12);
        assert_eq!(clamp_pred(sigmoid(1e6f64)), 1.0 - 1e-14);
        assert_eq!(clamp_pred(sigmoid(-1e6f64)), 1e-14);
    }

    #[test]
    fn sigmoid_is_centered() {
        assert!(approx_eq(sigmoid(0.0f64), 0.5));
        assert!(approx_eq(sigmoid(0.0f32), 0.5));
    }

    #[test]
    fn safe_exp_never_overflows() {
        assert!(safe_exp(1e9f64).is_finite());
        assert!(safe_exp(-1e9f64) > 0.0);
        assert!(approx_eq(safe_exp(1.0f64), 1.0f64.exp()));
    }

    #[test]
    fn tolerance_comparisons() {
        assert!(approx_eq(1.0f64, 1.0 + f64::EPSILON / 2.0));
        assert!(approx_le(1.0f64, 1.0));
        assert!(approx_le(0.5f64, 1.0));
        assert!(!approx_gt(1.0f64, 1.0 + f64::EPSILON / 2.0));
        assert!(approx_gt(2.0f64, 1.0));
    }

    #[test]
    fn log_loss_clamps_degenerate_predictions() {
        let loss = log_loss(1.0f64, 0.0);
        assert!(loss.is_finite());
        assert!(approx_eq(loss, -(1e-14f64).ln()));

        let loss = log_loss(0.0f64, 1.0);
        assert!(loss.is_finite());
    }
}
