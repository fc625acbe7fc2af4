use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// Fixed-point scalar with 6 decimal places of precision.
///
/// Telemetry fields are stored in this form so repeated ticks stay
/// deterministic across platforms; feedback-model math runs in `f32` and
/// converts on store.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Scalar(pub i64);

impl Scalar {
    pub const SCALE: i64 = 1_000_000;

    pub fn from_f32(value: f32) -> Self {
        Self((value * Self::SCALE as f32).round() as i64)
    }

    /// Converts from `f32`, saturating into the unit interval.
    pub fn from_f32_unit(value: f32) -> Self {
        Self::from_f32(clamp01(value))
    }

    pub fn to_f32(self) -> f32 {
        self.0 as f32 / Self::SCALE as f32
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn one() -> Self {
        Self(Self::SCALE)
    }

    pub fn raw(self) -> i64 {
        self.0
    }

    pub fn clamp(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }

    pub fn clamp01(self) -> Self {
        self.clamp(Self::zero(), Self::one())
    }
}

/// Clamp an `f32` to the unit interval.
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

impl Add for Scalar {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Scalar {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Scalar {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul for Scalar {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self((self.0 * rhs.0) / Self::SCALE)
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_f32())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_f32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_conversion_saturates() {
        assert_eq!(Scalar::from_f32_unit(1.7), Scalar::one());
        assert_eq!(Scalar::from_f32_unit(-0.3), Scalar::zero());
        assert_eq!(Scalar::from_f32_unit(0.25).to_f32(), 0.25);
    }

    #[test]
    fn clamp01_bounds() {
        assert_eq!(clamp01(2.0), 1.0);
        assert_eq!(clamp01(-1.0), 0.0);
        assert_eq!(clamp01(0.5), 0.5);
    }

    #[test]
    fn arithmetic_matches_f32_within_scale() {
        let a = Scalar::from_f32(0.3);
        let b = Scalar::from_f32(0.2);
        assert_eq!((a + b).to_f32(), 0.5);
        assert_eq!((a - b).to_f32(), 0.1);
        assert!(((a * b).to_f32() - 0.06).abs() < 1e-6);
    }
}
