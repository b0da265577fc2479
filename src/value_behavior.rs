//! Range semantics of the stored quantity.
//!
//! A weft file's preamble declares how raw polynomial output relates to the
//! quantity's domain: angles wrap around their span, latitudes clamp to their
//! bounds, and everything else passes through untouched. The same declaration
//! drives fit pre-processing on write (angle unwrapping) and post-processing
//! on read (modulo reduction or clamping).

use std::fmt;

use crate::weft_errors::WeftError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueBehavior {
    /// Result is reduced modulo `max - min` into `[min, max)`.
    Wrapping { min: f64, max: f64 },
    /// Result is clamped to `[min, max]`.
    Bounded { min: f64, max: f64 },
    /// Result is returned raw.
    Unbounded,
}

impl ValueBehavior {
    /// Parse a preamble token such as `wrapping[0,360]` or `bounded[-90,90]`.
    pub fn parse(token: &str) -> Result<Self, WeftError> {
        let (kind, rest) = token
            .split_once('[')
            .ok_or_else(|| WeftError::PreambleInvalid(format!("bad value behavior: {token}")))?;
        let range = rest
            .strip_suffix(']')
            .ok_or_else(|| WeftError::PreambleInvalid(format!("bad value behavior: {token}")))?;
        let (min_str, max_str) = range
            .split_once(',')
            .ok_or_else(|| WeftError::PreambleInvalid(format!("bad value behavior: {token}")))?;

        let min: f64 = min_str
            .trim()
            .parse()
            .map_err(|_| WeftError::PreambleInvalid(format!("bad range bound: {min_str}")))?;
        let max: f64 = max_str
            .trim()
            .parse()
            .map_err(|_| WeftError::PreambleInvalid(format!("bad range bound: {max_str}")))?;
        if max <= min {
            return Err(WeftError::PreambleInvalid(format!(
                "empty value behavior range: {token}"
            )));
        }

        match kind {
            "wrapping" => Ok(ValueBehavior::Wrapping { min, max }),
            "bounded" => Ok(ValueBehavior::Bounded { min, max }),
            _ => Err(WeftError::PreambleInvalid(format!(
                "unknown value behavior kind: {kind}"
            ))),
        }
    }

    /// Post-process a raw polynomial value according to the declared range.
    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            ValueBehavior::Wrapping { min, max } => {
                let span = max - min;
                min + (value - min).rem_euclid(span)
            }
            ValueBehavior::Bounded { min, max } => value.clamp(min, max),
            ValueBehavior::Unbounded => value,
        }
    }

    /// The `(min, max)` range of a wrapping behavior, if any.
    pub fn wrapping_range(&self) -> Option<(f64, f64)> {
        match *self {
            ValueBehavior::Wrapping { min, max } => Some((min, max)),
            _ => None,
        }
    }

    /// Preamble token for this behavior; `None` when unbounded (the field is
    /// simply absent from the preamble).
    pub fn token(&self) -> Option<String> {
        match *self {
            ValueBehavior::Wrapping { min, max } => {
                Some(format!("wrapping[{},{}]", fmt_bound(min), fmt_bound(max)))
            }
            ValueBehavior::Bounded { min, max } => {
                Some(format!("bounded[{},{}]", fmt_bound(min), fmt_bound(max)))
            }
            ValueBehavior::Unbounded => None,
        }
    }
}

impl fmt::Display for ValueBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token() {
            Some(token) => write!(f, "{token}"),
            None => write!(f, "unbounded"),
        }
    }
}

// Integral bounds print without a trailing ".0" so tokens round-trip
// byte-for-byte with files written by other implementations.
fn fmt_bound(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod value_behavior_test {
    use super::*;

    #[test]
    fn test_parse_wrapping() {
        let behavior = ValueBehavior::parse("wrapping[0,360]").unwrap();
        assert_eq!(behavior, ValueBehavior::Wrapping { min: 0.0, max: 360.0 });
    }

    #[test]
    fn test_parse_bounded_negative() {
        let behavior = ValueBehavior::parse("bounded[-90,90]").unwrap();
        assert_eq!(
            behavior,
            ValueBehavior::Bounded {
                min: -90.0,
                max: 90.0
            }
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ValueBehavior::parse("wrapping[0;360]").is_err());
        assert!(ValueBehavior::parse("spinning[0,360]").is_err());
        assert!(ValueBehavior::parse("wrapping[360,0]").is_err());
        assert!(ValueBehavior::parse("wrapping").is_err());
    }

    #[test]
    fn test_apply_wrapping() {
        let behavior = ValueBehavior::Wrapping { min: 0.0, max: 360.0 };
        assert_eq!(behavior.apply(370.0), 10.0);
        assert_eq!(behavior.apply(-10.0), 350.0);
        assert_eq!(behavior.apply(360.0), 0.0);
        assert_eq!(behavior.apply(725.0), 5.0);
    }

    #[test]
    fn test_apply_wrapping_centered() {
        let behavior = ValueBehavior::Wrapping {
            min: -180.0,
            max: 180.0,
        };
        assert_eq!(behavior.apply(190.0), -170.0);
        assert_eq!(behavior.apply(-190.0), 170.0);
    }

    #[test]
    fn test_apply_bounded() {
        let behavior = ValueBehavior::Bounded {
            min: -90.0,
            max: 90.0,
        };
        assert_eq!(behavior.apply(95.0), 90.0);
        assert_eq!(behavior.apply(-95.0), -90.0);
        assert_eq!(behavior.apply(45.0), 45.0);
    }

    #[test]
    fn test_token_round_trip() {
        for token in ["wrapping[0,360]", "bounded[-90,90]", "wrapping[0,24]"] {
            let behavior = ValueBehavior::parse(token).unwrap();
            assert_eq!(behavior.token().unwrap(), token);
        }
        assert_eq!(ValueBehavior::Unbounded.token(), None);
    }
}
