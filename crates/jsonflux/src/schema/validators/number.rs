use std::cmp::Ordering;

use jsonflux_dom::Number;

use crate::error::{Error, ValidationCode};

/// Constraints applied when the instance is a number.
///
/// Bounds are kept as [`Number`]s so that comparison against large integer
/// instances stays exact instead of going through a double.
#[derive(Debug, Default)]
pub(crate) struct NumberValidator {
    /// `type: "integer"`: the instance must denote a mathematical integer.
    pub(crate) integer: bool,
    pub(crate) minimum: Option<Number>,
    pub(crate) exclusive_minimum: bool,
    pub(crate) maximum: Option<Number>,
    pub(crate) exclusive_maximum: bool,
    pub(crate) multiple_of: Option<Number>,
}

impl NumberValidator {
    pub(crate) fn check(&self, value: &Number, location: &str, offset: u64) -> Result<(), Error> {
        if self.integer && !value.is_integer() {
            return Err(Error::validation(
                ValidationCode::TypeMismatch,
                "expected an integer",
                location,
                offset,
            ));
        }
        if let Some(minimum) = &self.minimum {
            let ordering = value.numeric_cmp(minimum);
            let ok = if self.exclusive_minimum {
                ordering == Ordering::Greater
            } else {
                ordering != Ordering::Less
            };
            if !ok {
                return Err(Error::validation(
                    ValidationCode::NumberOutOfRange,
                    format!("value is below the minimum {minimum}"),
                    location,
                    offset,
                ));
            }
        }
        if let Some(maximum) = &self.maximum {
            let ordering = value.numeric_cmp(maximum);
            let ok = if self.exclusive_maximum {
                ordering == Ordering::Less
            } else {
                ordering != Ordering::Greater
            };
            if !ok {
                return Err(Error::validation(
                    ValidationCode::NumberOutOfRange,
                    format!("value is above the maximum {maximum}"),
                    location,
                    offset,
                ));
            }
        }
        if let Some(step) = &self.multiple_of {
            if !is_multiple_of(value, step) {
                return Err(Error::validation(
                    ValidationCode::NotAMultiple,
                    format!("value is not a multiple of {step}"),
                    location,
                    offset,
                ));
            }
        }
        Ok(())
    }
}

fn is_multiple_of(value: &Number, step: &Number) -> bool {
    let (value_int, value_flags) = value.as_i64();
    let (step_int, step_flags) = step.as_i64();
    if value_flags.is_ok() && step_flags.is_ok() && step_int != 0 {
        return value_int % step_int == 0;
    }
    let (value, _) = value.as_f64();
    let (step, _) = step.as_f64();
    if step == 0.0 {
        return false;
    }
    let ratio = value / step;
    (ratio - ratio.round()).abs() < f64::EPSILON * ratio.abs().max(1.0)
}
