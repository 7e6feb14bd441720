use std::fmt;

/// Significant digits shown for floats.
const FLOAT_DIGITS: usize = 6;

/// Runtime value on the operand stack.
///
/// Only two tags exist. Operations never coerce between them: an integer
/// operation handed a float fails, and vice versa.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// 32-bit signed integer.
    Integer(i32),

    /// 64-bit IEEE-754 floating-point number.
    Float(f64),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
        }
    }

    /// Zero test used by `JZ`. Both `0.0` and `-0.0` count as zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Integer(n) => *n == 0,
            Value::Float(f) => *f == 0.0,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(x) => write_float(f, *x),
        }
    }
}

/// Write a float in C's `%g` style: six significant digits, trailing zeros
/// dropped, exponent form when the decimal exponent is below -4 or at
/// least six.
pub fn write_float(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        return f.write_str(if x.is_sign_negative() { "-nan" } else { "nan" });
    }
    if x.is_infinite() {
        return f.write_str(if x < 0.0 { "-inf" } else { "inf" });
    }
    if x == 0.0 {
        return f.write_str(if x.is_sign_negative() { "-0" } else { "0" });
    }

    // The exponent has to come from the rounded form: 999999.5 becomes 1e+06.
    let sci = format!("{:.*e}", FLOAT_DIGITS - 1, x);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return write!(f, "{}", x);
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return write!(f, "{}", x);
    };

    if exp < -4 || exp >= FLOAT_DIGITS as i32 {
        let sign = if exp < 0 { '-' } else { '+' };
        write!(f, "{}e{}{:02}", trim_zeros(mantissa), sign, exp.unsigned_abs())
    } else {
        let decimals = (FLOAT_DIGITS as i32 - 1 - exp) as usize;
        f.write_str(trim_zeros(&format!("{:.*}", decimals, x)))
    }
}

fn trim_zeros(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_integer() {
        assert_eq!(Value::Integer(-42).to_string(), "-42");
    }

    #[test]
    fn test_display_whole_float_has_no_fraction() {
        assert_eq!(Value::Float(7.0).to_string(), "7");
        assert_eq!(Value::Float(3.5).to_string(), "3.5");
    }

    #[test]
    fn test_display_float_rounds_to_six_digits() {
        assert_eq!(Value::Float(0.1 + 0.2).to_string(), "0.3");
        assert_eq!(Value::Float(123456789.0).to_string(), "1.23457e+08");
        assert_eq!(Value::Float(100000.0).to_string(), "100000");
        assert_eq!(Value::Float(-2.5).to_string(), "-2.5");
    }

    #[test]
    fn test_display_float_switches_to_exponent() {
        assert_eq!(Value::Float(1e100).to_string(), "1e+100");
        assert_eq!(Value::Float(1e-7).to_string(), "1e-07");
        assert_eq!(Value::Float(1e-4).to_string(), "0.0001");
        assert_eq!(Value::Float(1e6).to_string(), "1e+06");
        assert_eq!(Value::Float(999999.5).to_string(), "1e+06");
    }

    #[test]
    fn test_display_float_specials() {
        assert_eq!(Value::Float(-0.0).to_string(), "-0");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Float(f64::NEG_INFINITY).to_string(), "-inf");
        assert_eq!(Value::Float(f64::NAN).to_string(), "nan");
    }

    #[test]
    fn test_is_zero() {
        assert!(Value::Integer(0).is_zero());
        assert!(!Value::Integer(1).is_zero());
        assert!(Value::Float(0.0).is_zero());
        assert!(Value::Float(-0.0).is_zero());
        assert!(!Value::Float(0.5).is_zero());
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Integer(1).type_name(), "integer");
        assert_eq!(Value::Float(1.0).type_name(), "float");
    }
}
