//! Formatting utilities for numbers and error traces.

use std::fmt::Write;

use crate::error::StackFrame;

/// Significant digits used when rendering numbers
const PRECISION: i32 = 14;

/// Render a number the way C's `%.14g` does
///
/// NaN is always `nan`, whatever its sign bit.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // The exponent after rounding to PRECISION digits picks the notation.
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            trim_fraction(mantissa),
            sign,
            exponent.unsigned_abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

/// Format a runtime error with its trace for human-readable output
pub fn format_stack_trace(message: &str, stack: &[StackFrame]) -> String {
    let mut output = String::new();
    let _ = writeln!(&mut output, "{message}");
    for frame in stack {
        let _ = writeln!(&mut output, "{frame}");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integers() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "-0");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(-42.0), "-42");
        assert_eq!(format_number(12345678901234.0), "12345678901234");
    }

    #[test]
    fn test_fractions() {
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(1.0 / 3.0), "0.33333333333333");
        assert_eq!(format_number(0.0001), "0.0001");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(format_number(1e20), "1e+20");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(1234567890123456789.0), "1.2345678901235e+18");
        assert_eq!(format_number(-2.5e-300), "-2.5e-300");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_number(f64::NAN), "nan");
        assert_eq!(format_number(-f64::NAN), "nan");
        assert_eq!(format_number(f64::INFINITY), "inf");
        assert_eq!(format_number(f64::NEG_INFINITY), "-inf");
    }

    #[test]
    fn test_stack_trace() {
        let stack = [StackFrame {
            function_name: "main".to_string(),
            line: 2,
        }];
        assert_eq!(format_stack_trace("oops", &stack), "oops\n[line 2] in main\n");
    }
}
