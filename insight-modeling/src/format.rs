//! Display formatting for statistical values
//!
//! Missing or non-finite input renders as `-`.

const MISSING: &str = "-";

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// `< 0.001` for very small values, otherwise three decimals
pub fn format_p_value(p: Option<f64>) -> String {
    match finite(p) {
        None => MISSING.to_string(),
        Some(p) if p < 0.001 => "< 0.001".to_string(),
        Some(p) => format!("{:.3}", p),
    }
}

/// Effect size with its confidence interval, e.g. `1.50 (1.20 - 1.80)`
pub fn format_effect_size(
    value: Option<f64>,
    lower: Option<f64>,
    upper: Option<f64>,
    precision: usize,
) -> String {
    match (finite(value), finite(lower), finite(upper)) {
        (Some(v), Some(l), Some(u)) => format!(
            "{:.p$} ({:.p$} - {:.p$})",
            v,
            l,
            u,
            p = precision
        ),
        _ => MISSING.to_string(),
    }
}

pub fn format_number(value: Option<f64>, precision: usize) -> String {
    finite(value)
        .map(|v| format!("{:.p$}", v, p = precision))
        .unwrap_or_else(|| MISSING.to_string())
}

/// Fraction in [0, 1] as a percentage
pub fn format_percent(value: Option<f64>, precision: usize) -> String {
    finite(value)
        .map(|v| format!("{:.p$}%", v * 100.0, p = precision))
        .unwrap_or_else(|| MISSING.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p_value() {
        assert_eq!(format_p_value(Some(0.0004)), "< 0.001");
        assert_eq!(format_p_value(Some(0.0042)), "0.004");
        assert_eq!(format_p_value(Some(0.25)), "0.250");
        assert_eq!(format_p_value(None), "-");
        assert_eq!(format_p_value(Some(f64::NAN)), "-");
    }

    #[test]
    fn test_effect_size() {
        assert_eq!(
            format_effect_size(Some(1.5), Some(1.2), Some(1.8), 2),
            "1.50 (1.20 - 1.80)"
        );
        assert_eq!(format_effect_size(Some(1.5), None, Some(1.8), 2), "-");
        assert_eq!(
            format_effect_size(Some(1.5), Some(f64::INFINITY), Some(1.8), 2),
            "-"
        );
    }

    #[test]
    fn test_number_and_percent() {
        assert_eq!(format_number(Some(3.14159), 2), "3.14");
        assert_eq!(format_percent(Some(0.1234), 1), "12.3%");
        assert_eq!(format_percent(None, 1), "-");
    }
}
