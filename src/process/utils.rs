// src/process/utils.rs

use once_cell::sync::Lazy;
use regex::Regex;

/// Currency symbol and thousands separators, anywhere in the cell.
static CURRENCY_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\$,]").unwrap());

/// 1) Parse a currency-formatted cell such as `"$1,234.50"` or `-42`.
///
/// Surrounding whitespace and stray double quotes are ignored. Returns `None`
/// unless the residual text is a finite `f64`.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let unquoted = raw.trim().trim_matches('"');
    let digits = CURRENCY_NOISE.replace_all(unquoted, "");
    let v: f64 = digits.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

/// 2) Internal, space-free form of a display label: each whitespace run becomes `_`.
pub fn internal_name(display: &str) -> String {
    display.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_values_round_trip() {
        assert_eq!(parse_currency("$1,234.00"), Some(1234.0));
        assert_eq!(parse_currency("$1,234.50"), Some(1234.5));
        assert_eq!(parse_currency("-42"), Some(-42.0));
        assert_eq!(parse_currency("0"), Some(0.0));
        assert_eq!(parse_currency("-$1,000"), Some(-1000.0));
        assert_eq!(parse_currency(" \"$12,000,000.25\" "), Some(12_000_000.25));
    }

    #[test]
    fn non_numeric_residuals_are_rejected() {
        for raw in ["N/A", "", "$", "12abc", "NaN", "inf", "-inf", "1.2.3"] {
            assert_eq!(parse_currency(raw), None, "{raw:?} should not parse");
        }
    }

    #[test]
    fn internal_names_have_no_spaces() {
        assert_eq!(internal_name("Unidad de Negocio"), "Unidad_de_Negocio");
        assert_eq!(internal_name("Cuenta"), "Cuenta");
        assert_eq!(internal_name(" Centro  de Costo "), "Centro_de_Costo");
    }

    #[test]
    fn quotes_around_amounts_are_ignored() {
        assert_eq!(parse_currency("\"$5\""), Some(5.0));
        assert_eq!(parse_currency("\""), None);
    }
}
