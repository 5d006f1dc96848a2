use serde_json::Value;

/// Parses a monetary amount that may arrive as a JSON number or as a
/// locale-formatted string. Unparsable input normalizes to 0.0, never an
/// error: the upstream export schema is not under our control and a single
/// bad cell must not poison a whole report.
pub fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => parse_amount_str(s),
        Value::Bool(_) | Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    }
}

/// String form of the parsing policy:
/// - a leading `R$` / `$` currency marker and all whitespace are stripped;
/// - `.` and `,` both present: `.` is the thousands separator, `,` the
///   decimal separator (Brazilian convention);
/// - only `,` present: `,` is the decimal separator;
/// - otherwise the text is parsed as-is.
pub fn parse_amount_str(raw: &str) -> f64 {
    let mut s = raw.trim().to_string();

    for prefix in ["R$", "r$", "$"] {
        if let Some(rest) = s.strip_prefix(prefix) {
            s = rest.to_string();
            break;
        }
    }
    s.retain(|c| !c.is_whitespace());

    let normalized = if s.contains('.') && s.contains(',') {
        s.replace('.', "").replace(',', ".")
    } else if s.contains(',') {
        s.replace(',', ".")
    } else {
        s
    };

    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

/// Revenue and commission fields are defined non-negative; a negative or
/// unparsable source value normalizes to zero.
pub fn parse_non_negative(value: &Value) -> f64 {
    parse_amount(value).max(0.0)
}

/// Formats an amount back into the `R$ 1.234,56` shape used by the
/// rendered report tables.
pub fn format_brl(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = cents / 100;
    let frac = cents % 100;

    let digits = whole.to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if negative { "-" } else { "" };
    format!("{}R$ {},{:02}", sign, grouped, frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_brazilian_format() {
        assert_eq!(parse_amount_str("R$ 1.234,56"), 1234.56);
        assert_eq!(parse_amount_str("1.234,56"), 1234.56);
        assert_eq!(parse_amount_str("12,5"), 12.5);
    }

    #[test]
    fn test_plain_format() {
        assert_eq!(parse_amount_str("1234.56"), 1234.56);
        assert_eq!(parse_amount_str("  42 "), 42.0);
        assert_eq!(parse_amount_str("$19.90"), 19.9);
    }

    #[test]
    fn test_unparsable_is_zero() {
        assert_eq!(parse_amount_str("abc"), 0.0);
        assert_eq!(parse_amount_str(""), 0.0);
        assert_eq!(parse_amount(&Value::Null), 0.0);
        assert_eq!(parse_amount(&json!({"nested": 1})), 0.0);
    }

    #[test]
    fn test_json_values() {
        assert_eq!(parse_amount(&json!(1234.56)), 1234.56);
        assert_eq!(parse_amount(&json!("R$ 1.234,56")), 1234.56);
        assert_eq!(parse_non_negative(&json!(-10.0)), 0.0);
    }

    #[test]
    fn test_format_brl() {
        assert_eq!(format_brl(1234.56), "R$ 1.234,56");
        assert_eq!(format_brl(0.5), "R$ 0,50");
        assert_eq!(format_brl(-99.9), "-R$ 99,90");
        assert_eq!(format_brl(1_000_000.0), "R$ 1.000.000,00");
    }
}
