//! Render new values in the style of the literal they replace

/// Format `value` the way `original` was written
///
/// Keeps the decimal-place count (a bare trailing `.` stays), any `f`/`d`
/// suffix and an explicit leading `+`. Originals without a decimal point
/// render as integers, truncating the value.
pub fn format_like(original: &str, value: f64) -> String {
    let (body, suffix) = match original.chars().last() {
        Some(c @ ('f' | 'F' | 'd' | 'D')) => (&original[..original.len() - 1], Some(c)),
        _ => (original, None),
    };
    let mantissa = body.split(['e', 'E']).next().unwrap_or(body);

    let mut text = match mantissa.split_once('.') {
        Some((_, fraction)) => {
            let decimals = fraction.len();
            let mut text = format!("{:.*}", decimals, value);
            if decimals == 0 {
                text.push('.');
            }
            text
        }
        None => format!("{}", value.trunc() as i64),
    };

    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        text.remove(0);
    }
    if original.starts_with('+') && !text.starts_with('-') {
        text.insert(0, '+');
    }
    if let Some(suffix) = suffix {
        text.push(suffix);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::literal::parse_number;

    #[test]
    fn test_integer_originals_truncate() {
        assert_eq!(format_like("120", 96.4), "96");
        assert_eq!(format_like("120", 96.9), "96");
        assert_eq!(format_like("100", 63.7), "63");
        assert_eq!(format_like("-4", -2.7), "-2");
    }

    #[test]
    fn test_decimal_places_preserved() {
        assert_eq!(format_like("0.50", 0.3), "0.30");
        assert_eq!(format_like("2.0", 3.26), "3.3");
        assert_eq!(format_like(".5", 0.76), "0.8");
        assert_eq!(format_like("1.", 3.0), "3.");
    }

    #[test]
    fn test_suffix_and_sign_kept() {
        assert_eq!(format_like("0.5f", 0.3), "0.3f");
        assert_eq!(format_like("2d", 3.0), "3d");
        assert_eq!(format_like("+2", 5.0), "+5");
        assert_eq!(format_like("+2", -1.0), "-1");
    }

    #[test]
    fn test_no_negative_zero() {
        assert_eq!(format_like("0.00", -0.001), "0.00");
        assert_eq!(format_like("1", -0.2), "0");
    }

    #[test]
    fn test_formatted_value_rescans_close_to_target() {
        for (original, value) in [("0.125", 0.3333), ("64", 71.0), ("1.5f", 2.71828)] {
            let text = format_like(original, value);
            let reread = parse_number(&text).unwrap().value;
            let decimals = original
                .trim_end_matches(['f', 'd'])
                .split_once('.')
                .map_or(0, |(_, f)| f.len());
            assert!((reread - value).abs() <= 0.5 * 10f64.powi(-(decimals as i32)) + 1e-9);
        }
    }
}
