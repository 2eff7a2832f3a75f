// Utility helpers for parsing and basic statistics.
//
// CSV cells arrive as loosely formatted strings; everything here turns them
// into typed values or NaN so the analysis code can stay arithmetic only.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const SECONDS_PER_DAY: i64 = 86_400;

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports.
///
/// - Trims whitespace.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok()
}

/// Numeric cell or NaN, matching how missing values flow through the
/// aggregates and the correlation matrix.
pub fn parse_f64_or_nan(s: Option<&str>) -> f64 {
    parse_f64_safe(s).unwrap_or(f64::NAN)
}

/// Parse a date or date-time cell. Plain dates map to midnight.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // Zoned timestamps are normalized to UTC.
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Whole days between two timestamps, floored. A payment one hour before
/// the issue time counts as -1 day.
pub fn days_between(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    (end - start).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Arithmetic mean of the non-NaN values; NaN when none remain.
pub fn nan_mean(v: &[f64]) -> f64 {
    let (sum, count) = v
        .iter()
        .filter(|x| !x.is_nan())
        .fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
    if count == 0 {
        return f64::NAN;
    }
    sum / count as f64
}

/// Sum of the non-NaN values; 0 for an empty or all-NaN slice.
pub fn nan_sum(v: &[f64]) -> f64 {
    v.iter().filter(|x| !x.is_nan()).sum()
}

/// Pearson correlation coefficient over the pairs where both values are
/// finite. Fewer than two such pairs, or no spread in either side, yields NaN.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .collect();
    let n = pairs.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denom = (var_x * var_y).sqrt();
    if !denom.is_finite() || denom == 0.0 {
        return f64::NAN;
    }
    (cov / denom).clamp(-1.0, 1.0)
}

/// At least two finite values that are not all equal, i.e. the series
/// correlates with itself. Missing values are ignored.
pub fn has_spread(v: &[f64]) -> bool {
    let mut finite = v.iter().filter(|x| x.is_finite());
    match finite.next() {
        Some(first) => finite.any(|x| x != first),
        None => false,
    }
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators
    // (e.g. `1,234,567.89`). Non-finite values print as "n/a".
    if !n.is_finite() {
        return "n/a".to_string();
    }
    let s = format!("{:.*}", decimals, n.abs());
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (s.as_str(), None),
    };
    // Sign follows the rounded digits so -0.001 prints as 0.00.
    let neg = n < 0.0 && s.bytes().any(|b| matches!(b, b'1'..=b'9'));
    let mut res = group_digits(int_part);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

fn group_digits(digits: &str) -> String {
    let separator = Locale::en.separator();
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push_str(separator);
        }
        out.push(ch);
    }
    out
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn parses_supported_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        for s in ["2024-03-07", "2024/03/07", "03/07/2024", "07.03.2024"] {
            assert_eq!(parse_datetime(s), Some(expected), "{s}");
        }
        assert_eq!(
            parse_datetime("2024-03-07 14:30:00").map(|d| d.date()),
            Some(expected.date())
        );
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime("  "), None);
    }

    #[test]
    fn zoned_timestamps_normalize_to_utc() {
        assert_eq!(
            parse_datetime("2024-01-05T10:30:00Z"),
            Some(dt("2024-01-05 10:30:00"))
        );
        assert_eq!(
            parse_datetime("2024-01-05T10:30:00+02:00"),
            Some(dt("2024-01-05 08:30:00"))
        );
    }

    #[test]
    fn pairwise_complete_correlation() {
        let xs = [1.0, f64::NAN, 3.0, 4.0];
        let ys = [2.0, 100.0, 6.1, 8.0];
        let r = pearson(&xs, &ys);
        assert!(r > 0.99 && r <= 1.0, "{r}");
        assert!(has_spread(&xs));
        assert!(!has_spread(&[f64::NAN, 2.0, 2.0]));
        assert!(!has_spread(&[f64::NAN, 2.0]));
    }

    #[test]
    fn day_difference_keeps_sign() {
        assert_eq!(days_between(dt("2024-01-01"), dt("2024-01-31")), 30);
        assert_eq!(days_between(dt("2024-01-31"), dt("2024-01-01")), -30);
        assert_eq!(
            days_between(dt("2024-01-02 00:00:00"), dt("2024-01-01 23:00:00")),
            -1
        );
    }

    #[test]
    fn nan_aware_aggregates() {
        let v = [1.0, f64::NAN, 3.0];
        assert_eq!(nan_mean(&v), 2.0);
        assert_eq!(nan_sum(&v), 4.0);
        assert!(nan_mean(&[f64::NAN]).is_nan());
        assert_eq!(nan_sum(&[]), 0.0);
    }

    #[test]
    fn pearson_edge_cases() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((r - 1.0).abs() < 1e-12);
        let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]);
        assert!((r + 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_nan());
        assert!(pearson(&[1.0, f64::NAN, 1.0], &[1.0, 2.0, 5.0]).is_nan());
        assert!(pearson(&[f64::NAN, 1.0], &[1.0, 2.0]).is_nan());
        assert!(pearson(&[1.0], &[1.0]).is_nan());
    }

    #[test]
    fn numbers_get_separators() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.5, 1), "-0.5");
        assert_eq!(format_number(f64::NAN, 2), "n/a");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_number(-0.004, 0), "0");
        assert_eq!(format_number(-1234.5, 1), "-1,234.5");
        assert_eq!(format_number(999.999, 2), "1,000.00");
        assert_eq!(format_number(1e20, 0), "100,000,000,000,000,000,000");
        assert_eq!(format_int(9855usize), "9,855");
        assert_eq!(parse_f64_safe(Some(" 1,250.5 ")), Some(1250.5));
        assert!(parse_f64_or_nan(Some("abc")).is_nan());
    }
}
