use chrono::NaiveDate;

use crate::models::DATE_FORMAT;

/// Group digits the Indian way: last three, then pairs (12,34,567).
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    if digits.len() <= 3 {
        return digits;
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (h, t) = rest.split_at(rest.len() - 2);
        groups.push(t);
        rest = h;
    }
    groups.push(rest);
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Short form in crore / lakh for large values.
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e7 {
        format!("{:.2} Cr", value / 1e7)
    } else if abs >= 1e5 {
        format!("{:.2} L", value / 1e5)
    } else if value.is_finite() && value >= 0.0 {
        format_count(value.round() as u64)
    } else {
        format!("{:.0}", value)
    }
}

/// Percentage with an explicit sign, one decimal place.
pub fn format_signed_percent(pct: f64) -> String {
    if pct.is_finite() {
        format!("{:+.1}%", pct)
    } else {
        "-".to_string()
    }
}

/// Truncate a string to a maximum length in characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a backend date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y").to_string()
    } else if let Ok(d) = NaiveDate::parse_from_str(date.get(..10).unwrap_or(date), DATE_FORMAT) {
        d.format("%b %d, %Y").to_string()
    } else {
        date.to_string()
    }
}
