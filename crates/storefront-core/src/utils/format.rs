use chrono::{DateTime, Utc};

/// Format a price with two decimals and thousands grouping: 12990.5 -> "12 990.50"
pub fn format_price(price: f64) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }

    let sign = if price < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, fraction)
}

/// Truncate a string to a maximum number of characters, adding "..." if cut
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let head: String = s.chars().take(max_len - 3).collect();
    format!("{}...", head)
}

/// Short date for order listings
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %d, %Y").to_string()
}
