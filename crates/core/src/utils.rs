//! Formatting and parsing helpers shared by the dashboard views.

use chrono::{NaiveDate, Utc};

use crate::errors::CoreError;

/// Display style for [`format_date`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateStyle {
    /// `2025-01-15`
    #[default]
    Short,
    /// `Wednesday, January 15, 2025`
    Long,
}

/// Format a value as currency with two decimals and comma thousands separators.
///
/// Negative values keep the sign in front of the symbol: `-$1,234.50`.
pub fn format_currency(value: f64, symbol: &str) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}{symbol}{}", group_thousands(&format!("{:.2}", value.abs())))
}

/// Format a value as a percentage with two decimals.
/// `include_sign` prefixes positive values with `+`.
pub fn format_percentage(value: f64, include_sign: bool) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let sign = if include_sign && value > 0.0 { "+" } else { "" };
    format!("{sign}{value:.2}%")
}

/// Format a number with a fixed number of decimals and comma thousands separators.
pub fn format_number(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let sign = if value < 0.0 { "-" } else { "" };
    format!(
        "{sign}{}",
        group_thousands(&format!("{:.*}", decimals, value.abs()))
    )
}

pub fn format_date(date: NaiveDate, style: DateStyle) -> String {
    match style {
        DateStyle::Short => date.format("%Y-%m-%d").to_string(),
        DateStyle::Long => date.format("%A, %B %-d, %Y").to_string(),
    }
}

/// Human-readable holding period between two dates.
///
/// Under 30 days → days, under a year → whole 30-day months,
/// otherwise years plus leftover months.
pub fn holding_period(start: NaiveDate, end: NaiveDate) -> String {
    let days = (end - start).num_days().abs();

    if days < 30 {
        return plural(days, "day");
    }
    if days < 365 {
        return plural(days / 30, "month");
    }

    let years = days / 365;
    let months = (days % 365) / 30;
    if months == 0 {
        plural(years, "year")
    } else {
        format!("{} {}", plural(years, "year"), plural(months, "month"))
    }
}

/// Position of `current` within `[low, high]` as a 0–100 value.
/// A degenerate range (low == high) sits in the middle.
pub fn range_position(current: f64, low: f64, high: f64) -> f64 {
    if low == high {
        return 50.0;
    }
    ((current - low) / (high - low) * 100.0).clamp(0.0, 100.0)
}

/// Parse a form field into a finite number.
pub fn parse_number(field: &str, input: &str) -> Result<f64, CoreError> {
    let trimmed = input.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            CoreError::ValidationError(format!("{field} must be a number, got '{trimmed}'"))
        })
}

/// Today's date (UTC) as `YYYY-MM-DD`.
pub fn today_iso() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("{n} {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

/// Insert commas into the integer part of an already formatted, unsigned number.
fn group_thousands(formatted: &str) -> String {
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}
