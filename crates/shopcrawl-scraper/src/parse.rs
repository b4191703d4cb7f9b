//! Best-effort numeric parsing of display strings: prices, ratings, review
//! counts.
//!
//! Listing pages print numbers for humans, in whatever locale the shop uses.
//! Every parser here returns `None` rather than guessing when the input has
//! no usable number.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

/// First numeric run, allowing group/decimal separators used across locales
/// (`,` `.` `'` and non-breaking spaces) between digits.
static NUMBER_RUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d[\d.,'\x{a0}\x{202f}]*").expect("valid number-run regex")
});
static SCALED_RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(?:/|out\s+of|of|von|sur|su)\s*(\d+(?:[.,]\d+)?)")
        .expect("valid scaled-rating regex")
});
static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:[.,]\d+)?)\s*%").expect("valid percent regex"));
static DECIMAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("valid decimal regex"));

/// Scale ratings are normalized to.
const RATING_SCALE: f64 = 5.0;

/// Parses a display price into a decimal amount.
///
/// Handles both `1.234,56` and `1,234.56` conventions:
/// - both separators present: the rightmost one is the decimal point;
/// - one separator occurring more than once: grouping only;
/// - one separator occurring once: grouping when exactly three digits follow
///   and the integer part is non-zero, decimal otherwise.
///
/// Currency symbols and words are ignored. For ranges (`"$10 – $20"`) the
/// first amount wins.
#[must_use]
pub fn parse_price(display: &str) -> Option<Decimal> {
    let run = NUMBER_RUN_RE.find(display)?.as_str();
    let cleaned: String = run
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{a0}' | '\u{202f}'))
        .collect();
    let cleaned = cleaned.trim_end_matches(['.', ',']);

    let canonical = canonicalize_separators(cleaned)?;
    canonical.parse::<Decimal>().ok()
}

/// Rewrites a digit/separator run into `digits[.digits]` form.
fn canonicalize_separators(run: &str) -> Option<String> {
    let last_comma = run.rfind(',');
    let last_dot = run.rfind('.');

    let decimal_sep = match (last_comma, last_dot) {
        (None, None) => return Some(run.to_owned()),
        (Some(c), Some(d)) => Some(if c > d { ',' } else { '.' }),
        (Some(_), None) => single_separator_role(run, ','),
        (None, Some(_)) => single_separator_role(run, '.'),
    };

    let mut out = String::with_capacity(run.len());
    match decimal_sep {
        Some(sep) => {
            let pos = run.rfind(sep)?;
            let (int_part, frac_part) = (&run[..pos], &run[pos + 1..]);
            out.extend(int_part.chars().filter(char::is_ascii_digit));
            out.push('.');
            out.extend(frac_part.chars().filter(char::is_ascii_digit));
        }
        None => out.extend(run.chars().filter(char::is_ascii_digit)),
    }
    (!out.is_empty() && out != ".").then_some(out)
}

/// Decides whether a run's only separator kind is a decimal point
/// (`Some(sep)`) or a thousands separator (`None`).
fn single_separator_role(run: &str, sep: char) -> Option<char> {
    if run.matches(sep).count() > 1 {
        return None;
    }
    let (int_part, frac_part) = run.split_once(sep)?;
    let looks_grouped = frac_part.len() == 3 && !int_part.trim_start_matches('0').is_empty();
    if looks_grouped {
        None
    } else {
        Some(sep)
    }
}

/// Parses a star rating onto a 0–5 scale.
///
/// Accepts `"4.5"`, `"4,5 von 5"`, `"Rated 4.50 out of 5"`, `"9/10"` (scaled),
/// and percentages such as `"90%"` from width-styled star bars.
#[must_use]
pub fn parse_rating(display: &str) -> Option<f64> {
    let to_f64 = |s: &str| s.replace(',', ".").parse::<f64>().ok();

    let value = if let Some(caps) = SCALED_RATING_RE.captures(display) {
        let value = to_f64(&caps[1])?;
        let scale = to_f64(&caps[2])?;
        if scale <= 0.0 {
            return None;
        }
        if (scale - RATING_SCALE).abs() < f64::EPSILON {
            value
        } else {
            value / scale * RATING_SCALE
        }
    } else if let Some(caps) = PERCENT_RE.captures(display) {
        to_f64(&caps[1])? / 100.0 * RATING_SCALE
    } else {
        to_f64(DECIMAL_RE.find(display)?.as_str())?
    };

    (value.is_finite() && (0.0..=RATING_SCALE).contains(&value)).then_some(value)
}

/// Parses a review count, ignoring grouping separators: `"(1,234 reviews)"`
/// → 1234.
#[must_use]
pub fn parse_review_count(display: &str) -> Option<i32> {
    let run = NUMBER_RUN_RE.find(display)?.as_str();
    let digits: String = run.chars().filter(char::is_ascii_digit).collect();
    digits.parse::<i32>().ok()
}

#[cfg(test)]
#[path = "parse_test.rs"]
mod tests;
