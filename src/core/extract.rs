//! Picks the most plausible price out of noisy OCR text.
//!
//! Tokens are cleaned, their decimal separator is guessed from the rightmost
//! `.`/`,`, and the survivors are scored. Numbers next to a currency glyph,
//! numbers with a two-digit cents part and numbers with a longer integer
//! part score higher.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Currency glyphs kept by the cleaner and used for proximity scoring.
pub const CURRENCY_GLYPHS: [char; 9] = ['$', '€', '£', '¥', '₱', '₩', '₺', '₹', 'R'];

/// Characters the OCR engine is allowed to emit.
pub const OCR_WHITELIST: &str = "0123456789.,$€£¥₱₩₺₹R";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Bonus when a currency glyph is in or next to the token.
    pub symbol_adjacent: f64,
    /// Bonus for a two-digit fractional part.
    pub cents: f64,
    /// Bonus per integer digit, up to `digit_cap` digits.
    pub per_digit: f64,
    pub digit_cap: usize,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            symbol_adjacent: 2.0,
            cents: 1.0,
            per_digit: 0.1,
            digit_cap: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PriceCandidate {
    value: f64,
    score: f64,
}

fn is_glyph(ch: char) -> bool {
    CURRENCY_GLYPHS.contains(&ch)
}

fn has_glyph(token: &str) -> bool {
    token.chars().any(is_glyph)
}

fn clean(text: &str) -> String {
    text.chars()
        .map(|ch| {
            if ch.is_ascii_digit()
                || ch == '.'
                || ch == ','
                || ch == '-'
                || ch.is_whitespace()
                || is_glyph(ch)
            {
                ch
            } else {
                ' '
            }
        })
        .collect()
}

/// Rewrites a token so `.` is the only separator, and it is decimal.
///
/// `1.234,56` becomes `1234.56`; `1,234.56` becomes `1234.56`.
fn normalize_separators(token: &str) -> String {
    match (token.rfind(','), token.rfind('.')) {
        (Some(comma), dot) if dot.is_none_or(|d| comma > d) => {
            token.replace('.', "").replacen(',', ".", 1)
        }
        _ => token.replace(',', ""),
    }
}

/// Parses the longest leading `[+-]?digits[.digits]` prefix.
fn parse_leading_float(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    s[..end].trim_end_matches('.').parse().ok()
}

/// `<digit>.<digit><digit>` at the end of the string.
fn has_cents(norm: &str) -> bool {
    let b = norm.as_bytes();
    b.len() >= 4
        && b[b.len() - 3] == b'.'
        && b[b.len() - 4].is_ascii_digit()
        && b[b.len() - 2].is_ascii_digit()
        && b[b.len() - 1].is_ascii_digit()
}

fn integer_digits(n: f64) -> usize {
    let int = n.floor();
    if int < 1.0 {
        1
    } else {
        // Large values only need to exceed the cap.
        (int.log10().floor() as usize) + 1
    }
}

fn score_token(tokens: &[&str], i: usize, weights: &ScoringWeights) -> Option<PriceCandidate> {
    let token = tokens[i];
    let bare = token.trim_matches(is_glyph);
    let norm = normalize_separators(bare);

    let value = parse_leading_float(&norm)?;
    if !value.is_finite() || value <= 0.0 {
        return None;
    }

    let prev = i.checked_sub(1).map(|p| tokens[p]).unwrap_or("");
    let next = tokens.get(i + 1).copied().unwrap_or("");
    let symbol_nearby = has_glyph(prev) || has_glyph(next) || bare.len() != token.len();

    let mut score = integer_digits(value).min(weights.digit_cap) as f64 * weights.per_digit;
    if symbol_nearby {
        score += weights.symbol_adjacent;
    }
    if has_cents(&norm) {
        score += weights.cents;
    }
    Some(PriceCandidate { value, score })
}

/// Returns the best price guess in `text`, or `None` if nothing looks like
/// a positive number.
pub fn extract_price(text: &str, weights: &ScoringWeights) -> Option<f64> {
    let cleaned = clean(text);
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();

    let mut best: Option<PriceCandidate> = None;
    for i in 0..tokens.len() {
        let Some(candidate) = score_token(&tokens, i, weights) else {
            continue;
        };
        debug!(
            token = tokens[i],
            value = candidate.value,
            score = candidate.score,
            "Price candidate"
        );
        if best.is_none_or(|b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    best.map(|c| c.value)
}
