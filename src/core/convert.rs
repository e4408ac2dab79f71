//! Conversion between fiat amounts and BTC / sats, plus display formatting.

use super::rates::RateTable;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Sats in one BTC.
pub const SATS_PER_BTC: f64 = 1e8;

/// Placeholder shown when a value cannot be computed.
pub const UNKNOWN: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayUnit {
    #[default]
    Btc,
    Sats,
}

impl Display for DisplayUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DisplayUnit::Btc => "BTC",
                DisplayUnit::Sats => "sats",
            }
        )
    }
}

impl FromStr for DisplayUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "btc" => Ok(DisplayUnit::Btc),
            "sats" | "sat" => Ok(DisplayUnit::Sats),
            _ => Err(anyhow::anyhow!("Invalid display unit: {}", s)),
        }
    }
}

/// Looks up the price of one BTC in `code`.
pub fn price_for_currency(table: &RateTable, code: &str) -> Option<f64> {
    table.get(code).filter(|n| n.is_finite() && *n > 0.0)
}

/// Converts a fiat `amount` into `unit` at `price_per_btc`.
pub fn convert(amount: f64, price_per_btc: f64, unit: DisplayUnit) -> f64 {
    let btc = amount / price_per_btc;
    match unit {
        DisplayUnit::Btc => btc,
        DisplayUnit::Sats => btc * SATS_PER_BTC,
    }
}

fn currency_symbol(code: &str) -> Option<&'static str> {
    Some(match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "INR" => "₹",
        "KRW" => "₩",
        "TRY" => "₺",
        "ILS" => "₪",
        "PHP" => "₱",
        "BRL" => "R$",
        "AUD" => "A$",
        "CAD" => "CA$",
        "HKD" => "HK$",
        "MXN" => "MX$",
        "NZD" => "NZ$",
        _ => return None,
    })
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Formats `n` with grouped thousands and between `min_frac` and `max_frac`
/// fraction digits. Trailing zeros beyond `min_frac` are trimmed.
pub fn format_number(n: f64, min_frac: usize, max_frac: usize) -> String {
    if !n.is_finite() {
        return UNKNOWN.to_string();
    }
    let fixed = format!("{:.*}", max_frac, n.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((&fixed, ""));

    let mut frac = frac_part.to_string();
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }

    let sign = if n < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    if frac.is_empty() {
        format!("{sign}{}", group_thousands(int_part))
    } else {
        format!("{sign}{}.{frac}", group_thousands(int_part))
    }
}

/// Fiat amounts: two fraction digits, with a symbol when one is known.
pub fn format_fiat(n: f64, code: &str) -> String {
    let number = format_number(n, 2, 2);
    match currency_symbol(code) {
        Some(symbol) => match number.strip_prefix('-') {
            Some(abs) => format!("-{symbol}{abs}"),
            None => format!("{symbol}{number}"),
        },
        None => format!("{number} {code}"),
    }
}

/// BTC amounts: up to eight fraction digits.
pub fn format_btc(n: f64) -> String {
    format_number(n, 0, 8)
}

/// Sats are whole counts.
pub fn format_sats(n: f64) -> String {
    format_number(n, 0, 0)
}

pub fn format_unit(n: f64, unit: DisplayUnit) -> String {
    match unit {
        DisplayUnit::Btc => format!("{} BTC", format_btc(n)),
        DisplayUnit::Sats => format!("{} sats", format_sats(n)),
    }
}

/// Display strings for one amount in one currency.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub one_btc: String,
    pub fiat: String,
    pub converted: String,
    pub using_rate: String,
}

/// Builds the display strings for `amount` of `code`.
///
/// A non-finite amount shows as zero fiat; the converted value and rate line
/// are suppressed whenever the amount is non-finite or no price is known.
pub fn describe(amount: f64, code: &str, price: Option<f64>, unit: DisplayUnit) -> Conversion {
    let fiat = format_fiat(if amount.is_finite() { amount } else { 0.0 }, code);
    let one_btc = price.map_or_else(|| UNKNOWN.to_string(), |p| format_fiat(p, code));

    match price.filter(|_| amount.is_finite()) {
        Some(p) => Conversion {
            one_btc,
            fiat,
            converted: format_unit(convert(amount, p, unit), unit),
            using_rate: format!(
                "Using rate: 1 BTC ≈ {} ({} ≈ {} BTC)",
                format_fiat(p, code),
                format_fiat(1.0, code),
                format_btc(1.0 / p)
            ),
        },
        None => Conversion {
            one_btc,
            fiat,
            converted: UNKNOWN.to_string(),
            using_rate: String::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sats_is_btc_times_hundred_million() {
        for (amount, price) in [(100.0, 68000.0), (0.0, 1.0), (12.34, 0.5), (-5.0, 42.0)] {
            let btc = convert(amount, price, DisplayUnit::Btc);
            let sats = convert(amount, price, DisplayUnit::Sats);
            assert!((sats - btc * 1e8).abs() <= 1e-6 * sats.abs().max(1.0));
        }
    }

    #[test]
    fn test_price_for_currency() {
        let table = RateTable::from_pairs([("USD", 68000.0), ("EUR", 0.0), ("GBP", f64::NAN)]);
        assert_eq!(price_for_currency(&table, "USD"), Some(68000.0));
        assert!(price_for_currency(&table, "EUR").is_none());
        assert!(price_for_currency(&table, "GBP").is_none());
        assert!(price_for_currency(&table, "CHF").is_none());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(1234567.891, 2, 2), "1,234,567.89");
        assert_eq!(format_number(0.5, 0, 8), "0.5");
        assert_eq!(format_number(0.00147059, 0, 8), "0.00147059");
        assert_eq!(format_number(100.0, 0, 8), "100");
        assert_eq!(format_number(999.0, 0, 0), "999");
        assert_eq!(format_number(-1000.0, 2, 2), "-1,000.00");
        assert_eq!(format_number(f64::NAN, 0, 0), UNKNOWN);
    }

    #[test]
    fn test_format_fiat() {
        assert_eq!(format_fiat(68000.0, "USD"), "$68,000.00");
        assert_eq!(format_fiat(1.0, "EUR"), "€1.00");
        assert_eq!(format_fiat(12.5, "SEK"), "12.50 SEK");
    }

    #[test]
    fn test_describe_with_price() {
        let c = describe(68.0, "USD", Some(68000.0), DisplayUnit::Sats);
        assert_eq!(c.fiat, "$68.00");
        assert_eq!(c.one_btc, "$68,000.00");
        assert_eq!(c.converted, "100,000 sats");
        assert_eq!(
            c.using_rate,
            "Using rate: 1 BTC ≈ $68,000.00 ($1.00 ≈ 0.00001471 BTC)"
        );
    }

    #[test]
    fn test_describe_suppresses_unknowns() {
        let c = describe(f64::NAN, "USD", Some(68000.0), DisplayUnit::Btc);
        assert_eq!(c.fiat, "$0.00");
        assert_eq!(c.converted, UNKNOWN);
        assert!(c.using_rate.is_empty());

        let c = describe(10.0, "XYZ", None, DisplayUnit::Btc);
        assert_eq!(c.one_btc, UNKNOWN);
        assert_eq!(c.converted, UNKNOWN);
    }

    #[test]
    fn test_display_unit_parse() {
        assert_eq!("BTC".parse::<DisplayUnit>().unwrap(), DisplayUnit::Btc);
        assert_eq!("sats".parse::<DisplayUnit>().unwrap(), DisplayUnit::Sats);
        assert!("bits".parse::<DisplayUnit>().is_err());
    }
}
