//! pt-BR display formatting for money, dates and person names.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

pub const PLACEHOLDER: &str = "-";

/// `R$ 1.234,56`; `-` when the value is absent.
pub fn format_currency(value: Option<f64>) -> String {
    match value {
        Some(amount) if amount.is_finite() => brl(amount),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Same as [`format_currency`] but renders absent values as zero, which is
/// how totals and the approval queue show them.
pub fn format_currency_or_zero(value: Option<f64>) -> String {
    brl(value.filter(|amount| amount.is_finite()).unwrap_or(0.0))
}

/// Plain decimal with a comma separator and no grouping, for spreadsheets.
pub fn format_decimal(value: Option<f64>) -> String {
    match value {
        Some(amount) if amount.is_finite() => {
            let (negative, units, cents) = split_cents(amount);
            let sign = if negative { "-" } else { "" };
            format!("{sign}{units},{cents:02}")
        }
        _ => String::new(),
    }
}

fn brl(amount: f64) -> String {
    let (negative, units, cents) = split_cents(amount);
    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {},{cents:02}", group_thousands(units))
}

fn split_cents(amount: f64) -> (bool, u64, u64) {
    let total_cents = (amount * 100.0).round();
    let negative = total_cents < 0.0;
    let total_cents = total_cents.abs() as u64;
    (negative, total_cents / 100, total_cents % 100)
}

fn group_thousands(units: u64) -> String {
    let digits = units.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// `dd/mm/yyyy` for ISO dates and timestamps; unparseable input passes through.
pub fn format_date(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return PLACEHOLDER.to_string();
    };

    parse_date(raw)
        .map(|date| date.format("%d/%m/%Y").to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    for pattern in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Re-inserts the spaces the ERP export drops between name parts
/// (`JoaoSilva` → `Joao Silva`).
pub fn fix_name_spacing(name: Option<&str>) -> String {
    let Some(name) = name.filter(|value| !value.is_empty()) else {
        return PLACEHOLDER.to_string();
    };

    camel_boundary().replace_all(name, "$1 $2").into_owned()
}

fn camel_boundary() -> &'static Regex {
    static CAMEL_BOUNDARY: OnceLock<Regex> = OnceLock::new();
    CAMEL_BOUNDARY.get_or_init(|| Regex::new(r"([a-z])([A-Z])").expect("static regex is valid"))
}

pub fn yes_no_upper(flag: bool) -> &'static str {
    if flag {
        "SIM"
    } else {
        "NÃO"
    }
}

pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Sim"
    } else {
        "Não"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_uses_brazilian_grouping() {
        assert_eq!(format_currency(Some(1234.5)), "R$ 1.234,50");
        assert_eq!(format_currency(Some(0.0)), "R$ 0,00");
        assert_eq!(format_currency(Some(1_000_000.0)), "R$ 1.000.000,00");
        assert_eq!(format_currency(Some(-12.5)), "-R$ 12,50");
        assert_eq!(format_currency(Some(999.999)), "R$ 1.000,00");
    }

    #[test]
    fn absent_currency_variants() {
        assert_eq!(format_currency(None), "-");
        assert_eq!(format_currency(Some(f64::NAN)), "-");
        assert_eq!(format_currency_or_zero(None), "R$ 0,00");
    }

    #[test]
    fn decimal_for_spreadsheets() {
        assert_eq!(format_decimal(Some(15234.7)), "15234,70");
        assert_eq!(format_decimal(None), "");
    }

    #[test]
    fn dates_render_day_first() {
        assert_eq!(format_date(Some("2025-03-09")), "09/03/2025");
        assert_eq!(format_date(Some("2025-03-09T14:22:01.123456")), "09/03/2025");
        assert_eq!(format_date(Some("2025-03-09T14:22:01-03:00")), "09/03/2025");
        assert_eq!(format_date(Some("ontem")), "ontem");
        assert_eq!(format_date(None), "-");
        assert_eq!(format_date(Some("")), "-");
    }

    #[test]
    fn name_spacing_splits_camel_case_only() {
        assert_eq!(fix_name_spacing(Some("JoaoDaSilva")), "Joao Da Silva");
        assert_eq!(fix_name_spacing(Some("MARIA SOUZA")), "MARIA SOUZA");
        assert_eq!(fix_name_spacing(Some("")), "-");
        assert_eq!(fix_name_spacing(None), "-");
    }
}
