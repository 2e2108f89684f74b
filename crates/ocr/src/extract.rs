use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use hearth_core::PatternDictionary;
use regex::{Captures, Regex};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::types::OcrAnalysisResult;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_address,
    r"(?i)^\d+\s+\w+.*\b(st|street|ave|avenue|rd|road|blvd|boulevard|dr|drive|ln|lane|way|ct|court|pkwy|hwy)\b");
re!(re_phone,
    r"\(?\d{3}\)?[\s.\-]?\d{3}[\s.\-]\d{4}");
re!(re_document_words,
    r"(?i)\b(receipt|invoice|bill|statement)\b");

re!(re_total,
    r"(?i)\btotal(?:\s+due)?\b\s*:?\s*\$?\s*([\d,]+(?:\.\d{1,2})?)");
re!(re_amount,
    r"(?i)\bamount(?:\s+due)?\b\s*:?\s*\$?\s*([\d,]+(?:\.\d{1,2})?)");
re!(re_balance,
    r"(?i)\bbalance(?:\s+due)?\b\s*:?\s*\$?\s*([\d,]+(?:\.\d{1,2})?)");
re!(re_dollar,
    r"\$\s*([\d,]+\.\d{2})");

re!(re_date_slash,
    r"\b(\d{1,2})/(\d{1,2})/(\d{2,4})\b");
re!(re_date_dash,
    r"\b(\d{1,2})-(\d{1,2})-(\d{2,4})\b");
re!(re_date_month_name,
    r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2}),?\s+(\d{4})\b");
re!(re_date_iso,
    r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b");

/// Upper bound (exclusive, in dollars) for a plausible receipt amount.
const MAX_AMOUNT_DOLLARS: i64 = 100_000;

/// Turns raw OCR text into an [`OcrAnalysisResult`] using positional
/// heuristics, ordered regexes and the category dictionary.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptTextExtractor<'d> {
    dictionary: &'d PatternDictionary,
}

impl Default for ReceiptTextExtractor<'static> {
    fn default() -> Self {
        Self { dictionary: PatternDictionary::builtin() }
    }
}

impl<'d> ReceiptTextExtractor<'d> {
    pub fn new(dictionary: &'d PatternDictionary) -> Self {
        Self { dictionary }
    }

    pub fn analyze(&self, raw_text: &str) -> OcrAnalysisResult {
        let lines: Vec<&str> = raw_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let merchant_name = extract_merchant(&lines);
        let amount_cents = extract_amount(raw_text);
        let date = extract_date(raw_text);
        let category_hints = self.dictionary.category_hints(raw_text);

        let confidence = score(
            &merchant_name,
            amount_cents,
            date,
            &category_hints,
            raw_text.chars().count(),
            lines.len(),
        );

        tracing::debug!(
            merchant = ?merchant_name,
            amount_cents = ?amount_cents,
            hints = category_hints.len(),
            confidence,
            "analyzed receipt text"
        );

        OcrAnalysisResult {
            raw_text: raw_text.to_string(),
            merchant_name,
            amount_cents,
            date,
            category_hints,
            confidence,
        }
    }
}

fn score(
    merchant: &Option<String>,
    amount: Option<i64>,
    date: Option<NaiveDate>,
    hints: &BTreeSet<String>,
    text_len: usize,
    line_count: usize,
) -> f32 {
    let mut confidence = 0.1f32;
    if merchant.is_some() {
        confidence += 0.3;
    }
    if amount.is_some() {
        confidence += 0.2;
    }
    if date.is_some() {
        confidence += 0.2;
    }
    if !hints.is_empty() {
        confidence += 0.3;
    }
    if text_len > 50 {
        confidence += 0.1;
    }
    if text_len > 200 {
        confidence += 0.1;
    }
    if line_count > 3 {
        confidence += 0.1;
    }
    confidence.min(0.95)
}

// ── Merchant ──────────────────────────────────────────────────────────────────

fn extract_merchant(lines: &[&str]) -> Option<String> {
    lines
        .iter()
        .take(3)
        .filter(|l| !re_address().is_match(l))
        .filter(|l| !re_phone().is_match(l))
        .map(|l| {
            let stripped = re_document_words().replace_all(l, " ");
            stripped.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .find(|name| (4..=49).contains(&name.chars().count()))
}

// ── Amount ────────────────────────────────────────────────────────────────────

fn extract_amount(text: &str) -> Option<i64> {
    [re_total(), re_amount(), re_balance(), re_dollar()]
        .into_iter()
        .find_map(|re| {
            re.captures_iter(text)
                .filter_map(|c| parse_amount_str(c.get(1)?.as_str()))
                .next()
        })
}

/// Parses a dollar figure into cents; `None` unless 0 < value < 100,000.
fn parse_amount_str(s: &str) -> Option<i64> {
    let clean = s.replace(',', "");
    let dollars = Decimal::from_str(&clean).ok()?;
    if dollars <= Decimal::ZERO || dollars >= Decimal::from(MAX_AMOUNT_DOLLARS) {
        return None;
    }
    (dollars * Decimal::from(100)).round().to_i64()
}

// ── Date ─────────────────────────────────────────────────────────────────────

fn extract_date(text: &str) -> Option<NaiveDate> {
    let attempts: [(&Regex, fn(&Captures) -> Option<NaiveDate>); 4] = [
        (re_date_slash(), month_day_year),
        (re_date_dash(), month_day_year),
        (re_date_month_name(), month_name_day_year),
        (re_date_iso(), year_month_day),
    ];
    attempts.into_iter().find_map(|(re, parse)| {
        re.captures_iter(text)
            .filter_map(|c| parse(&c))
            .find(|d| d.year() > 2000)
    })
}

fn month_day_year(c: &Captures) -> Option<NaiveDate> {
    let month: u32 = c.get(1)?.as_str().parse().ok()?;
    let day: u32 = c.get(2)?.as_str().parse().ok()?;
    let year = expand_year(c.get(3)?.as_str().parse().ok()?);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_name_day_year(c: &Captures) -> Option<NaiveDate> {
    let month = abbr_month_to_num(c.get(1)?.as_str())?;
    let day: u32 = c.get(2)?.as_str().parse().ok()?;
    let year: i32 = c.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn year_month_day(c: &Captures) -> Option<NaiveDate> {
    let year: i32 = c.get(1)?.as_str().parse().ok()?;
    let month: u32 = c.get(2)?.as_str().parse().ok()?;
    let day: u32 = c.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn expand_year(y: i32) -> i32 {
    if y < 100 { 2000 + y } else { y }
}

fn abbr_month_to_num(name: &str) -> Option<u32> {
    match name.to_lowercase().as_str() {
        "jan" => Some(1), "feb" => Some(2), "mar" => Some(3), "apr" => Some(4),
        "may" => Some(5), "jun" => Some(6), "jul" => Some(7), "aug" => Some(8),
        "sep" => Some(9), "oct" => Some(10), "nov" => Some(11), "dec" => Some(12),
        _ => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(text: &str) -> OcrAnalysisResult {
        ReceiptTextExtractor::default().analyze(text)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── Merchant ──────────────────────────────────────────────────────────────

    #[test]
    fn merchant_skips_address_and_phone() {
        let r = analyze("123 Main Street\n(555) 123-4567\nACE HARDWARE\nTotal $12.00");
        assert_eq!(r.merchant_name.as_deref(), Some("ACE HARDWARE"));
    }

    #[test]
    fn merchant_strips_document_words() {
        let r = analyze("Invoice\nRoto-Rooter Receipt\nTotal: $250.00");
        // "Invoice" strips to nothing, second line keeps the business name.
        assert_eq!(r.merchant_name.as_deref(), Some("Roto-Rooter"));
    }

    #[test]
    fn merchant_only_from_first_three_lines() {
        let r = analyze("123 Oak Ave\n555-123-4567\nA1\nBIG MERCHANT NAME");
        assert!(r.merchant_name.is_none());
    }

    #[test]
    fn merchant_length_bounds() {
        let long = "X".repeat(50);
        let r = analyze(&format!("{long}\nABC\nGood Name"));
        assert_eq!(r.merchant_name.as_deref(), Some("Good Name"));
    }

    // ── Amount ────────────────────────────────────────────────────────────────

    #[test]
    fn amount_prefers_total_label() {
        let r = analyze("STORE\nItem $10.00\nSubtotal $45.00\nTotal: $48.60");
        assert_eq!(r.amount_cents, Some(4860));
    }

    #[test]
    fn amount_falls_back_to_amount_then_balance() {
        assert_eq!(analyze("Amount Due: 1,234.56").amount_cents, Some(123456));
        assert_eq!(analyze("Balance: $80").amount_cents, Some(8000));
    }

    #[test]
    fn amount_bare_dollar_figure() {
        assert_eq!(analyze("Electric bill from PGE $120.50").amount_cents, Some(12050));
    }

    #[test]
    fn amount_rejects_out_of_range_values() {
        assert_eq!(analyze("Total: $0.00").amount_cents, None);
        assert_eq!(analyze("Total: $150,000.00").amount_cents, None);
        // Out-of-range total falls through to the next pattern.
        assert_eq!(analyze("Total: $0.00\nBalance: $5.00").amount_cents, Some(500));
    }

    #[test]
    fn no_total_pattern_keeps_amount_unset_and_confidence_low() {
        let r = analyze("Thank you\nCome again");
        assert_eq!(r.amount_cents, None);
        assert!(r.confidence < 0.5, "confidence was {}", r.confidence);
    }

    // ── Date ─────────────────────────────────────────────────────────────────

    #[test]
    fn date_slash_us_order() {
        assert_eq!(analyze("01/15/2024").date, Some(date(2024, 1, 15)));
        assert_eq!(analyze("3/7/24").date, Some(date(2024, 3, 7)));
    }

    #[test]
    fn date_dash_us_order() {
        assert_eq!(analyze("Date 02-29-2024").date, Some(date(2024, 2, 29)));
    }

    #[test]
    fn date_month_name() {
        assert_eq!(analyze("March 15, 2024").date, Some(date(2024, 3, 15)));
        assert_eq!(analyze("Sept. 3 2023").date, Some(date(2023, 9, 3)));
    }

    #[test]
    fn date_iso() {
        assert_eq!(analyze("2024-03-15").date, Some(date(2024, 3, 15)));
    }

    #[test]
    fn date_requires_year_after_2000() {
        assert_eq!(analyze("Since 01/01/1999").date, None);
    }

    #[test]
    fn date_skips_unparseable_candidates() {
        assert_eq!(analyze("13/45/2024 then 04/02/2024").date, Some(date(2024, 4, 2)));
    }

    // ── Hints and confidence ─────────────────────────────────────────────────

    #[test]
    fn category_hints_from_merchant_and_patterns() {
        let r = analyze("HOME DEPOT\nLumber and paint\nTotal $87.12");
        assert!(r.category_hints.contains("supplies"));
        assert_eq!(r.category_hints.len(), 1);
    }

    #[test]
    fn complete_receipt_scores_high() {
        let r = analyze(
            "PG&E\n77 Beale St\nElectric service statement\nDate: 04/01/2024\nAmount Due: $120.50",
        );
        assert_eq!(r.merchant_name.as_deref(), Some("PG&E"));
        assert_eq!(r.amount_cents, Some(12050));
        assert_eq!(r.date, Some(date(2024, 4, 1)));
        assert!(r.category_hints.contains("utilities"));
        assert!((r.confidence - 0.95).abs() < 1e-6, "confidence was {}", r.confidence);
    }

    #[test]
    fn empty_text_minimum_confidence() {
        let r = analyze("");
        assert!(r.is_empty());
        assert!((r.confidence - 0.1).abs() < 1e-6);
    }

    #[test]
    fn no_panic_on_garbage_input() {
        let _ = analyze("!@#$%^&*()\n\0\x01\x02");
    }
}
