//! Receipt field normalization: currency amounts and Japanese dates.
//!
//! Normalization never fails. Amounts degrade to whatever digits the text
//! contains (possibly none); dates that match none of the supported grammars
//! are returned unchanged. The supported date forms, tried in order:
//!
//! 1. full era name: `令和7年1月2日`
//! 2. single-letter era code: `R7.1.2` (also `-` and `/` separators)
//! 3. Gregorian year with kanji markers: `2025年1月2日`
//! 4. Gregorian year with separators: `2025/01/02`, `2025-01-02`
//!
//! Full-width digits are folded to ASCII and whitespace stripped before
//! matching. A matched triple that is not a valid calendar date (month 13,
//! February 30) is treated as a failed parse.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Era epoch offsets: gregorian_year = offset + era_year - 1, so year 1 of
/// each era maps to the listed value.
const REIWA_OFFSET: i32 = 2019;
const HEISEI_OFFSET: i32 = 1989;
const SHOWA_OFFSET: i32 = 1926;

static ERA_NAME_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(令和|平成|昭和)(\d{1,2})年(\d{1,2})月(\d{1,2})日?").expect("era name pattern")
});

static ERA_LETTER_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([RHSrhs])(\d{1,2})[.\-/](\d{1,2})[.\-/](\d{1,2})").expect("era letter pattern")
});

static GREGORIAN_KANJI_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})年(\d{1,2})月(\d{1,2})日?").expect("kanji date pattern"));

static GREGORIAN_SEP_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})[/\-](\d{1,2})[/\-](\d{1,2})").expect("separator date pattern"));

/// How a field label is interpreted during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A currency amount; reduced to its digits.
    Amount,
    /// A date; converted to `YYYY-MM-DD` when parseable.
    Date,
    /// Free text; passed through untouched.
    Text,
}

/// Classifies a template label into a field kind.
///
/// Labels containing 金額 are amounts; labels containing 日付 or 日 are
/// dates; everything else is free text.
pub fn classify_label(label: &str) -> FieldKind {
    if label.contains("金額") {
        FieldKind::Amount
    } else if label.contains("日付") || label.contains("日") {
        FieldKind::Date
    } else {
        FieldKind::Text
    }
}

/// Normalizes a reconstructed field according to its label.
pub fn normalize_field(label: &str, raw: &str) -> String {
    match classify_label(label) {
        FieldKind::Amount => normalize_amount(raw),
        FieldKind::Date => normalize_date(raw),
        FieldKind::Text => raw.to_string(),
    }
}

/// Reduces an amount field to its decimal digits.
///
/// Full-width digits are folded to ASCII first; currency marks, separators
/// and trailing text are discarded. Input with no digits yields the empty
/// string.
pub fn normalize_amount(text: &str) -> String {
    text.chars()
        .map(fold_fullwidth_digit)
        .filter(|c| c.is_ascii_digit())
        .collect()
}

/// Converts a date field to canonical `YYYY-MM-DD`.
///
/// Returns the input unchanged when no supported grammar matches or the
/// matched triple is not a valid calendar date.
pub fn normalize_date(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let cleaned: String = text
        .chars()
        .map(fold_fullwidth_digit)
        .filter(|c| !c.is_whitespace())
        .collect();

    match parse_date(&cleaned) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => text.to_string(),
    }
}

/// Tries the supported date grammars in priority order.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let (year, month, day) = if let Some(c) = ERA_NAME_DATE.captures(text) {
        let offset = era_offset(&c[1])?;
        (
            offset + c[2].parse::<i32>().ok()? - 1,
            c[3].parse::<u32>().ok()?,
            c[4].parse::<u32>().ok()?,
        )
    } else if let Some(c) = ERA_LETTER_DATE.captures(text) {
        let offset = era_offset(&c[1])?;
        (
            offset + c[2].parse::<i32>().ok()? - 1,
            c[3].parse::<u32>().ok()?,
            c[4].parse::<u32>().ok()?,
        )
    } else if let Some(c) = GREGORIAN_KANJI_DATE.captures(text) {
        (
            c[1].parse::<i32>().ok()?,
            c[2].parse::<u32>().ok()?,
            c[3].parse::<u32>().ok()?,
        )
    } else if let Some(c) = GREGORIAN_SEP_DATE.captures(text) {
        (
            c[1].parse::<i32>().ok()?,
            c[2].parse::<u32>().ok()?,
            c[3].parse::<u32>().ok()?,
        )
    } else {
        return None;
    };

    NaiveDate::from_ymd_opt(year, month, day)
}

fn era_offset(era: &str) -> Option<i32> {
    match era {
        "令和" | "R" | "r" => Some(REIWA_OFFSET),
        "平成" | "H" | "h" => Some(HEISEI_OFFSET),
        "昭和" | "S" | "s" => Some(SHOWA_OFFSET),
        _ => None,
    }
}

fn fold_fullwidth_digit(c: char) -> char {
    match c {
        '０'..='９' => {
            // Safe: the offset keeps the value within ASCII digits.
            char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c)
        }
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_keeps_digits_only() {
        assert_eq!(normalize_amount("¥12,340円"), "12340");
        assert_eq!(normalize_amount(""), "");
        assert_eq!(normalize_amount("合計"), "");
    }

    #[test]
    fn amount_folds_fullwidth_digits() {
        assert_eq!(normalize_amount("１２，３４０円"), "12340");
    }

    #[test]
    fn era_name_date_converts() {
        assert_eq!(normalize_date("令和7年1月2日"), "2025-01-02");
        assert_eq!(normalize_date("平成31年4月30日"), "2019-04-30");
        assert_eq!(normalize_date("昭和64年1月7日"), "1989-01-07");
    }

    #[test]
    fn era_letter_date_converts() {
        assert_eq!(normalize_date("R7.1.2"), "2025-01-02");
        assert_eq!(normalize_date("h30-12-31"), "2018-12-31");
        assert_eq!(normalize_date("S50/3/4"), "1975-03-04");
    }

    #[test]
    fn gregorian_dates_convert() {
        assert_eq!(normalize_date("2025年1月2日"), "2025-01-02");
        assert_eq!(normalize_date("2025/01/02"), "2025-01-02");
        assert_eq!(normalize_date("2025-1-2"), "2025-01-02");
    }

    #[test]
    fn fullwidth_digits_and_whitespace_are_normalized() {
        assert_eq!(normalize_date("令和７年 １月 ２日"), "2025-01-02");
    }

    #[test]
    fn unparseable_date_is_returned_unchanged() {
        assert_eq!(normalize_date("abc"), "abc");
        assert_eq!(normalize_date(""), "");
    }

    #[test]
    fn invalid_calendar_date_is_returned_unchanged() {
        assert_eq!(normalize_date("令和7年13月1日"), "令和7年13月1日");
        assert_eq!(normalize_date("2025/02/30"), "2025/02/30");
    }

    #[test]
    fn era_name_has_priority_over_gregorian() {
        // The era form matches first even when a Gregorian-looking year is
        // also present.
        assert_eq!(normalize_date("令和7年1月2日(2025)"), "2025-01-02");
    }

    #[test]
    fn labels_classify_by_keyword() {
        assert_eq!(classify_label("金額"), FieldKind::Amount);
        assert_eq!(classify_label("支払金額"), FieldKind::Amount);
        assert_eq!(classify_label("日付"), FieldKind::Date);
        assert_eq!(classify_label("受診日"), FieldKind::Date);
        assert_eq!(classify_label("医療機関"), FieldKind::Text);
    }

    #[test]
    fn normalize_field_dispatches_on_label() {
        assert_eq!(normalize_field("金額", "¥1,234円"), "1234");
        assert_eq!(normalize_field("日付", "R7.1.2"), "2025-01-02");
        assert_eq!(normalize_field("備考", "そのまま"), "そのまま");
    }
}
