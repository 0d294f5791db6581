// src/extractors/amount.rs

//! Dollar amounts, ratio detection and series labels inside document text.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::ops::Range;
use std::str::FromStr;

/// Digits with thousands separators between them and at most one decimal point.
pub(crate) const NUMERAL: &str = r"\d(?:[\d,]*\d)?(?:\.\d+)?";

/// `Series 2024B`, `SERIES 2015A-1`, `Series A`. The designator is case sensitive
/// so that "series of bonds" never becomes a label.
pub(crate) const SERIES_LABEL: &str =
    r"(?-u:\b)(?i:series)\s+(?-i:(\d{4}[A-Z]{0,2}(?:-\d+)?|[A-Z](?:-?\d+)?))(?-u:\b)";

// How far before a span we look for the series label of its first amount.
const SERIES_LOOKBACK: usize = 120;
// Window checked around an amount for "per" ratio language.
const RATIO_WINDOW: usize = 24;

static DOLLAR_AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\$({NUMERAL})")).expect("Failed to compile DOLLAR_AMOUNT_RE")
});

static SERIES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(SERIES_LABEL).expect("Failed to compile SERIES_RE")
});

// "$1.00 per $1,000", "$5 for each Bond", "$2.50/$1,000"
static RATIO_AFTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:/|(?:per|for\s+(?:each|every))(?-u:\b))")
        .expect("Failed to compile RATIO_AFTER_RE")
});

static RATIO_BEFORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:(?-u:\b)per|/)\s*$").expect("Failed to compile RATIO_BEFORE_RE")
});

/// A `$<numeral>` occurrence. `start` is the byte offset of the `$`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DollarAmount {
    pub value: Decimal,
    pub start: usize,
    pub end: usize,
}

/// Converts a numeral token to a decimal, dropping thousands separators.
pub fn parse_numeral(token: &str) -> Option<Decimal> {
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned).ok()
}

/// All dollar amounts inside `range`, in text order. Offsets are absolute.
pub fn dollar_amounts(text: &str, range: Range<usize>) -> Vec<DollarAmount> {
    let offset = range.start;
    DOLLAR_AMOUNT_RE
        .captures_iter(&text[range])
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let value = parse_numeral(caps.get(1)?.as_str())?;
            Some(DollarAmount {
                value,
                start: offset + whole.start(),
                end: offset + whole.end(),
            })
        })
        .collect()
}

/// True when the amount is one side of a ratio ("$1.00 per $1,000").
pub fn is_ratio(text: &str, amount: &DollarAmount) -> bool {
    let after_end = ceil_char_boundary(text, amount.end + RATIO_WINDOW);
    if RATIO_AFTER_RE.is_match(&text[amount.end..after_end]) {
        return true;
    }
    let before_start = floor_char_boundary(text, amount.start.saturating_sub(RATIO_WINDOW));
    RATIO_BEFORE_RE.is_match(&text[before_start..amount.start])
}

/// The last series label inside `range`.
pub fn last_series_in(text: &str, range: Range<usize>) -> Option<String> {
    SERIES_RE
        .captures_iter(&text[range])
        .last()
        .map(|caps| format!("Series {}", &caps[1]))
}

/// Every series label inside `range`, in text order.
pub fn series_labels_in(text: &str, range: Range<usize>) -> Vec<String> {
    SERIES_RE
        .captures_iter(&text[range])
        .map(|caps| format!("Series {}", &caps[1]))
        .collect()
}

/// The first series label inside `range`.
pub fn first_series_in(text: &str, range: Range<usize>) -> Option<String> {
    SERIES_RE
        .captures(&text[range])
        .map(|caps| format!("Series {}", &caps[1]))
}

/// Start of the series lookback window for the first amount of a span.
/// Never reaches back past an earlier `$`, so a label owned by a previous
/// amount is not reused.
pub fn series_lookback_start(text: &str, span_start: usize, dollar_start: usize) -> usize {
    let start = floor_char_boundary(text, span_start.saturating_sub(SERIES_LOOKBACK));
    match text[start..dollar_start].rfind('$') {
        Some(pos) => start + pos + 1,
        None => start,
    }
}

/// `radius` characters of context on both sides of `range`, whitespace collapsed.
pub fn surrounding_text(text: &str, range: Range<usize>, radius: usize) -> String {
    let start = text[..range.start]
        .char_indices()
        .rev()
        .take(radius)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(range.start);
    let end = text[range.end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| range.end + i)
        .unwrap_or(text.len());

    text[start..end].split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

pub(crate) fn ceil_char_boundary(text: &str, index: usize) -> usize {
    let mut i = index.min(text.len());
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_numeral_strips_separators() {
        assert_eq!(parse_numeral("746,091.20"), Some(dec("746091.20")));
        assert_eq!(parse_numeral("160,994"), Some(dec("160994")));
        assert_eq!(parse_numeral("12"), Some(dec("12")));
    }

    #[test]
    fn test_trailing_sentence_comma_is_not_part_of_numeral() {
        let text = "in the amount of $746,091.20, payable at closing";
        let amounts = dollar_amounts(text, 0..text.len());
        assert_eq!(amounts.len(), 1);
        assert_eq!(amounts[0].value, dec("746091.20"));
        assert_eq!(&text[amounts[0].start..amounts[0].end], "$746,091.20");
    }

    #[test]
    fn test_bare_dollar_sign_is_ignored() {
        let text = "fees in $ are listed below: $12,500.";
        let amounts = dollar_amounts(text, 0..text.len());
        assert_eq!(amounts.len(), 1);
        assert_eq!(amounts[0].value, dec("12500"));
    }

    #[test]
    fn test_ratio_detection() {
        let text = "a fee of $1.00 per $1,000 of principal amount";
        let amounts = dollar_amounts(text, 0..text.len());
        assert_eq!(amounts.len(), 2);
        assert!(is_ratio(text, &amounts[0]), "numerator should be a ratio");
        assert!(is_ratio(text, &amounts[1]), "denominator should be a ratio");

        let slash = "a fee of $2.50/$1,000 of principal amount";
        let amounts = dollar_amounts(slash, 0..slash.len());
        assert_eq!(amounts.len(), 2);
        assert!(is_ratio(slash, &amounts[0]));
        assert!(is_ratio(slash, &amounts[1]));

        let spaced = "a fee of $2.50 / $1,000";
        let amounts = dollar_amounts(spaced, 0..spaced.len());
        assert!(amounts.iter().all(|a| is_ratio(spaced, a)));

        let flat = "a fee of $1,000 payable at closing";
        let amounts = dollar_amounts(flat, 0..flat.len());
        assert!(!is_ratio(flat, &amounts[0]));
    }

    #[test]
    fn test_series_labels() {
        let text = "the Series 2024B Underwriter and the SERIES 2015A-1 Bonds, Series A";
        assert_eq!(first_series_in(text, 0..text.len()), Some("Series 2024B".to_string()));
        assert_eq!(last_series_in(text, 0..text.len()), Some("Series A".to_string()));
        assert_eq!(last_series_in(text, 0..40), Some("Series 2015A-1".to_string()));
        assert_eq!(
            series_labels_in(text, 0..text.len()),
            vec!["Series 2024B", "Series 2015A-1", "Series A"]
        );
    }

    #[test]
    fn test_series_word_without_designator_is_not_a_label() {
        let text = "a series of bonds issued in one Series offering";
        assert_eq!(first_series_in(text, 0..text.len()), None);
    }

    #[test]
    fn test_lookback_stops_at_previous_amount() {
        let text = "Series 2023A fee of $10 and then a fee of $20";
        let second = text.rfind('$').unwrap();
        let start = series_lookback_start(text, second, second);
        assert_eq!(last_series_in(text, start..second), None);
    }

    #[test]
    fn test_surrounding_text_collapses_whitespace() {
        let text = "aaaa  bb\n\ncc $5  dd";
        let dollar = text.find('$').unwrap();
        let context = surrounding_text(text, dollar..dollar + 2, 6);
        assert_eq!(context, "b cc $5 dd");
        assert_eq!(surrounding_text(text, dollar..dollar + 2, 0), "$5");
    }

    #[test]
    fn test_char_boundaries_with_multibyte_text() {
        let text = "’’’ $5 ’’’";
        assert!(text.is_char_boundary(floor_char_boundary(text, 1)));
        assert!(text.is_char_boundary(ceil_char_boundary(text, 1)));
        let amounts = dollar_amounts(text, 0..text.len());
        assert!(!is_ratio(text, &amounts[0]));
    }
}
