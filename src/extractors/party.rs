// src/extractors/party.rs

//! Underwriter names from the sentence that defines them, e.g.
//! `... Morgan Stanley & Co. LLC and RBC Capital Markets, LLC (the "Underwriters")`
//! or `The Bonds are being purchased by J.P. Morgan Securities LLC`.

use once_cell::sync::Lazy;
use regex::Regex;

use super::amount::{ceil_char_boundary, floor_char_boundary};

// How far on either side of a defining phrase its sentence may reach.
const SENTENCE_REACH: usize = 600;

static DEFINING_PHRASE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\([^()$]{0,40}?["“](?:underwriters?|purchasers?)["”]\)|(?-u:\b)(?:is|are)\s+being\s+purchased\s+by(?-u:\b)"#,
    )
    .expect("Failed to compile DEFINING_PHRASE_RE")
});

// "Bonds." or `"Underwriters").` followed by a new sentence. Initials ("J.P.",
// "Co.") have an uppercase character right before the stop and never end one.
static SENTENCE_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[a-z0-9)"”’]{2}([.!?]["”’]?)\s+[A-Z"“]"#)
        .expect("Failed to compile SENTENCE_END_RE")
});

// Capitalized words ending in a firm suffix, with an optional trailing entity type.
static FIRM_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    let word = r"[A-Z][A-Za-z.'’-]*";
    let suffix = r"(?:LLC|L\.L\.C|Inc|Incorporated|Co|Company|Corp|Corporation|L\.P|N\.A|Securities|Markets|Bank)(?-u:\b)\.?";
    let entity = r"(?:,?\s+(?:LLC|Inc|L\.P|N\.A)(?-u:\b)\.?)?";
    Regex::new(&format!(
        r"(?-u:\b){word}(?:\s+(?:(?:&|of)\s+)?{word}){{0,6}}?\s+(?:&\s+)?{suffix}{entity}"
    ))
    .expect("Failed to compile FIRM_NAME_RE")
});

/// Underwriters named in a document, first named first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnderwriterParties {
    /// First firm named; usually the senior manager.
    pub lead_left: Option<String>,
    pub all: Vec<String>,
}

/// Collects firm names from every sentence that defines the underwriters or
/// purchasers. Names are unique, in order of first appearance.
pub fn find_underwriters(text: &str) -> UnderwriterParties {
    let mut all: Vec<String> = Vec::new();

    for phrase in DEFINING_PHRASE_RE.find_iter(text) {
        let sentence = sentence_around(text, phrase.start(), phrase.end());
        for firm in FIRM_NAME_RE.find_iter(sentence) {
            let name = normalize_name(firm.as_str());
            if !all.contains(&name) {
                tracing::trace!("Underwriter '{}' named near byte {}", name, phrase.start());
                all.push(name);
            }
        }
    }

    UnderwriterParties {
        lead_left: all.first().cloned(),
        all,
    }
}

fn sentence_around(text: &str, start: usize, end: usize) -> &str {
    let lower = floor_char_boundary(text, start.saturating_sub(SENTENCE_REACH));
    let upper = ceil_char_boundary(text, end + SENTENCE_REACH);

    let sentence_start = SENTENCE_END_RE
        .captures_iter(&text[lower..start])
        .last()
        .and_then(|caps| caps.get(1))
        .map(|stop| lower + stop.end())
        .unwrap_or(lower);

    let rest = &text[end..upper];
    let sentence_end = if rest.trim_start().starts_with(|c: char| c == '.' || c == ';') {
        end
    } else {
        SENTENCE_END_RE
            .captures(rest)
            .and_then(|caps| caps.get(1))
            .map(|stop| end + stop.end())
            .unwrap_or(upper)
    };

    &text[sentence_start..sentence_end]
}

fn normalize_name(raw: &str) -> String {
    let name = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    match name.strip_prefix("The ") {
        Some(rest) => rest.to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defined_underwriters_in_order() {
        let text = "The Bonds are being purchased by Morgan Stanley & Co. LLC, as \
                    representative of itself, RBC Capital Markets, LLC, Loop Capital Markets LLC \
                    and Siebert Williams Shank & Co., LLC (collectively, the “Underwriters”). \
                    The Trustee is The Bank of New York Mellon Trust Company, N.A.";
        let parties = find_underwriters(text);
        assert_eq!(parties.lead_left.as_deref(), Some("Morgan Stanley & Co. LLC"));
        assert_eq!(
            parties.all,
            vec![
                "Morgan Stanley & Co. LLC",
                "RBC Capital Markets, LLC",
                "Loop Capital Markets LLC",
                "Siebert Williams Shank & Co., LLC",
            ]
        );
    }

    #[test]
    fn test_single_purchaser() {
        let text = "The Notes were awarded at competitive sale. J.P. Morgan Securities LLC \
                    (the \"Purchaser\") has agreed to purchase the Notes. Wells Fargo Bank, N.A. \
                    is the paying agent.";
        let parties = find_underwriters(text);
        assert_eq!(parties.all, vec!["J.P. Morgan Securities LLC"]);
        assert_eq!(parties.lead_left.as_deref(), Some("J.P. Morgan Securities LLC"));
    }

    #[test]
    fn test_names_repeated_across_sentences_are_unique() {
        let text = "BofA Securities, Inc. (the \"Underwriter\") will purchase the Series A Bonds. \
                    The Series B Bonds are being purchased by BofA Securities, Inc.";
        let parties = find_underwriters(text);
        assert_eq!(parties.all, vec!["BofA Securities, Inc."]);
    }

    #[test]
    fn test_no_defining_sentence() {
        let text = "Goldman Sachs & Co. LLC served as financial advisor to the City.";
        let parties = find_underwriters(text);
        assert!(parties.all.is_empty());
        assert_eq!(parties.lead_left, None);
    }
}
