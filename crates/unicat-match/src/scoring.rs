//! Record quality scoring and primary selection.

use once_cell::sync::Lazy;
use regex::Regex;
use unicat_core::{Field, Record};

use crate::cluster::SourceRecord;

/// Authority-identifier schemes recognized in heading `$9` subfields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityScheme {
    Viaf,
    Isni,
    Wikidata,
    Bne,
    Lemac,
    Cantic,
    Other,
}

impl AuthorityScheme {
    pub fn points(self) -> u32 {
        match self {
            AuthorityScheme::Viaf | AuthorityScheme::Isni => 6,
            AuthorityScheme::Wikidata => 5,
            AuthorityScheme::Bne | AuthorityScheme::Lemac | AuthorityScheme::Cantic => 4,
            AuthorityScheme::Other => 2,
        }
    }

    /// Classify a raw `$9` value; matching is case-insensitive on the trimmed value.
    pub fn classify(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        AUTHORITY_PATTERNS
            .iter()
            .find(|(_, re)| re.is_match(&value))
            .map(|(scheme, _)| *scheme)
            .unwrap_or(AuthorityScheme::Other)
    }
}

static AUTHORITY_PATTERNS: Lazy<Vec<(AuthorityScheme, Regex)>> = Lazy::new(|| {
    [
        (AuthorityScheme::Viaf, r"(?i)^(viaf:? *\d+|\d{8})$"),
        (AuthorityScheme::Isni, r"(?i)^isni:? *\d{15}[0-9x]$"),
        (AuthorityScheme::Wikidata, r"(?i)^(wd|wikidata):q\d+$"),
        (AuthorityScheme::Bne, r"(?i)^bne:.+$"),
        (AuthorityScheme::Lemac, r"(?i)^lemac:.+$"),
        (AuthorityScheme::Cantic, r"(?i)^cantic:.+$"),
    ]
    .into_iter()
    .map(|(scheme, pattern)| (scheme, Regex::new(pattern).expect("valid regex")))
    .collect()
});

/// Main entries (100–111), subjects (6XX) and added entries (7XX).
fn is_heading_tag(tag: &str) -> bool {
    match tag.parse::<u16>() {
        Ok(n) if tag.len() == 3 => (100..=111).contains(&n) || (600..=799).contains(&n),
        _ => false,
    }
}

pub fn score_authorities(record: &Record) -> u32 {
    record
        .fields
        .iter()
        .filter_map(Field::as_data)
        .filter(|f| is_heading_tag(&f.tag))
        .flat_map(|f| f.subfield_values(&['9']))
        .map(|v| AuthorityScheme::classify(v).points())
        .sum()
}

/// Additive completeness score used to pick a cluster's primary record.
pub fn score_record(record: &Record) -> u32 {
    let mut score = 0;

    if record.has_tag("245") {
        score += 15;
    }
    if record.has_tag("260") || record.has_tag("264") {
        score += 10;
    }
    if ["100", "110", "111"].iter().any(|t| record.has_tag(t)) {
        score += 8;
    }
    if record.has_tag("020") {
        score += 12;
    }
    if record.has_tag("022") {
        score += 10;
    }
    if record.has_tag("300") {
        score += 4;
    }

    let fixed_len = record
        .fields_with_tag("008")
        .next()
        .and_then(Field::as_control)
        .map(|f| f.value.chars().count());
    if fixed_len.is_some_and(|n| n >= 40) {
        score += 15;
    }

    for field in record.fields.iter().filter_map(Field::as_data) {
        score += u32::from(field.ind1 != ' ') + u32::from(field.ind2 != ' ');
    }

    score + score_authorities(record)
}

/// Index and score of the primary member: the highest scorer, ties broken by
/// the first label in `prefer` found among the tied members, then by member
/// order. `None` for an empty slice.
pub fn choose_primary(members: &[SourceRecord], prefer: &[String]) -> Option<(usize, u32)> {
    let scores: Vec<u32> = members.iter().map(|m| score_record(&m.record)).collect();
    let max = *scores.iter().max()?;
    let best: Vec<usize> = (0..members.len()).filter(|&i| scores[i] == max).collect();

    let preferred = prefer
        .iter()
        .find_map(|lib| best.iter().copied().find(|&i| members[i].lib == *lib));
    let index = preferred.unwrap_or(best[0]);
    Some((index, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use unicat_core::DataField;

    fn member(lib: &str, record: Record) -> SourceRecord {
        SourceRecord {
            lib: lib.to_string(),
            local_id: String::new(),
            record,
            strong_key: None,
            fuzzy_key: None,
        }
    }

    #[test]
    fn test_classify_schemes() {
        assert_eq!(AuthorityScheme::classify("viaf:12345"), AuthorityScheme::Viaf);
        assert_eq!(AuthorityScheme::classify(" VIAF 999 "), AuthorityScheme::Viaf);
        assert_eq!(AuthorityScheme::classify("12345678"), AuthorityScheme::Viaf);
        assert_eq!(AuthorityScheme::classify("ISNI 000000012146438X"), AuthorityScheme::Isni);
        assert_eq!(AuthorityScheme::classify("wd:Q42"), AuthorityScheme::Wikidata);
        assert_eq!(AuthorityScheme::classify("Wikidata:Q1"), AuthorityScheme::Wikidata);
        assert_eq!(AuthorityScheme::classify("bne:XX1234"), AuthorityScheme::Bne);
        assert_eq!(AuthorityScheme::classify("LEMAC:x"), AuthorityScheme::Lemac);
        assert_eq!(AuthorityScheme::classify("cantic:981058"), AuthorityScheme::Cantic);
        assert_eq!(AuthorityScheme::classify("1234567"), AuthorityScheme::Other);
        assert_eq!(AuthorityScheme::classify("bne:"), AuthorityScheme::Other);
    }

    #[test]
    fn test_authorities_only_on_heading_fields() {
        let rec = Record::new()
            .with_field(DataField::new("100", '1', ' ').with_subfield('a', "X").with_subfield('9', "viaf:1"))
            .with_field(DataField::new("650", ' ', '4').with_subfield('9', "wd:Q5").with_subfield('9', "local"))
            .with_field(DataField::new("245", '1', '0').with_subfield('9', "viaf:2"))
            .with_field(DataField::new("112", ' ', ' ').with_subfield('9', "viaf:3"));
        assert_eq!(score_authorities(&rec), 6 + 5 + 2);
    }

    #[test]
    fn test_score_record() {
        let rec = Record::new()
            .with_field(Field::control("008", "x".repeat(40)))
            .with_field(DataField::new("020", ' ', ' ').with_subfield('a', "0306406152"))
            .with_field(DataField::new("100", '1', ' ').with_subfield('a', "Author"))
            .with_field(DataField::new("245", '1', '0').with_subfield('a', "Title"))
            .with_field(DataField::new("264", ' ', '1').with_subfield('c', "2001"))
            .with_field(DataField::new("300", ' ', ' ').with_subfield('a', "200 p."));
        // 15 + 10 + 8 + 12 + 4 + 15, plus four non-blank indicators.
        assert_eq!(score_record(&rec), 64 + 4);

        let short = Record::new().with_field(Field::control("008", "x".repeat(39)));
        assert_eq!(score_record(&short), 0);
        assert_eq!(score_record(&Record::new()), 0);
    }

    #[test]
    fn test_choose_primary_highest_score() {
        let members = vec![
            member("LIB1", Record::new()),
            member("LIB2", Record::new().with_field(DataField::new("245", ' ', ' '))),
        ];
        assert_eq!(choose_primary(&members, &[]), Some((1, 15)));
    }

    #[test]
    fn test_choose_primary_ties() {
        let members = vec![
            member("LIB1", Record::new()),
            member("LIB2", Record::new()),
            member("LIB3", Record::new()),
        ];
        assert_eq!(choose_primary(&members, &[]).map(|p| p.0), Some(0));

        let prefer = vec!["LIB9".to_string(), "LIB3".to_string(), "LIB2".to_string()];
        assert_eq!(choose_primary(&members, &prefer).map(|p| p.0), Some(2));
    }

    #[test]
    fn test_preference_never_beats_score() {
        let members = vec![
            member("LIB1", Record::new().with_field(DataField::new("300", ' ', ' '))),
            member("LIB2", Record::new()),
        ];
        let prefer = vec!["LIB2".to_string()];
        assert_eq!(choose_primary(&members, &prefer).map(|p| p.0), Some(0));
        assert_eq!(choose_primary(&[], &prefer), None);
    }
}
