//! Text canonicalization for fuzzy comparison.

/// Characters replaced by a space before whitespace is collapsed.
pub const PUNCTUATION: &str = ",.;:!?/'\"()[]{}<>-&_=+*#@$%^`~|";

/// Transliterate to ASCII, lowercase, blank out [`PUNCTUATION`] and collapse
/// whitespace. Total and idempotent.
pub fn normalize_text(input: &str) -> String {
    let ascii = deunicode::deunicode_with_tofu(input, "");
    let lowered = ascii.to_lowercase();

    let mut out = String::with_capacity(lowered.len());
    for word in lowered.split(is_separator).filter(|w| !w.is_empty()) {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

fn is_separator(c: char) -> bool {
    // ASCII file/group/record/unit separators count as whitespace too.
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c) || PUNCTUATION.contains(c)
}

/// Keep ASCII digits and `X`, uppercased. Used for ISBN/ISSN candidates.
pub fn digits_and_x(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || c.eq_ignore_ascii_case(&'x'))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_strips_punctuation() {
        assert_eq!(
            normalize_text("García Márquez, Gabriel|Cien años de soledad /|1967"),
            "garcia marquez gabriel cien anos de soledad 1967"
        );
    }

    #[test]
    fn collapses_whitespace_and_trims() {
        assert_eq!(normalize_text("  The   Hobbit:\tor, There\nand Back  "), "the hobbit or there and back");
    }

    #[test]
    fn empty_and_punctuation_only_inputs_are_empty() {
        assert_eq!(normalize_text(""), "");
        assert_eq!(normalize_text("||"), "");
        assert_eq!(normalize_text(" -- ; : "), "");
    }

    #[test]
    fn is_idempotent() {
        let samples = [
            "",
            "Straße & Söhne [Hrsg.]",
            "Œuvres complètes — tome 1",
            "Πλάτων|Πολιτεία|1990",
            "東京 物語",
            "Already normalized text",
            "a\u{1f}b\u{1e}c",
        ];
        for s in samples {
            let once = normalize_text(s);
            assert_eq!(normalize_text(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn transliterates_to_ascii() {
        let out = normalize_text("Œuvres Ñandú Ærø");
        assert!(out.is_ascii());
        assert!(out.starts_with("oeuvres nandu"));
    }

    #[test]
    fn digits_and_x_keeps_check_characters() {
        assert_eq!(digits_and_x("0-8044-2957-x (pbk.)"), "080442957X");
        assert_eq!(digits_and_x("ISSN 0317-8471"), "03178471");
        assert_eq!(digits_and_x("no digits"), "");
        assert_eq!(digits_and_x("xx"), "XX");
        assert_eq!(digits_and_x(""), "");
    }
}
