//! Token-sort similarity between fuzzy keys.
//!
//! Both keys are split on whitespace, their tokens sorted and rejoined, and
//! scored as `200 * LCS / (len_a + len_b)` over characters. Scores are kept
//! as exact fractions so threshold and tie comparisons never round.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

/// Exact similarity `100 * num / den` percent.
#[derive(Debug, Clone, Copy)]
pub struct Similarity {
    num: u64,
    den: u64,
}

impl Similarity {
    pub const ZERO: Similarity = Similarity { num: 0, den: 1 };
    pub const FULL: Similarity = Similarity { num: 1, den: 1 };

    fn from_lcs(lcs: usize, total_len: usize) -> Self {
        if total_len == 0 {
            return Self::FULL;
        }
        Self {
            num: 2 * lcs as u64,
            den: total_len as u64,
        }
    }

    /// Inclusive threshold test against an integer percentage.
    pub fn meets(&self, threshold: u8) -> bool {
        self.num * 100 >= u64::from(threshold) * self.den
    }

    pub fn percent(&self) -> f64 {
        100.0 * self.num as f64 / self.den as f64
    }
}

impl PartialEq for Similarity {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Similarity {}

impl PartialOrd for Similarity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Similarity {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num * other.den).cmp(&(other.num * self.den))
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.percent())
    }
}

/// Whitespace tokens sorted and joined with single spaces.
pub fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

pub fn token_sort_ratio(a: &str, b: &str) -> Similarity {
    PreparedKey::new(a).similarity(&sort_tokens(b))
}

/// A query key with its token-sorted form and per-character match masks,
/// built once and compared against many indexed keys.
#[derive(Debug, Clone)]
pub struct PreparedKey {
    sorted: String,
    len: usize,
    words: usize,
    ascii: Vec<u64>,
    other: HashMap<char, Vec<u64>>,
}

impl PreparedKey {
    pub fn new(key: &str) -> Self {
        let sorted = sort_tokens(key);
        let len = sorted.chars().count();
        let words = len.div_ceil(64).max(1);
        let mut ascii = vec![0u64; 128 * words];
        let mut other: HashMap<char, Vec<u64>> = HashMap::new();

        for (i, c) in sorted.chars().enumerate() {
            let (word, bit) = (i / 64, 1u64 << (i % 64));
            if c.is_ascii() {
                ascii[c as usize * words + word] |= bit;
            } else {
                other.entry(c).or_insert_with(|| vec![0u64; words])[word] |= bit;
            }
        }

        Self {
            sorted,
            len,
            words,
            ascii,
            other,
        }
    }

    pub fn sorted(&self) -> &str {
        &self.sorted
    }

    /// Similarity against a key that is already token-sorted.
    pub fn similarity(&self, other_sorted: &str) -> Similarity {
        let (lcs, other_len) = self.lcs(other_sorted);
        Similarity::from_lcs(lcs, self.len + other_len)
    }

    fn mask(&self, c: char) -> Option<&[u64]> {
        if c.is_ascii() {
            let start = c as usize * self.words;
            Some(&self.ascii[start..start + self.words])
        } else {
            self.other.get(&c).map(Vec::as_slice)
        }
    }

    /// Bit-parallel LCS length (Allison–Dix / Hyyrö), plus the char length of `other`.
    fn lcs(&self, other: &str) -> (usize, usize) {
        let mut state = vec![u64::MAX; self.words];
        let mut other_len = 0;

        for c in other.chars() {
            other_len += 1;
            let Some(mask) = self.mask(c) else {
                continue;
            };
            let mut carry = 0u64;
            for (s, &m) in state.iter_mut().zip(mask) {
                let u = *s & m;
                let (sum, c1) = s.overflowing_add(u);
                let (sum, c2) = sum.overflowing_add(carry);
                carry = u64::from(c1 | c2);
                // u is a subset of s, so the subtraction never borrows.
                *s = sum | (*s - u);
            }
        }

        if self.len == 0 {
            return (0, other_len);
        }

        let mut lcs = 0;
        for (w, s) in state.iter().enumerate() {
            let bits = (self.len - w * 64).min(64);
            let valid = if bits == 64 { u64::MAX } else { (1u64 << bits) - 1 };
            lcs += (!s & valid).count_ones() as usize;
        }
        (lcs, other_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dp_lcs(a: &str, b: &str) -> usize {
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let mut prev = vec![0usize; b.len() + 1];
        for &ca in &a {
            let mut cur = vec![0usize; b.len() + 1];
            for (j, &cb) in b.iter().enumerate() {
                cur[j + 1] = if ca == cb {
                    prev[j] + 1
                } else {
                    cur[j].max(prev[j + 1])
                };
            }
            prev = cur;
        }
        prev[b.len()]
    }

    /// Small deterministic generator so the cross-check needs no extra crates.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self) -> u64 {
            self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            self.0 >> 33
        }

        fn string(&mut self, alphabet: &[char], len: usize) -> String {
            (0..len)
                .map(|_| alphabet[(self.next() % alphabet.len() as u64) as usize])
                .collect()
        }
    }

    #[test]
    fn test_sort_tokens() {
        assert_eq!(sort_tokens("soledad de anos cien"), "anos cien de soledad");
        assert_eq!(sort_tokens("  b   a "), "a b");
        assert_eq!(sort_tokens(""), "");
    }

    #[test]
    fn test_identical_and_reordered_keys_score_full() {
        assert_eq!(token_sort_ratio("garcia marquez cien anos", "cien anos garcia marquez"), Similarity::FULL);
        assert_eq!(token_sort_ratio("", ""), Similarity::FULL);
        assert!(token_sort_ratio("abc", "abc").meets(100));
    }

    #[test]
    fn test_disjoint_and_empty() {
        assert_eq!(token_sort_ratio("abc", "xyz"), Similarity::ZERO);
        assert_eq!(token_sort_ratio("abc", ""), Similarity::ZERO);
        assert_eq!(token_sort_ratio("", "abc"), Similarity::ZERO);
    }

    #[test]
    fn test_exact_threshold_boundary() {
        // 23 common characters out of 25 + 25: exactly 92.
        let s = token_sort_ratio("abcdefghijklmnopqrstuvwxy", "abcdefghijklmnopqrstuvw12");
        assert!(s.meets(92));
        assert!(!s.meets(93));
        assert_eq!(s, Similarity { num: 46, den: 50 });
        assert_eq!(s.to_string(), "92.00");
    }

    #[test]
    fn test_ordering_is_by_value() {
        let half = Similarity { num: 1, den: 2 };
        let also_half = Similarity { num: 50, den: 100 };
        assert_eq!(half, also_half);
        assert!(Similarity { num: 46, den: 50 } > Similarity { num: 45, den: 50 });
        assert!(Similarity::ZERO < half);
    }

    #[test]
    fn test_bit_parallel_matches_dynamic_programming() {
        let mut rng = Lcg(0x5eed);
        let alphabet: Vec<char> = "abcde fgh".chars().chain(['é', 'ß', '東']).collect();
        for round in 0..300 {
            let la = (rng.next() % 150) as usize;
            let lb = (rng.next() % 150) as usize;
            let a = rng.string(&alphabet, la);
            let b = rng.string(&alphabet, lb);
            let prepared = PreparedKey::new(&a);
            let (lcs, _) = prepared.lcs(&b);
            assert_eq!(lcs, dp_lcs(prepared.sorted(), &b), "round {round}: {a:?} vs {b:?}");
        }
    }

    #[test]
    fn test_multiword_keys() {
        let a = "x".repeat(70) + &"y".repeat(70);
        let b = "y".repeat(65) + &"x".repeat(3);
        let prepared = PreparedKey::new(&a);
        assert_eq!(prepared.lcs(&b).0, 65);
        assert_eq!(prepared.lcs(&a).0, 140);
    }
}
