//! Verse similarity by letter shingles and word sets.
//!
//! Every method reduces a verse to a set and scores a pair by Jaccard similarity. Letter
//! methods shingle consecutive letter pairs across word boundaries; a feature with a single
//! letter falls back to unigrams so that short words still compare.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use crate::book::Book;
use crate::models::{Hit, Unit};
use crate::simplify::is_letter;

/// Which part of a verse is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimilarityMethod {
    /// Letter bigrams of the whole verse
    #[default]
    Text,
    /// Distinct word forms
    Words,
    FirstWord,
    LastWord,
    /// Letter bigrams of the first ceil(n/2) words
    FirstHalf,
    /// Letter bigrams of the last ceil(n/2) words
    LastHalf,
}

impl SimilarityMethod {
    pub const ALL: [SimilarityMethod; 6] = [
        SimilarityMethod::Text,
        SimilarityMethod::Words,
        SimilarityMethod::FirstWord,
        SimilarityMethod::LastWord,
        SimilarityMethod::FirstHalf,
        SimilarityMethod::LastHalf,
    ];
}

impl fmt::Display for SimilarityMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for SimilarityMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace(['-', '_'], "");
        SimilarityMethod::ALL
            .iter()
            .copied()
            .find(|m| m.to_string().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown similarity method: {}", s))
    }
}

/// A pair of similar verses, `first < second`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPair {
    pub first: usize,
    pub second: usize,
    pub score: f32,
}

/// Generate n-gram shingles from a sequence.
pub fn generate_shingles<T: Clone + Eq + Hash>(items: &[T], n: usize) -> HashSet<Vec<T>> {
    if items.len() < n || n == 0 {
        return HashSet::new();
    }

    items.windows(n).map(|w| w.to_vec()).collect()
}

/// Jaccard similarity between two sets; two empty sets are identical.
pub fn jaccard_similarity<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;

    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

fn letter_shingles<'a>(words: impl Iterator<Item = &'a str>) -> HashSet<Vec<char>> {
    let letters: Vec<char> = words.flat_map(str::chars).filter(|&c| is_letter(c)).collect();
    let n = letters.len().clamp(1, 2);
    generate_shingles(&letters, n)
}

/// Comparable features of one verse
enum Features {
    Letters(HashSet<Vec<char>>),
    Words(HashSet<String>),
}

fn features(book: &Book, verse: usize, method: SimilarityMethod) -> Features {
    let words = &book.words[book.verses[verse].words.clone()];
    let texts = || words.iter().map(|w| w.text.as_str());
    let half = words.len().div_ceil(2);

    match method {
        SimilarityMethod::Text => Features::Letters(letter_shingles(texts())),
        SimilarityMethod::Words => Features::Words(texts().map(str::to_string).collect()),
        SimilarityMethod::FirstWord => Features::Letters(letter_shingles(texts().take(1))),
        SimilarityMethod::LastWord => {
            Features::Letters(letter_shingles(texts().skip(words.len().saturating_sub(1))))
        }
        SimilarityMethod::FirstHalf => Features::Letters(letter_shingles(texts().take(half))),
        SimilarityMethod::LastHalf => {
            Features::Letters(letter_shingles(texts().skip(words.len() - half)))
        }
    }
}

fn score(a: &Features, b: &Features) -> f32 {
    match (a, b) {
        (Features::Letters(a), Features::Letters(b)) => jaccard_similarity(a, b),
        (Features::Words(a), Features::Words(b)) => jaccard_similarity(a, b),
        _ => 0.0,
    }
}

/// Similarity of two verses under `method`, in `[0, 1]`.
pub fn similarity(book: &Book, a: usize, b: usize, method: SimilarityMethod) -> f32 {
    score(&features(book, a, method), &features(book, b, method))
}

/// Verses among `verses` at least `threshold` similar to `reference`, in corpus order.
///
/// The reference verse itself is never reported.
pub fn find_similar(
    book: &Book,
    reference: usize,
    method: SimilarityMethod,
    threshold: f32,
    verses: &[usize],
) -> Vec<Hit> {
    if reference >= book.verses.len() {
        return Vec::new();
    }

    let wanted = features(book, reference, method);
    let hits: Vec<Hit> = verses
        .par_iter()
        .filter(|&&v| v != reference && score(&wanted, &features(book, v, method)) >= threshold)
        .map(|&v| Hit::single(Unit::Verse, v))
        .collect();

    tracing::debug!(%method, reference, threshold, hits = hits.len(), "similarity search");
    hits
}

/// Every pair of verses among `verses` at least `threshold` similar to each other.
pub fn find_similar_pairs(
    book: &Book,
    method: SimilarityMethod,
    threshold: f32,
    verses: &[usize],
) -> Vec<SimilarPair> {
    let prepared: Vec<(usize, Features)> = verses
        .par_iter()
        .map(|&v| (v, features(book, v, method)))
        .collect();

    let pairs: Vec<SimilarPair> = (0..prepared.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let (first, a) = (prepared[i].0, &prepared[i].1);
            prepared[i + 1..].iter().filter_map(move |(second, b)| {
                let value = score(a, b);
                (value >= threshold).then(|| SimilarPair {
                    first: first.min(*second),
                    second: first.max(*second),
                    score: value,
                })
            })
        })
        .collect();

    tracing::debug!(%method, threshold, pairs = pairs.len(), "similar pairs");
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simplify::TextMode;
    use crate::test_support::sample_book;

    #[test]
    fn test_jaccard_similarity() {
        let a: HashSet<Vec<u32>> = vec![vec![1, 2], vec![2, 3], vec![3, 4]].into_iter().collect();
        let b: HashSet<Vec<u32>> = vec![vec![2, 3], vec![3, 4], vec![4, 5]].into_iter().collect();

        // Intersection 2, union 4
        assert!((jaccard_similarity(&a, &b) - 0.5).abs() < 0.001);
        assert!((jaccard_similarity(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_generate_shingles() {
        let shingles = generate_shingles(&['a', 'b', 'a', 'b'], 2);
        assert_eq!(shingles.len(), 2);
        assert!(generate_shingles(&['a'], 2).is_empty());
        assert!(generate_shingles::<char>(&[], 0).is_empty());
    }

    #[test]
    fn test_single_letters_compare_by_unigram() {
        let same = letter_shingles(["ن"].into_iter());
        let other = letter_shingles(["ق"].into_iter());
        assert_eq!(jaccard_similarity(&same, &same), 1.0);
        assert_eq!(jaccard_similarity(&same, &other), 0.0);
    }

    #[test]
    fn test_word_methods() {
        let book = sample_book(TextMode::Simplified29);
        let all: Vec<usize> = (0..book.verses.len()).collect();

        let last = find_similar(&book, 0, SimilarityMethod::LastWord, 1.0, &all);
        assert_eq!(last, vec![Hit::single(Unit::Verse, 2)]);

        let first = find_similar(&book, 1, SimilarityMethod::FirstWord, 1.0, &all);
        assert_eq!(first, vec![Hit::single(Unit::Verse, 6)]);

        let words = similarity(&book, 0, 2, SimilarityMethod::Words);
        assert!((words - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_text_method_finds_containing_verse() {
        let book = sample_book(TextMode::Simplified29);
        let all: Vec<usize> = (0..book.verses.len()).collect();
        let hits = find_similar(&book, 2, SimilarityMethod::Text, 0.5, &all);
        assert_eq!(hits, vec![Hit::single(Unit::Verse, 0)]);
    }

    #[test]
    fn test_reference_outside_book() {
        let book = sample_book(TextMode::Simplified29);
        assert!(find_similar(&book, 99, SimilarityMethod::Text, 0.0, &[0, 1]).is_empty());
    }

    #[test]
    fn test_pairs_are_ordered_and_thresholded() {
        let book = sample_book(TextMode::Simplified29);
        let all: Vec<usize> = (0..book.verses.len()).collect();
        let pairs = find_similar_pairs(&book, SimilarityMethod::Words, 0.5, &all);
        assert!(pairs.iter().all(|p| p.first < p.second && p.score >= 0.5));
        assert!(pairs.iter().any(|p| p.first == 0 && p.second == 2));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("last-word".parse::<SimilarityMethod>(), Ok(SimilarityMethod::LastWord));
        assert_eq!("text".parse::<SimilarityMethod>(), Ok(SimilarityMethod::Text));
        assert!("rhyme".parse::<SimilarityMethod>().is_err());
    }
}
