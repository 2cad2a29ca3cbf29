//! Pattern text search and text-mode realignment.
//!
//! When the book holds Original text and diacritics are not wanted, each verse is matched in
//! its Simplified29 rendering and the matches are mapped back onto the diacritic-bearing
//! source through a per-character alignment.

use rayon::prelude::*;
use std::ops::Range;

use crate::book::{tokens_with_offsets, Book};
use crate::error::EngineError;
use crate::models::{Hit, Phrase, Unit};
use crate::number_query::Multiplicity;
use crate::pattern::{build_pattern, Pattern, TextLocation, Wordness};
use crate::simplify::{is_letter, TextMode, TextSimplifier};

/// A pattern text query
#[derive(Debug, Clone, Default)]
pub struct TextQuery {
    pub text: String,
    pub verse_location: TextLocation,
    pub word_location: TextLocation,
    pub wordness: Wordness,
    pub multiplicity: Multiplicity,
}

impl TextQuery {
    pub fn new(text: impl Into<String>) -> Self {
        TextQuery {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn wordness(mut self, wordness: Wordness) -> Self {
        self.wordness = wordness;
        self
    }

    pub fn located(mut self, verse: TextLocation, word: TextLocation) -> Self {
        self.verse_location = verse;
        self.word_location = word;
        self
    }

    pub fn multiplicity(mut self, multiplicity: Multiplicity) -> Self {
        self.multiplicity = multiplicity;
        self
    }
}

/// Simplified rendering of a raw verse with per-character offsets back into the raw text
pub(crate) struct Alignment {
    pub text: String,
    chars: Vec<char>,
    starts: Vec<usize>,
    ends: Vec<usize>,
    raw: Vec<char>,
}

impl Alignment {
    /// Align `raw` with its rendering in `mode`. Fails when simplifying character by
    /// character does not reproduce the token simplification.
    pub fn new(raw: &str, mode: TextMode, simplifier: &dyn TextSimplifier) -> Option<Self> {
        let mut chars = Vec::new();
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        let mut previous_end: Option<usize> = None;
        let mut buf = [0u8; 4];

        for (offset, token) in tokens_with_offsets(raw) {
            let expected = simplifier.simplify(token, mode);
            if !expected.chars().any(is_letter) {
                continue;
            }

            let mut produced = String::new();
            let mut pieces: Vec<(char, usize)> = Vec::new();
            for (i, c) in token.chars().enumerate() {
                let piece = simplifier.simplify(c.encode_utf8(&mut buf), mode);
                pieces.extend(piece.chars().map(|s| (s, offset + i)));
                produced.push_str(&piece);
            }
            if produced != expected {
                return None;
            }

            let token_end = offset + token.chars().count();
            if let Some(end) = previous_end {
                chars.push(' ');
                starts.push(end);
                ends.push(end);
            }
            for (k, &(c, raw_index)) in pieces.iter().enumerate() {
                // Trailing marks belong to the character they follow
                let next = pieces.get(k + 1).map_or(token_end, |&(_, r)| r);
                chars.push(c);
                starts.push(raw_index);
                ends.push(next.max(raw_index + 1));
            }
            previous_end = Some(token_end);
        }

        Some(Alignment {
            text: chars.iter().collect(),
            chars,
            starts,
            ends,
            raw: raw.chars().collect(),
        })
    }

    /// Raw position and text covering a simplified char range.
    pub fn to_original(&self, range: Range<usize>) -> Option<(usize, String)> {
        if range.is_empty() || range.end > self.chars.len() {
            return None;
        }
        let start = self.starts[range.start];
        let end = self.ends[range.end - 1];
        Some((start, self.raw[start..end].iter().collect()))
    }

    /// Simplified position and text of the letters inside a raw char range.
    pub fn from_original(&self, range: Range<usize>) -> Option<(usize, String)> {
        let inside: Vec<usize> = (0..self.chars.len())
            .filter(|&j| self.chars[j] != ' ')
            .filter(|&j| self.starts[j] >= range.start && self.ends[j] <= range.end)
            .collect();
        let (first, last) = (*inside.first()?, *inside.last()?);
        Some((first, self.chars[first..=last].iter().collect()))
    }
}

/// Re-express a phrase in another text mode of the same verse.
pub fn switch_text_mode(
    book: &Book,
    simplifier: &dyn TextSimplifier,
    phrase: &Phrase,
    target: TextMode,
) -> Phrase {
    if phrase.mode == target {
        return phrase.clone();
    }
    if !phrase.mode.is_original() && !target.is_original() {
        let original = switch_text_mode(book, simplifier, phrase, TextMode::Original);
        if !original.mode.is_original() {
            return phrase.clone();
        }
        return switch_text_mode(book, simplifier, &original, target);
    }

    let raw = &book.verses[phrase.verse].raw_text;
    let simplified_mode = if target.is_original() { phrase.mode } else { target };
    let realigned = Alignment::new(raw, simplified_mode, simplifier).and_then(|alignment| {
        let range = phrase.position..phrase.end();
        if target.is_original() {
            alignment.to_original(range)
        } else {
            alignment.from_original(range)
        }
    });

    match realigned {
        Some((position, text)) => Phrase {
            verse: phrase.verse,
            position,
            text,
            mode: target,
        },
        None => {
            tracing::warn!(verse = phrase.verse, from = %phrase.mode, to = %target, "cannot realign phrase");
            phrase.clone()
        }
    }
}

/// Runs pattern queries against the verses of a book
pub struct TextSearcher<'a> {
    book: &'a Book,
    simplifier: &'a dyn TextSimplifier,
    with_diacritics: bool,
}

impl<'a> TextSearcher<'a> {
    pub fn new(book: &'a Book, simplifier: &'a dyn TextSimplifier, with_diacritics: bool) -> Self {
        TextSearcher {
            book,
            simplifier,
            with_diacritics,
        }
    }

    pub fn book(&self) -> &'a Book {
        self.book
    }

    fn realigns(&self) -> bool {
        self.book.mode.is_original() && !self.with_diacritics
    }

    /// Bring query text into the form the verses are matched in.
    pub fn prepare(&self, text: &str) -> String {
        if self.realigns() {
            self.simplifier.simplify29(text)
        } else {
            self.simplifier.simplify(text, self.book.mode)
        }
    }

    pub fn pattern(&self, query: &TextQuery) -> Pattern {
        build_pattern(
            &self.prepare(&query.text),
            query.verse_location,
            query.word_location,
            query.wordness,
        )
    }

    /// Matches of `pattern` in one verse, expressed in the book's text mode.
    pub fn verse_phrases(&self, pattern: &Pattern, verse: usize) -> Vec<Phrase> {
        let book_verse = &self.book.verses[verse];

        if self.realigns() {
            match Alignment::new(&book_verse.raw_text, TextMode::Simplified29, self.simplifier) {
                Some(alignment) => {
                    return pattern
                        .find_all(&alignment.text)
                        .into_iter()
                        .filter_map(|range| alignment.to_original(range))
                        .map(|(position, text)| Phrase {
                            verse,
                            position,
                            text,
                            mode: TextMode::Original,
                        })
                        .collect();
                }
                None => {
                    tracing::warn!(verse, "verse cannot be realigned; matching simplified text");
                    let simplified = self.simplifier.simplify29(&book_verse.raw_text);
                    return phrases_in(pattern, &simplified, verse, TextMode::Simplified29);
                }
            }
        }

        phrases_in(pattern, &book_verse.text, verse, self.book.mode)
    }

    /// Units containing matches of `query`, restricted to `verses`.
    pub fn find(&self, query: &TextQuery, unit: Unit, verses: &[usize]) -> Result<Vec<Hit>, EngineError> {
        if matches!(unit, Unit::Letter | Unit::Sentence) {
            return Err(EngineError::InvalidQuery(format!(
                "text search does not run at {} granularity",
                unit
            )));
        }

        let prepared = self.prepare(&query.text);
        if prepared.trim().is_empty() {
            return Ok(Vec::new());
        }

        let pattern = build_pattern(&prepared, query.verse_location, query.word_location, query.wordness);
        if pattern.is_never() && !query.multiplicity.admits_zero() {
            return Ok(Vec::new());
        }

        let per_verse: Vec<(usize, Vec<Phrase>)> = verses
            .par_iter()
            .map(|&v| (v, self.verse_phrases(&pattern, v)))
            .collect();

        let hits = group_phrases(self.book, unit, per_verse, query.multiplicity);
        tracing::debug!(%unit, text = %query.text, hits = hits.len(), "text search");
        Ok(hits)
    }
}

fn phrases_in(pattern: &Pattern, text: &str, verse: usize, mode: TextMode) -> Vec<Phrase> {
    let chars: Vec<char> = text.chars().collect();
    pattern
        .find_all(text)
        .into_iter()
        .map(|range| Phrase {
            verse,
            position: range.start,
            text: chars[range].iter().collect(),
            mode,
        })
        .collect()
}

/// Gather per-verse phrases into hits of `unit`, keeping units whose match count passes.
pub(crate) fn group_phrases(
    book: &Book,
    unit: Unit,
    per_verse: Vec<(usize, Vec<Phrase>)>,
    multiplicity: Multiplicity,
) -> Vec<Hit> {
    let mut hits = Vec::new();

    match unit {
        Unit::Verse => {
            for (verse, phrases) in per_verse {
                if multiplicity.admits(phrases.len()) {
                    hits.push(Hit::with_phrases(unit, verse, phrases));
                }
            }
        }
        Unit::Word => {
            for (verse, phrases) in per_verse {
                for w in book.verses[verse].words.clone() {
                    let word = &book.words[w];
                    let end = word.position + word.text.chars().count();
                    let touching: Vec<Phrase> = phrases
                        .iter()
                        .filter(|p| p.position < end && p.end() > word.position)
                        .cloned()
                        .collect();
                    if multiplicity.admits(touching.len()) {
                        hits.push(Hit::with_phrases(unit, w, touching));
                    }
                }
            }
        }
        Unit::Partition(kind) => {
            let mut current: Option<(usize, Vec<Phrase>)> = None;
            for (verse, phrases) in per_verse {
                let Some(p) = book.partition_of(kind, verse) else {
                    continue;
                };
                match current.as_mut() {
                    Some((open, collected)) if *open == p => collected.extend(phrases),
                    _ => {
                        if let Some((done, collected)) = current.take() {
                            if multiplicity.admits(collected.len()) {
                                hits.push(Hit::with_phrases(unit, done, collected));
                            }
                        }
                        current = Some((p, phrases));
                    }
                }
            }
            if let Some((done, collected)) = current {
                if multiplicity.admits(collected.len()) {
                    hits.push(Hit::with_phrases(unit, done, collected));
                }
            }
        }
        Unit::Letter | Unit::Sentence => {}
    }

    hits
}
