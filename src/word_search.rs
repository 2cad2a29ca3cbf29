//! Boolean word search with signed term lists.
//!
//! A term prefixed or suffixed with `+` is required, with `-` excluded, and unsigned terms are
//! optional. Terms are matched with the same wordness rules as pattern search.

use rayon::prelude::*;
use std::str::FromStr;

use crate::error::EngineError;
use crate::models::{Hit, Phrase, Unit};
use crate::pattern::{Pattern, Wordness};
use crate::text_search::{TextQuery, TextSearcher};

/// How optional terms combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Grouping {
    /// Any optional term suffices
    #[default]
    Or,
    /// Every optional term must be present
    And,
}

impl FromStr for Grouping {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "or" | "any" => Ok(Grouping::Or),
            "and" | "all" => Ok(Grouping::And),
            other => Err(format!("unknown grouping: {}", other)),
        }
    }
}

/// Signed term lists parsed from a query string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordLists {
    pub required: Vec<String>,
    pub excluded: Vec<String>,
    pub optional: Vec<String>,
    /// Set when terms were separated by `|`, which always means OR
    pub piped: bool,
}

impl WordLists {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.excluded.is_empty() && self.optional.is_empty()
    }
}

/// Split a space- or pipe-delimited term string by sign.
pub fn build_word_lists(text: &str) -> WordLists {
    let mut lists = WordLists {
        piped: text.contains('|'),
        ..Default::default()
    };

    for raw in text.split(|c: char| c == '|' || c.is_whitespace()) {
        let term = raw.trim();
        if term.is_empty() {
            continue;
        }

        let (list, stripped) = if let Some(t) = term.strip_prefix('+').or_else(|| term.strip_suffix('+')) {
            (&mut lists.required, t)
        } else if let Some(t) = term.strip_prefix('-').or_else(|| term.strip_suffix('-')) {
            (&mut lists.excluded, t)
        } else {
            (&mut lists.optional, term)
        };

        if !stripped.is_empty() {
            list.push(stripped.to_string());
        }
    }

    lists
}

/// A boolean word query
#[derive(Debug, Clone, Default)]
pub struct WordQuery {
    pub text: String,
    pub wordness: Wordness,
    pub grouping: Grouping,
}

impl WordQuery {
    pub fn new(text: impl Into<String>) -> Self {
        WordQuery {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn wordness(mut self, wordness: Wordness) -> Self {
        self.wordness = wordness;
        self
    }

    pub fn grouping(mut self, grouping: Grouping) -> Self {
        self.grouping = grouping;
        self
    }
}

/// Compiled term patterns
struct Terms {
    required: Vec<Pattern>,
    excluded: Vec<Pattern>,
    optional: Vec<Pattern>,
    grouping: Grouping,
}

/// Which terms a unit contains, plus the phrases of the wanted ones
#[derive(Default)]
struct Presence {
    required: Vec<bool>,
    excluded: Vec<bool>,
    optional: Vec<bool>,
    phrases: Vec<Phrase>,
}

impl Presence {
    fn absorb(&mut self, other: Presence) {
        let merge = |a: &mut Vec<bool>, b: Vec<bool>| {
            if a.is_empty() {
                *a = b;
            } else {
                a.iter_mut().zip(b).for_each(|(x, y)| *x |= y);
            }
        };
        merge(&mut self.required, other.required);
        merge(&mut self.excluded, other.excluded);
        merge(&mut self.optional, other.optional);
        self.phrases.extend(other.phrases);
    }
}

impl Terms {
    fn presence(&self, searcher: &TextSearcher<'_>, verse: usize) -> Presence {
        let mut presence = Presence::default();
        let mut scan = |patterns: &[Pattern], keep: bool| -> Vec<bool> {
            patterns
                .iter()
                .map(|pattern| {
                    let phrases = searcher.verse_phrases(pattern, verse);
                    let found = !phrases.is_empty();
                    if keep {
                        presence.phrases.extend(phrases);
                    }
                    found
                })
                .collect()
        };
        let required = scan(self.required.as_slice(), true);
        let excluded = scan(self.excluded.as_slice(), false);
        let optional = scan(self.optional.as_slice(), true);
        presence.required = required;
        presence.excluded = excluded;
        presence.optional = optional;
        presence
    }

    fn accepts(&self, presence: &Presence) -> bool {
        if presence.excluded.iter().any(|&p| p) {
            return false;
        }
        if !presence.required.iter().all(|&p| p) {
            return false;
        }
        if self.optional.is_empty() {
            return true;
        }
        match self.grouping {
            Grouping::Or => !self.required.is_empty() || presence.optional.iter().any(|&p| p),
            Grouping::And => presence.optional.iter().all(|&p| p),
        }
    }
}

/// Units among `verses` accepted by the signed term lists of `query`.
pub fn find_words(
    searcher: &TextSearcher<'_>,
    query: &WordQuery,
    unit: Unit,
    verses: &[usize],
) -> Result<Vec<Hit>, EngineError> {
    if !matches!(unit, Unit::Verse | Unit::Partition(_)) {
        return Err(EngineError::InvalidQuery(format!(
            "word search runs on verses and partitions, not {}",
            unit
        )));
    }

    let lists = build_word_lists(&query.text);
    if lists.is_empty() {
        return Ok(Vec::new());
    }

    let compile = |terms: &[String]| -> Vec<Pattern> {
        terms
            .iter()
            .map(|t| searcher.pattern(&TextQuery::new(t.as_str()).wordness(query.wordness)))
            .collect()
    };
    let terms = Terms {
        required: compile(&lists.required),
        excluded: compile(&lists.excluded),
        optional: compile(&lists.optional),
        grouping: if lists.piped { Grouping::Or } else { query.grouping },
    };

    let per_verse: Vec<(usize, Presence)> = verses
        .par_iter()
        .map(|&v| (v, terms.presence(searcher, v)))
        .collect();

    let mut hits = Vec::new();
    match unit {
        Unit::Partition(kind) => {
            let book = searcher.book();
            let mut current: Option<(usize, Presence)> = None;
            for (verse, presence) in per_verse {
                let Some(p) = book.partition_of(kind, verse) else {
                    continue;
                };
                match current.as_mut() {
                    Some((open, collected)) if *open == p => collected.absorb(presence),
                    _ => {
                        if let Some((done, collected)) = current.take() {
                            if terms.accepts(&collected) {
                                hits.push(Hit::with_phrases(unit, done, collected.phrases));
                            }
                        }
                        current = Some((p, presence));
                    }
                }
            }
            if let Some((done, collected)) = current {
                if terms.accepts(&collected) {
                    hits.push(Hit::with_phrases(unit, done, collected.phrases));
                }
            }
        }
        _ => {
            for (verse, presence) in per_verse {
                if terms.accepts(&presence) {
                    hits.push(Hit::with_phrases(unit, verse, presence.phrases));
                }
            }
        }
    }

    tracing::debug!(%unit, text = %query.text, hits = hits.len(), "word search");
    Ok(hits)
}
