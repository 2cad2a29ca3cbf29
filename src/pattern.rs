//! Location- and wordness-constrained match patterns.
//!
//! Every (verse location, word location, wordness) combination maps to one of 48 precomputed
//! fragments. A fragment lists the token-edge alternatives a match may have at its head and
//! tail. Combinations whose constraints contradict each other have no alternatives and build a
//! pattern that never matches.
//!
//! Two matchers share the table. The word-delimited matcher checks token edges against the
//! whitespace that separates words and is used whenever word location or wordness is
//! constrained. The character-boundary matcher compiles the fragment into a regex with
//! `^`/`$`/`\b`/`\B` assertions and serves unconstrained queries.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::simplify::{is_letter, normalize_whitespace};

/// Where a match may sit inside a verse or a word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextLocation {
    #[default]
    Any,
    Start,
    Middle,
    End,
}

impl TextLocation {
    pub const ALL: [TextLocation; 4] = [
        TextLocation::Any,
        TextLocation::Start,
        TextLocation::Middle,
        TextLocation::End,
    ];
}

/// Whether a match must be a whole token, a strict part of one, or either
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Wordness {
    #[default]
    Any,
    PartOfWord,
    WholeWord,
}

impl Wordness {
    pub const ALL: [Wordness; 3] = [Wordness::Any, Wordness::PartOfWord, Wordness::WholeWord];
}

impl fmt::Display for TextLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for Wordness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for TextLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "any" => Ok(TextLocation::Any),
            "start" => Ok(TextLocation::Start),
            "middle" => Ok(TextLocation::Middle),
            "end" => Ok(TextLocation::End),
            other => Err(format!("unknown text location: {}", other)),
        }
    }
}

impl FromStr for Wordness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "any" => Ok(Wordness::Any),
            "partofword" | "part" => Ok(Wordness::PartOfWord),
            "wholeword" | "whole" => Ok(Wordness::WholeWord),
            other => Err(format!("unknown wordness: {}", other)),
        }
    }
}

/// Constraint on one end of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Free,
    /// At a token boundary
    Open,
    /// Inside a token
    Closed,
}

impl Edge {
    fn merge(self, other: Edge) -> Option<Edge> {
        match (self, other) {
            (Edge::Free, e) | (e, Edge::Free) => Some(e),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }

    fn admits(self, at_boundary: bool) -> bool {
        match self {
            Edge::Free => true,
            Edge::Open => at_boundary,
            Edge::Closed => !at_boundary,
        }
    }

    fn assertion(self) -> &'static str {
        match self {
            Edge::Free => "",
            Edge::Open => r"\b",
            Edge::Closed => r"\B",
        }
    }
}

/// One precomputed combination of the constraint space
#[derive(Debug, Clone)]
pub struct Fragment {
    pub name: String,
    verse: TextLocation,
    edges: Vec<(Edge, Edge)>,
}

impl Fragment {
    fn new(verse: TextLocation, word: TextLocation, wordness: Wordness) -> Self {
        use Edge::*;

        let word_edges: Vec<(Edge, Edge)> = match (wordness, word) {
            (Wordness::WholeWord, TextLocation::Middle) => vec![],
            (Wordness::WholeWord, _) => vec![(Open, Open)],
            (Wordness::PartOfWord, TextLocation::Any) => vec![(Closed, Free), (Free, Closed)],
            (Wordness::PartOfWord, TextLocation::Start) => vec![(Open, Closed)],
            (Wordness::PartOfWord, TextLocation::Middle) => vec![(Closed, Closed)],
            (Wordness::PartOfWord, TextLocation::End) => vec![(Closed, Open)],
            (Wordness::Any, TextLocation::Any) => vec![(Free, Free)],
            (Wordness::Any, TextLocation::Start) => vec![(Open, Free)],
            (Wordness::Any, TextLocation::Middle) => vec![(Closed, Closed)],
            (Wordness::Any, TextLocation::End) => vec![(Free, Open)],
        };

        // The verse start and end are token boundaries too
        let (verse_head, verse_tail) = match verse {
            TextLocation::Start => (Open, Free),
            TextLocation::End => (Free, Open),
            TextLocation::Any | TextLocation::Middle => (Free, Free),
        };

        let edges = word_edges
            .into_iter()
            .filter_map(|(head, tail)| Some((head.merge(verse_head)?, tail.merge(verse_tail)?)))
            .collect();

        Fragment {
            name: format!("{}Verse{}Word{}", verse, word, wordness),
            verse,
            edges,
        }
    }

    /// A fragment with no edge alternatives can never match.
    pub fn is_unreachable(&self) -> bool {
        self.edges.is_empty()
    }

    /// Regex source for the character-boundary matcher.
    pub fn character_regex(&self, escaped: &str) -> String {
        let body = self
            .edges
            .iter()
            .map(|(head, tail)| format!("{}{}{}", head.assertion(), escaped, tail.assertion()))
            .collect::<Vec<_>>()
            .join("|");
        let head = if self.verse == TextLocation::Start { "^" } else { "" };
        let tail = if self.verse == TextLocation::End { "$" } else { "" };
        format!("{}(?:{}){}", head, body, tail)
    }

    fn admits_verse(&self, at_start: bool, at_end: bool) -> bool {
        match self.verse {
            TextLocation::Any => true,
            TextLocation::Start => at_start,
            TextLocation::End => at_end,
            TextLocation::Middle => !at_start && !at_end,
        }
    }

    fn admits(&self, at_start: bool, at_end: bool, head_open: bool, tail_open: bool) -> bool {
        self.admits_verse(at_start, at_end)
            && self
                .edges
                .iter()
                .any(|(head, tail)| head.admits(head_open) && tail.admits(tail_open))
    }
}

static FRAGMENTS: Lazy<Vec<Fragment>> = Lazy::new(|| {
    let mut table = Vec::with_capacity(48);
    for verse in TextLocation::ALL {
        for word in TextLocation::ALL {
            for wordness in Wordness::ALL {
                table.push(Fragment::new(verse, word, wordness));
            }
        }
    }
    table
});

/// The precomputed fragment for a combination.
pub fn fragment(verse: TextLocation, word: TextLocation, wordness: Wordness) -> &'static Fragment {
    let index = (verse as usize) * 12 + (word as usize) * 3 + wordness as usize;
    &FRAGMENTS[index]
}

/// All 48 fragments in table order.
pub fn fragments() -> &'static [Fragment] {
    &FRAGMENTS
}

/// Compiled search pattern
#[derive(Debug, Clone)]
pub enum Pattern {
    /// Matches nothing
    Never,
    /// A single non-letter character, matched wherever it occurs
    Literal(String),
    Character {
        regex: Regex,
        verse: TextLocation,
    },
    Delimited {
        regex: Regex,
        fragment: &'static Fragment,
    },
}

/// Build a pattern for `text` under the given constraints.
pub fn build_pattern(
    text: &str,
    verse: TextLocation,
    word: TextLocation,
    wordness: Wordness,
) -> Pattern {
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return Pattern::Never;
    }

    let mut chars = text.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if !is_letter(c) {
            return Pattern::Literal(text);
        }
    }

    let fragment = fragment(verse, word, wordness);
    if fragment.is_unreachable() {
        return Pattern::Never;
    }

    let escaped = regex::escape(&text);
    let unconstrained = word == TextLocation::Any && wordness == Wordness::Any;
    let source = if unconstrained {
        fragment.character_regex(&escaped)
    } else {
        escaped
    };

    match Regex::new(&source) {
        Ok(regex) if unconstrained => Pattern::Character { regex, verse },
        Ok(regex) => Pattern::Delimited { regex, fragment },
        Err(e) => {
            tracing::warn!(pattern = %source, error = %e, "pattern failed to compile");
            Pattern::Never
        }
    }
}

impl Pattern {
    /// Source text of the pattern; a literal pattern is its own text.
    pub fn as_str(&self) -> &str {
        match self {
            Pattern::Never => "",
            Pattern::Literal(text) => text,
            Pattern::Character { regex, .. } | Pattern::Delimited { regex, .. } => regex.as_str(),
        }
    }

    pub fn is_never(&self) -> bool {
        matches!(self, Pattern::Never)
    }

    /// Char ranges of all non-overlapping matches in `text`, left to right.
    pub fn find_all(&self, text: &str) -> Vec<Range<usize>> {
        match self {
            Pattern::Never => Vec::new(),
            Pattern::Literal(literal) => text
                .match_indices(literal.as_str())
                .map(|(s, m)| char_range(text, s, s + m.len()))
                .collect(),
            Pattern::Character { regex, verse } => scan(regex, text, |s, e| match verse {
                TextLocation::Middle => s > 0 && e < text.len(),
                _ => true,
            }),
            Pattern::Delimited { regex, fragment } => scan(regex, text, |s, e| {
                let head_open = s == 0 || text[..s].chars().next_back().is_some_and(char::is_whitespace);
                let tail_open =
                    e == text.len() || text[e..].chars().next().is_some_and(char::is_whitespace);
                fragment.admits(s == 0, e == text.len(), head_open, tail_open)
            }),
        }
    }

    pub fn count(&self, text: &str) -> usize {
        self.find_all(text).len()
    }
}

/// Walk regex candidates; an accepted match resumes after itself, a rejected one a char later.
fn scan(regex: &Regex, text: &str, accept: impl Fn(usize, usize) -> bool) -> Vec<Range<usize>> {
    let mut found = Vec::new();
    let mut at = 0;

    while at <= text.len() {
        let Some(m) = regex.find_at(text, at) else {
            break;
        };
        if m.start() < m.end() && accept(m.start(), m.end()) {
            found.push(char_range(text, m.start(), m.end()));
            at = m.end();
        } else {
            at = m.start() + text[m.start()..].chars().next().map_or(1, char::len_utf8);
        }
    }

    found
}

fn char_range(text: &str, start: usize, end: usize) -> Range<usize> {
    let first = text[..start].chars().count();
    first..first + text[start..end].chars().count()
}
