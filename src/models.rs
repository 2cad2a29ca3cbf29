//! Data structures for the corpus, query results and session parameters.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use thiserror::Error;

use crate::simplify::TextMode;
use crate::stopmark::StopMark;

/// Practical upper bound on range-search window length (longest verse in words).
pub const MAX_RANGE_LENGTH: usize = 29;

/// A single letter of the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Letter {
    pub character: char,
    pub number: usize,
    pub number_in_chapter: usize,
    pub number_in_verse: usize,
    pub number_in_word: usize,
    pub frequency: usize,  // Identical characters in the book
    pub occurrence: usize, // 1-based rank among identical characters
    pub word: usize,       // Owning word index
}

/// A single word; letters are addressed by index into the book's letter table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub number: usize,
    pub number_in_chapter: usize,
    pub number_in_verse: usize,
    pub position: usize, // Char offset of the word inside its verse text
    pub root: Option<String>,
    pub stop_mark: StopMark,
    pub frequency: usize,
    pub occurrence: usize,
    pub verse: usize,
    pub letters: Range<usize>,
}

/// A verse; words are addressed by index into the book's word table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verse {
    pub number: usize,
    pub number_in_chapter: usize,
    pub chapter: usize, // Chapter index (0-based)
    pub text: String,     // Text in the book's mode
    pub raw_text: String, // Diacritic-bearing source text
    pub stop_mark: StopMark,
    pub prostration: Option<Prostration>,
    pub revelation_place: RevelationPlace,
    pub initialization: Option<Initialization>,
    pub words: Range<usize>,
}

/// Partition schemes over the verse sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PartitionKind {
    Chapter,
    Page,
    Station,
    Part,
    Group,
    Half,
    Quarter,
    Bowing,
}

impl PartitionKind {
    pub const ALL: [PartitionKind; 8] = [
        PartitionKind::Chapter,
        PartitionKind::Page,
        PartitionKind::Station,
        PartitionKind::Part,
        PartitionKind::Group,
        PartitionKind::Half,
        PartitionKind::Quarter,
        PartitionKind::Bowing,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PartitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for PartitionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        PartitionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.to_string().to_lowercase() == wanted)
            .ok_or_else(|| format!("unknown partition kind: {}", s))
    }
}

/// One entry of a partition scheme: an ordinal plus a contiguous run of verses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub kind: PartitionKind,
    pub number: usize,
    pub verses: Range<usize>,
}

/// Chapter-only attributes that the generic partition does not carry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterDetail {
    pub number: usize,
    pub name: String,
    pub revelation_place: RevelationPlace,
    pub revelation_order: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RevelationPlace {
    #[default]
    Makkah,
    Madinah,
}

impl FromStr for RevelationPlace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "makkah" | "mecca" | "makki" => Ok(RevelationPlace::Makkah),
            "madinah" | "medina" | "madani" => Ok(RevelationPlace::Madinah),
            other => Err(format!("unknown revelation place: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Prostration {
    Obligatory,
    Recommended,
}

impl FromStr for Prostration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "obligatory" => Ok(Prostration::Obligatory),
            "recommended" => Ok(Prostration::Recommended),
            other => Err(format!("unknown prostration kind: {}", other)),
        }
    }
}

/// Disconnected-letter openings of a chapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Initialization {
    /// The verse consists of the initial letters only
    Key,
    /// The verse opens with the initial letters and continues
    PartOfKey,
}

impl FromStr for Initialization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "key" => Ok(Initialization::Key),
            "partofkey" => Ok(Initialization::PartOfKey),
            other => Err(format!("unknown initialization kind: {}", other)),
        }
    }
}

/// Granularity a query operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Letter,
    Word,
    Verse,
    Sentence,
    Partition(PartitionKind),
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Partition(kind) => write!(f, "{}", kind),
            other => write!(f, "{:?}", other),
        }
    }
}

impl FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "letter" => Ok(Unit::Letter),
            "word" => Ok(Unit::Word),
            "verse" => Ok(Unit::Verse),
            "sentence" => Ok(Unit::Sentence),
            other => other.parse::<PartitionKind>().map(Unit::Partition),
        }
    }
}

/// Verse universe a query draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Scope {
    #[default]
    Book,
    Selection,
    Result,
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "book" => Ok(Scope::Book),
            "selection" => Ok(Scope::Selection),
            "result" => Ok(Scope::Result),
            other => Err(format!("unknown scope: {}", other)),
        }
    }
}

/// A matched piece of verse text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phrase {
    pub verse: usize,
    pub position: usize, // Char offset inside the verse text of `mode`
    pub text: String,
    pub mode: TextMode,
}

impl Phrase {
    pub fn end(&self) -> usize {
        self.position + self.text.chars().count()
    }
}

/// A sentence produced by the segmenter. Sentences may overlap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    pub words: Range<usize>,
    pub first_verse: usize,
    pub start_offset: usize, // Char offset of the first word in its verse
    pub last_verse: usize,
    pub end_offset: usize,   // Char offset just past the last word in its verse
    pub text: String,
}

/// One query result: a run of units plus the phrases that justified it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
    pub unit: Unit,
    pub range: Range<usize>,
    pub phrases: Vec<Phrase>,
}

impl Hit {
    pub fn single(unit: Unit, index: usize) -> Self {
        Hit {
            unit,
            range: index..index + 1,
            phrases: Vec::new(),
        }
    }

    pub fn with_phrases(unit: Unit, index: usize, phrases: Vec<Phrase>) -> Self {
        Hit {
            unit,
            range: index..index + 1,
            phrases,
        }
    }
}

// ============================================================================
// Corpus sources handed over by the loader
// ============================================================================

/// Reference to a verse by chapter and verse number (both 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseRef {
    pub chapter: usize,
    pub verse: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerseSource {
    pub text: String,
    pub stop_mark: StopMark,
    pub prostration: Option<Prostration>,
    pub initialization: Option<Initialization>,
    pub revelation_place: Option<RevelationPlace>, // Overrides the chapter's place
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChapterSource {
    pub number: usize,
    pub name: String,
    pub revelation_place: RevelationPlace,
    pub revelation_order: usize,
    pub verses: Vec<VerseSource>,
}

/// Start verses of each entry of one partition scheme, in order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSource {
    pub kind: PartitionKind,
    pub starts: Vec<VerseRef>,
}

/// Root annotation for one word (word number is 1-based inside its verse)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootAnnotation {
    pub verse: VerseRef,
    pub word: usize,
    pub root: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusSource {
    pub chapters: Vec<ChapterSource>,
    pub partitions: Vec<PartitionSource>,
    pub roots: Vec<RootAnnotation>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("Chapter {0} has no verses")]
    EmptyChapter(usize),
    #[error("Unknown verse reference {chapter}:{verse}")]
    UnknownVerse { chapter: usize, verse: usize },
    #[error("{kind} partitions must start at the first verse")]
    PartitionGap { kind: PartitionKind },
    #[error("{kind} partitions overlap or are out of order at entry {number}")]
    PartitionOverlap { kind: PartitionKind, number: usize },
    #[error("Root annotation for missing word {chapter}:{verse}:{word}")]
    UnknownWord {
        chapter: usize,
        verse: usize,
        word: usize,
    },
}

// ============================================================================
// Session parameters
// ============================================================================

/// Session parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParams {
    pub text_mode: TextMode,
    pub with_diacritics: bool,
    pub numerology_system: String,
    pub max_range_length: usize,
    pub similarity_threshold: f32,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            text_mode: TextMode::Simplified29,
            with_diacritics: false,
            numerology_system: "Simplified29_Alphabet_Primes".to_string(),
            max_range_length: MAX_RANGE_LENGTH,
            similarity_threshold: 0.66,
        }
    }
}

impl SessionParams {
    /// Load parameters from a JSON file; missing fields keep their defaults.
    pub fn from_json_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_parse() {
        assert_eq!("verse".parse::<Unit>(), Ok(Unit::Verse));
        assert_eq!("page".parse::<Unit>(), Ok(Unit::Partition(PartitionKind::Page)));
        assert_eq!("Bowing".parse::<Unit>(), Ok(Unit::Partition(PartitionKind::Bowing)));
        assert!("line".parse::<Unit>().is_err());
    }

    #[test]
    fn test_session_params_defaults_fill_missing_fields() {
        let params: SessionParams = serde_json::from_str(r#"{"max_range_length": 7}"#).unwrap();
        assert_eq!(params.max_range_length, 7);
        assert_eq!(params.text_mode, TextMode::Simplified29);
        assert!(!params.with_diacritics);
    }

    #[test]
    fn test_phrase_end_counts_chars() {
        let phrase = Phrase {
            verse: 0,
            position: 3,
            text: "الله".to_string(),
            mode: TextMode::Simplified29,
        };
        assert_eq!(phrase.end(), 7);
    }
}
