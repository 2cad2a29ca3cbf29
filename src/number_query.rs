//! Numeric queries over any granularity.
//!
//! A `NumberQuery` is a list of criteria, each pairing a field with a test. A field that is not
//! filtered simply has no criterion. Every criterion must pass for a unit (or window of units)
//! to match.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use crate::book::Book;
use crate::error::EngineError;
use crate::models::{Hit, PartitionKind, Sentence, Unit};
use crate::numbers::NumberKind;
use crate::numerology::NumerologySystem;

/// Comparison operator of a test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    /// `value % target == remainder`
    DivisibleBy { remainder: i64 },
    IndivisibleBy,
    /// Equality against the sum of positional ordinals instead of the count
    EqualSum,
}

impl Comparison {
    pub fn holds(self, value: i64, target: i64) -> bool {
        match self {
            Comparison::Equal | Comparison::EqualSum => value == target,
            Comparison::NotEqual => value != target,
            Comparison::LessThan => value < target,
            Comparison::LessOrEqual => value <= target,
            Comparison::GreaterThan => value > target,
            Comparison::GreaterOrEqual => value >= target,
            Comparison::DivisibleBy { remainder } => {
                target != 0 && value.rem_euclid(target) == remainder
            }
            Comparison::IndivisibleBy => target != 0 && value.rem_euclid(target) != 0,
        }
    }

    pub fn is_sum(self) -> bool {
        matches!(self, Comparison::EqualSum)
    }
}

/// How a field value is judged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    /// Compare against a literal. Zero disables the test; a negative target on `Number`
    /// counts back from the end of the containing collection.
    Literal { op: Comparison, target: i64 },
    /// Compare against the unit's own number
    OwnNumber { op: Comparison },
    Classify(NumberKind),
}

impl Test {
    pub fn literal(op: Comparison, target: i64) -> Self {
        Test::Literal { op, target }
    }

    pub fn equal(target: i64) -> Self {
        Test::Literal {
            op: Comparison::Equal,
            target,
        }
    }

    fn comparison(self) -> Option<Comparison> {
        match self {
            Test::Literal { op, .. } | Test::OwnNumber { op } => Some(op),
            Test::Classify(_) => None,
        }
    }

    fn is_sum(self) -> bool {
        self.comparison().is_some_and(Comparison::is_sum)
    }

    /// Judge a free-standing value, as used by multiplicity filters.
    pub fn admits(self, value: i64) -> bool {
        match self {
            Test::Literal { target: 0, .. } => true,
            Test::Literal { target, .. } if target < 0 => false,
            Test::Literal { op, target } => op.holds(value, target),
            Test::OwnNumber { .. } => false,
            Test::Classify(kind) => kind.matches(value),
        }
    }
}

/// Split a leading operator off a criterion string.
fn split_operator(s: &str) -> Option<(&'static str, &str)> {
    const OPERATORS: [&str; 9] = ["sum=", "!=", "<=", ">=", "!%", "%", "<", ">", "="];
    OPERATORS
        .iter()
        .find_map(|op| s.strip_prefix(op).map(|rest| (*op, rest)))
}

fn comparison_for(op: &str, remainder: i64) -> Comparison {
    match op {
        "sum=" => Comparison::EqualSum,
        "!=" => Comparison::NotEqual,
        "<=" => Comparison::LessOrEqual,
        ">=" => Comparison::GreaterOrEqual,
        "!%" => Comparison::IndivisibleBy,
        "%" => Comparison::DivisibleBy { remainder },
        "<" => Comparison::LessThan,
        ">" => Comparison::GreaterThan,
        _ => Comparison::Equal,
    }
}

impl FromStr for Test {
    type Err = String;

    /// Accepts `7`, `=7`, `!=7`, `<7`, `<=7`, `>7`, `>=7`, `%7`, `%7r2`, `!%7`, `sum=6`,
    /// `own`, `own>` and number kind names such as `prime`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || format!("invalid criterion: {}", s);

        if let Some(rest) = s.strip_prefix("own") {
            if rest.is_empty() {
                return Ok(Test::OwnNumber {
                    op: Comparison::Equal,
                });
            }
            return match split_operator(rest) {
                Some((op, "")) => Ok(Test::OwnNumber {
                    op: comparison_for(op, 0),
                }),
                _ => Err(invalid()),
            };
        }

        if let Some((op, rest)) = split_operator(s) {
            let (number, remainder) = match (op, rest.split_once('r')) {
                ("%", Some((number, remainder))) => {
                    (number, remainder.parse::<i64>().map_err(|_| invalid())?)
                }
                _ => (rest, 0),
            };
            let target = number.parse::<i64>().map_err(|_| invalid())?;
            return Ok(Test::literal(comparison_for(op, remainder), target));
        }

        if let Ok(target) = s.parse::<i64>() {
            return Ok(Test::equal(target));
        }

        s.parse::<NumberKind>().map(Test::Classify).map_err(|_| invalid())
    }
}

/// Field a criterion reads from a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Number,
    /// Units of the queried granularity in a window
    UnitCount,
    ChapterCount,
    VerseCount,
    WordCount,
    LetterCount,
    UniqueLetterCount,
    Value,
    Frequency,
    Occurrence,
}

impl Field {
    /// Fields whose aggregate can be a sum of positional ordinals.
    pub fn supports_sum(self) -> bool {
        matches!(
            self,
            Field::Number
                | Field::ChapterCount
                | Field::VerseCount
                | Field::WordCount
                | Field::LetterCount
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "number" => Ok(Field::Number),
            "units" | "unitcount" => Ok(Field::UnitCount),
            "chapters" | "chaptercount" => Ok(Field::ChapterCount),
            "verses" | "versecount" => Ok(Field::VerseCount),
            "words" | "wordcount" => Ok(Field::WordCount),
            "letters" | "lettercount" => Ok(Field::LetterCount),
            "unique" | "uniqueletters" | "uniquelettercount" => Ok(Field::UniqueLetterCount),
            "value" => Ok(Field::Value),
            "frequency" => Ok(Field::Frequency),
            "occurrence" => Ok(Field::Occurrence),
            other => Err(format!("unknown field: {}", other)),
        }
    }
}

/// Which ordinal `Number` refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberScope {
    #[default]
    Number,
    NumberInChapter,
    NumberInVerse,
    NumberInWord,
}

impl FromStr for NumberScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "number" | "book" => Ok(NumberScope::Number),
            "numberinchapter" | "chapter" => Ok(NumberScope::NumberInChapter),
            "numberinverse" | "verse" => Ok(NumberScope::NumberInVerse),
            "numberinword" | "word" => Ok(NumberScope::NumberInWord),
            other => Err(format!("unknown number scope: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Criterion {
    pub field: Field,
    pub test: Test,
}

/// Conjunction of criteria
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumberQuery {
    pub scope: NumberScope,
    pub criteria: Vec<Criterion>,
}

impl NumberQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_scope(mut self, scope: NumberScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with(mut self, field: Field, test: Test) -> Self {
        self.criteria.push(Criterion { field, test });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Reject criteria that cannot be evaluated.
    pub fn validate(&self) -> Result<(), EngineError> {
        for criterion in &self.criteria {
            if criterion.test.is_sum() && !criterion.field.supports_sum() {
                return Err(EngineError::InvalidQuery(format!(
                    "{} cannot be summed",
                    criterion.field
                )));
            }
        }
        Ok(())
    }

    /// Requested window length: a literal `=n` on `UnitCount` or on the count field of `unit`.
    pub fn window_length(&self, unit: Unit) -> Option<usize> {
        let own = match unit {
            Unit::Letter => Some(Field::LetterCount),
            Unit::Word => Some(Field::WordCount),
            Unit::Verse => Some(Field::VerseCount),
            Unit::Partition(PartitionKind::Chapter) => Some(Field::ChapterCount),
            Unit::Sentence | Unit::Partition(_) => None,
        };
        self.criteria.iter().find_map(|c| match c.test {
            Test::Literal {
                op: Comparison::Equal,
                target,
            } if (c.field == Field::UnitCount || Some(c.field) == own) && target > 0 => {
                Some(target as usize)
            }
            _ => None,
        })
    }
}

/// Letter, word and verse runs covered by a subject
#[derive(Debug, Clone)]
struct Span {
    verses: Range<usize>,
    words: Range<usize>,
    letters: Range<usize>,
}

/// Evaluates number queries against units of one book
pub struct Evaluator<'a> {
    book: &'a Book,
    system: Option<&'a NumerologySystem>,
    sentences: &'a [Sentence],
}

impl<'a> Evaluator<'a> {
    pub fn new(book: &'a Book, system: Option<&'a NumerologySystem>) -> Self {
        Evaluator {
            book,
            system,
            sentences: &[],
        }
    }

    /// Sentence list that `Unit::Sentence` indices refer to.
    pub fn with_sentences(mut self, sentences: &'a [Sentence]) -> Self {
        self.sentences = sentences;
        self
    }

    pub fn book(&self) -> &'a Book {
        self.book
    }

    pub fn unit_count(&self, unit: Unit) -> usize {
        match unit {
            Unit::Sentence => self.sentences.len(),
            other => self.book.unit_count(other),
        }
    }

    /// True when the run of units `range` passes every criterion.
    pub fn compare(&self, query: &NumberQuery, unit: Unit, range: Range<usize>) -> bool {
        if range.is_empty() || range.end > self.unit_count(unit) {
            return false;
        }
        let span = self.span(unit, &range);
        query
            .criteria
            .iter()
            .all(|criterion| self.check(query.scope, criterion, unit, &range, &span))
    }

    fn check(
        &self,
        scope: NumberScope,
        criterion: &Criterion,
        unit: Unit,
        range: &Range<usize>,
        span: &Span,
    ) -> bool {
        if let Test::Literal { target: 0, .. } = criterion.test {
            return true;
        }
        let sum = criterion.test.is_sum();
        let value = match self.field_value(criterion.field, scope, unit, range, span, sum) {
            Some(value) => value,
            None => return false,
        };

        match criterion.test {
            Test::Literal { op, target } if target < 0 => {
                if criterion.field != Field::Number {
                    return false;
                }
                let Some(size) = self.container_size(scope, unit, range.start) else {
                    return false;
                };
                let resolved = size as i64 + target + 1;
                resolved > 0 && op.holds(value, resolved)
            }
            Test::Literal { op, target } => op.holds(value, target),
            Test::OwnNumber { op } => self
                .ordinal(scope, unit, range.start)
                .is_some_and(|own| op.holds(value, own)),
            Test::Classify(kind) => kind.matches(value),
        }
    }

    fn span(&self, unit: Unit, range: &Range<usize>) -> Span {
        let book = self.book;
        match unit {
            Unit::Letter => {
                let words = book.letters[range.start].word..book.letters[range.end - 1].word + 1;
                let verses = book.words[words.start].verse..book.words[words.end - 1].verse + 1;
                Span {
                    verses,
                    words,
                    letters: range.clone(),
                }
            }
            Unit::Word => Span {
                verses: book.words[range.start].verse..book.words[range.end - 1].verse + 1,
                words: range.clone(),
                letters: book.letters_of_words(range.clone()),
            },
            Unit::Verse => self.verse_span(range.clone()),
            Unit::Partition(kind) => {
                let table = book.partitions(kind);
                self.verse_span(table[range.start].verses.start..table[range.end - 1].verses.end)
            }
            Unit::Sentence => {
                let members = &self.sentences[range.clone()];
                let first = members.iter().map(|s| s.words.start).min().unwrap_or(0);
                let last = members.iter().map(|s| s.words.end).max().unwrap_or(0);
                let words = first..last;
                Span {
                    verses: book.words[first].verse..book.words[last - 1].verse + 1,
                    letters: book.letters_of_words(words.clone()),
                    words,
                }
            }
        }
    }

    fn verse_span(&self, verses: Range<usize>) -> Span {
        let words = self.book.words_of_verses(verses.clone());
        Span {
            letters: self.book.letters_of_words(words.clone()),
            words,
            verses,
        }
    }

    fn field_value(
        &self,
        field: Field,
        scope: NumberScope,
        unit: Unit,
        range: &Range<usize>,
        span: &Span,
        sum: bool,
    ) -> Option<i64> {
        let book = self.book;
        let value = match field {
            Field::Number if sum => range
                .clone()
                .map(|i| self.ordinal(scope, unit, i))
                .sum::<Option<i64>>()?,
            Field::Number => self.ordinal(scope, unit, range.start)?,
            Field::UnitCount => range.len() as i64,
            Field::ChapterCount => {
                let first = book.verses[span.verses.start].chapter;
                let last = book.verses[span.verses.end - 1].chapter;
                if sum {
                    book.chapters[first..=last].iter().map(|c| c.number as i64).sum()
                } else {
                    (last - first + 1) as i64
                }
            }
            Field::VerseCount if sum => book.verses[span.verses.clone()]
                .iter()
                .map(|v| v.number_in_chapter as i64)
                .sum(),
            Field::VerseCount => span.verses.len() as i64,
            Field::WordCount if sum => book.words[span.words.clone()]
                .iter()
                .map(|w| w.number_in_verse as i64)
                .sum(),
            Field::WordCount => span.words.len() as i64,
            Field::LetterCount if sum => book.letters[span.letters.clone()]
                .iter()
                .map(|l| l.number_in_word as i64)
                .sum(),
            Field::LetterCount => span.letters.len() as i64,
            Field::UniqueLetterCount => {
                let mut unique: Vec<char> =
                    book.letters[span.letters.clone()].iter().map(|l| l.character).collect();
                unique.sort_unstable();
                unique.dedup();
                unique.len() as i64
            }
            Field::Value => {
                let system = self.system?;
                book.letters[span.letters.clone()]
                    .iter()
                    .map(|l| system.letter_value(l.character))
                    .sum()
            }
            Field::Frequency | Field::Occurrence => {
                if range.len() != 1 {
                    return None;
                }
                let (frequency, occurrence) = match unit {
                    Unit::Letter => {
                        let letter = &book.letters[range.start];
                        (letter.frequency, letter.occurrence)
                    }
                    Unit::Word => {
                        let word = &book.words[range.start];
                        (word.frequency, word.occurrence)
                    }
                    _ => return None,
                };
                if field == Field::Frequency {
                    frequency as i64
                } else {
                    occurrence as i64
                }
            }
        };
        Some(value)
    }

    /// Ordinal of unit `index` at `scope`; `None` where the scope does not apply to the unit.
    fn ordinal(&self, scope: NumberScope, unit: Unit, index: usize) -> Option<i64> {
        let book = self.book;
        let n = match (unit, scope) {
            (Unit::Letter, NumberScope::Number) => book.letters[index].number,
            (Unit::Letter, NumberScope::NumberInChapter) => book.letters[index].number_in_chapter,
            (Unit::Letter, NumberScope::NumberInVerse) => book.letters[index].number_in_verse,
            (Unit::Letter, NumberScope::NumberInWord) => book.letters[index].number_in_word,
            (Unit::Word, NumberScope::Number) => book.words[index].number,
            (Unit::Word, NumberScope::NumberInChapter) => book.words[index].number_in_chapter,
            (Unit::Word, NumberScope::NumberInVerse) => book.words[index].number_in_verse,
            (Unit::Verse, NumberScope::Number) => book.verses[index].number,
            (Unit::Verse, NumberScope::NumberInChapter) => book.verses[index].number_in_chapter,
            (Unit::Partition(kind), NumberScope::Number) => book.partitions(kind)[index].number,
            (Unit::Sentence, NumberScope::Number) => index + 1,
            _ => return None,
        };
        Some(n as i64)
    }

    /// Size of the collection an ordinal at `scope` counts within.
    fn container_size(&self, scope: NumberScope, unit: Unit, index: usize) -> Option<usize> {
        let book = self.book;
        let size = match (unit, scope) {
            (_, NumberScope::Number) => self.unit_count(unit),
            (Unit::Letter, NumberScope::NumberInChapter) => {
                book.chapter_letter_count(book.words[book.letters[index].word].verse)
            }
            (Unit::Letter, NumberScope::NumberInVerse) => {
                let verse = book.words[book.letters[index].word].verse;
                book.letters_of_verses(verse..verse + 1).len()
            }
            (Unit::Letter, NumberScope::NumberInWord) => {
                book.words[book.letters[index].word].letters.len()
            }
            (Unit::Word, NumberScope::NumberInChapter) => {
                book.chapter_word_count(book.words[index].verse)
            }
            (Unit::Word, NumberScope::NumberInVerse) => {
                book.verses[book.words[index].verse].words.len()
            }
            (Unit::Verse, NumberScope::NumberInChapter) => book.chapter_verse_count(index),
            _ => return None,
        };
        Some(size)
    }
}

/// Units among `candidates` that satisfy `query` one at a time.
pub fn find_units(
    evaluator: &Evaluator<'_>,
    query: &NumberQuery,
    unit: Unit,
    candidates: &[usize],
) -> Vec<Hit> {
    candidates
        .iter()
        .copied()
        .filter(|&i| evaluator.compare(query, unit, i..i + 1))
        .map(|i| Hit::single(unit, i))
        .collect()
}

/// Constraint on how many matches a unit contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Multiplicity {
    /// No matches at all
    None,
    /// At least one match
    #[default]
    Any,
    Exactly(usize),
    /// At least one match, with the count passing a test
    Matching(Test),
}

impl Multiplicity {
    pub fn admits(self, count: usize) -> bool {
        match self {
            Multiplicity::None => count == 0,
            Multiplicity::Any => count > 0,
            Multiplicity::Exactly(n) => count == n,
            Multiplicity::Matching(test) => count > 0 && test.admits(count as i64),
        }
    }

    /// Units without matches can only pass these filters.
    pub fn admits_zero(self) -> bool {
        self.admits(0)
    }
}

impl FromStr for Multiplicity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "0" => Ok(Multiplicity::None),
            "any" | "*" => Ok(Multiplicity::Any),
            other => match other.parse::<usize>() {
                Ok(n) => Ok(Multiplicity::Exactly(n)),
                Err(_) => other.parse::<Test>().map(Multiplicity::Matching),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartitionKind;
    use crate::simplify::TextMode;
    use crate::test_support::{book_of, sample_book};

    fn hits(evaluator: &Evaluator<'_>, query: &NumberQuery, unit: Unit) -> Vec<usize> {
        let all: Vec<usize> = (0..evaluator.unit_count(unit)).collect();
        find_units(evaluator, query, unit, &all)
            .into_iter()
            .map(|h| h.range.start)
            .collect()
    }

    #[test]
    fn test_sum_compares_against_ordinal_total() {
        let book = book_of(&[&["ا ب ت"]], TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);

        let count = NumberQuery::new().with(Field::WordCount, Test::equal(3));
        assert!(evaluator.compare(&count, Unit::Verse, 0..1));

        let sum = NumberQuery::new().with(Field::WordCount, Test::literal(Comparison::EqualSum, 6));
        assert!(evaluator.compare(&sum, Unit::Verse, 0..1));

        let sum_as_count =
            NumberQuery::new().with(Field::WordCount, Test::literal(Comparison::EqualSum, 3));
        assert!(!evaluator.compare(&sum_as_count, Unit::Verse, 0..1));
    }

    #[test]
    fn test_relative_number_in_chapter() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let last_chapter: Vec<usize> = book.partitions(PartitionKind::Chapter)[2].verses.clone().collect();

        let last = NumberQuery::new()
            .in_scope(NumberScope::NumberInChapter)
            .with(Field::Number, Test::equal(-1));
        let found: Vec<usize> = find_units(&evaluator, &last, Unit::Verse, &last_chapter)
            .into_iter()
            .map(|h| h.range.start)
            .collect();
        assert_eq!(found, vec![*last_chapter.last().unwrap()]);

        let beyond = NumberQuery::new()
            .in_scope(NumberScope::NumberInChapter)
            .with(Field::Number, Test::equal(-(last_chapter.len() as i64 + 1)));
        assert!(find_units(&evaluator, &beyond, Unit::Verse, &last_chapter).is_empty());
    }

    #[test]
    fn test_relative_number_in_book() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let query = NumberQuery::new().with(Field::Number, Test::equal(-1));
        assert_eq!(hits(&evaluator, &query, Unit::Word), vec![book.words.len() - 1]);
    }

    #[test]
    fn test_negative_target_on_count_fails() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let query = NumberQuery::new().with(Field::WordCount, Test::equal(-1));
        assert!(hits(&evaluator, &query, Unit::Verse).is_empty());
    }

    #[test]
    fn test_zero_target_does_not_filter() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let query = NumberQuery::new().with(Field::LetterCount, Test::literal(Comparison::LessThan, 0));
        assert_eq!(hits(&evaluator, &query, Unit::Verse).len(), book.verses.len());
    }

    #[test]
    fn test_zero_target_on_missing_field_does_not_filter() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);

        let frequency = NumberQuery::new().with(Field::Frequency, Test::equal(0));
        assert_eq!(hits(&evaluator, &frequency, Unit::Verse).len(), book.verses.len());

        let value = NumberQuery::new()
            .with(Field::Value, Test::equal(0))
            .with(Field::WordCount, Test::equal(2));
        assert_eq!(hits(&evaluator, &value, Unit::Verse), vec![2]);

        let occurrence = NumberQuery::new().with(Field::Occurrence, Test::equal(0));
        let chapter = Unit::Partition(PartitionKind::Chapter);
        assert!(evaluator.compare(&occurrence, chapter, 0..2));
    }

    #[test]
    fn test_window_length_for_every_partition() {
        let query = NumberQuery::new()
            .with(Field::UnitCount, Test::equal(3))
            .with(Field::WordCount, Test::equal(9));
        for kind in PartitionKind::ALL {
            assert_eq!(query.window_length(Unit::Partition(kind)), Some(3));
        }
        assert_eq!(query.window_length(Unit::Sentence), Some(3));

        let words = NumberQuery::new().with(Field::WordCount, Test::equal(9));
        assert_eq!(words.window_length(Unit::Word), Some(9));
        assert_eq!(words.window_length(Unit::Verse), None);

        let unset = NumberQuery::new().with(Field::VerseCount, Test::equal(2));
        assert_eq!(unset.window_length(Unit::Partition(PartitionKind::Page)), None);
    }

    #[test]
    fn test_unit_count_is_window_size() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let query = NumberQuery::new().with(Field::UnitCount, Test::equal(2));
        let bowing = Unit::Partition(PartitionKind::Bowing);
        assert!(evaluator.compare(&query, bowing, 1..3));
        assert!(!evaluator.compare(&query, bowing, 0..1));
        assert_eq!("units".parse::<Field>(), Ok(Field::UnitCount));
    }

    #[test]
    fn test_classify_verse_numbers() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let query = NumberQuery::new().with(Field::Number, Test::Classify(NumberKind::Prime));
        assert_eq!(hits(&evaluator, &query, Unit::Verse), vec![1, 2, 4, 6]);
    }

    #[test]
    fn test_own_number_in_chapter() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let query = NumberQuery::new()
            .in_scope(NumberScope::NumberInChapter)
            .with(Field::WordCount, Test::OwnNumber { op: Comparison::Equal });
        // Only the one-word opening verse of chapter two has as many words as its number
        assert_eq!(hits(&evaluator, &query, Unit::Verse), vec![3]);
    }

    #[test]
    fn test_value_needs_system() {
        let book = sample_book(TextMode::Simplified29);
        let abjad = NumerologySystem::abjad();
        let query = NumberQuery::new().with(Field::Value, Test::equal(102));

        let with_system = Evaluator::new(&book, Some(&abjad));
        assert!(hits(&with_system, &query, Unit::Word).contains(&0));

        let without = Evaluator::new(&book, None);
        assert!(hits(&without, &query, Unit::Word).is_empty());
    }

    #[test]
    fn test_frequency_only_on_letters_and_words() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let query = NumberQuery::new().with(Field::Frequency, Test::literal(Comparison::GreaterThan, 1));
        assert!(hits(&evaluator, &query, Unit::Verse).is_empty());
        // الرحمن appears twice in chapter one
        assert!(hits(&evaluator, &query, Unit::Word).contains(&2));
    }

    #[test]
    fn test_window_aggregates() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);

        let words = NumberQuery::new().with(Field::WordCount, Test::equal(10));
        assert!(evaluator.compare(&words, Unit::Verse, 0..3));

        let first = NumberQuery::new().with(Field::Number, Test::equal(1));
        assert!(evaluator.compare(&first, Unit::Verse, 0..3));

        let summed = NumberQuery::new().with(Field::Number, Test::literal(Comparison::EqualSum, 6));
        assert!(evaluator.compare(&summed, Unit::Verse, 0..3));

        let chapters = NumberQuery::new().with(Field::ChapterCount, Test::equal(2));
        assert!(evaluator.compare(&chapters, Unit::Verse, 2..4));
    }

    #[test]
    fn test_number_scope_not_applicable_fails() {
        let book = sample_book(TextMode::Simplified29);
        let evaluator = Evaluator::new(&book, None);
        let query = NumberQuery::new()
            .in_scope(NumberScope::NumberInWord)
            .with(Field::Number, Test::equal(1));
        assert!(hits(&evaluator, &query, Unit::Verse).is_empty());
    }

    #[test]
    fn test_validate_rejects_sum_on_value() {
        let query = NumberQuery::new().with(Field::Value, Test::literal(Comparison::EqualSum, 9));
        assert!(matches!(query.validate(), Err(EngineError::InvalidQuery(_))));
        let ok = NumberQuery::new().with(Field::LetterCount, Test::literal(Comparison::EqualSum, 9));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_window_length() {
        let query = NumberQuery::new()
            .with(Field::Value, Test::equal(7))
            .with(Field::VerseCount, Test::equal(3));
        assert_eq!(query.window_length(Unit::Verse), Some(3));
        assert_eq!(query.window_length(Unit::Word), None);
    }

    #[test]
    fn test_parse_tests() {
        assert_eq!("7".parse::<Test>(), Ok(Test::equal(7)));
        assert_eq!("=-1".parse::<Test>(), Ok(Test::equal(-1)));
        assert_eq!("!=7".parse::<Test>(), Ok(Test::literal(Comparison::NotEqual, 7)));
        assert_eq!("<=7".parse::<Test>(), Ok(Test::literal(Comparison::LessOrEqual, 7)));
        assert_eq!(
            "%7r2".parse::<Test>(),
            Ok(Test::literal(Comparison::DivisibleBy { remainder: 2 }, 7))
        );
        assert_eq!("!%7".parse::<Test>(), Ok(Test::literal(Comparison::IndivisibleBy, 7)));
        assert_eq!("sum=6".parse::<Test>(), Ok(Test::literal(Comparison::EqualSum, 6)));
        assert_eq!("own".parse::<Test>(), Ok(Test::OwnNumber { op: Comparison::Equal }));
        assert_eq!("own>".parse::<Test>(), Ok(Test::OwnNumber { op: Comparison::GreaterThan }));
        assert_eq!("additive-prime".parse::<Test>(), Ok(Test::Classify(NumberKind::AdditivePrime)));
        assert!("own>3".parse::<Test>().is_err());
        assert!("<x".parse::<Test>().is_err());
    }

    #[test]
    fn test_divisibility() {
        assert!(Comparison::DivisibleBy { remainder: 0 }.holds(14, 7));
        assert!(Comparison::DivisibleBy { remainder: 2 }.holds(16, 7));
        assert!(Comparison::IndivisibleBy.holds(15, 7));
        assert!(!Comparison::IndivisibleBy.holds(14, 7));
    }

    #[test]
    fn test_multiplicity() {
        assert!(Multiplicity::None.admits(0));
        assert!(!Multiplicity::Any.admits(0));
        assert!(Multiplicity::Exactly(2).admits(2));
        let odd = Multiplicity::Matching(Test::Classify(NumberKind::Odd));
        assert!(odd.admits(3));
        assert!(!odd.admits(4));
        assert_eq!("*".parse::<Multiplicity>(), Ok(Multiplicity::Any));
        assert_eq!("3".parse::<Multiplicity>(), Ok(Multiplicity::Exactly(3)));
        assert_eq!(
            "%3".parse::<Multiplicity>(),
            Ok(Multiplicity::Matching(Test::literal(Comparison::DivisibleBy { remainder: 0 }, 3)))
        );
    }
}
