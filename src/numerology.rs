//! Letter value systems.
//!
//! A system is an ordered letter -> value table. Besides the traditional Abjad table,
//! systems are synthesised from any text by choosing how letters are ordered and which
//! number sequence assigns their values.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::book::Book;
use crate::numbers;
use crate::simplify::{is_letter, TextMode, ALPHABET_29};

/// How letters are ordered before values are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LetterOrder {
    Alphabet,
    Appearance,
    FrequencyDescending,
    FrequencyAscending,
}

/// Number sequence whose n-th term becomes the value of the n-th letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueSequence {
    Linear,
    Primes,
    AdditivePrimes,
    NonAdditivePrimes,
    Composites,
    AdditiveComposites,
    NonAdditiveComposites,
    /// Raw observed letter frequency
    Frequency,
}

macro_rules! name_enum {
    ($ty:ty, $($variant:ident => $name:literal),+ $(,)?) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self { $(Self::$variant => $name),+ };
                f.write_str(name)
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = s.trim().to_lowercase();
                $(if wanted == $name.to_lowercase() { return Ok(Self::$variant); })+
                Err(format!("unknown {}: {}", stringify!($ty), s))
            }
        }
    };
}

name_enum!(LetterOrder,
    Alphabet => "Alphabet",
    Appearance => "Appearance",
    FrequencyDescending => "FrequencyDsc",
    FrequencyAscending => "FrequencyAsc",
);

name_enum!(ValueSequence,
    Linear => "Linear",
    Primes => "Primes",
    AdditivePrimes => "AdditivePrimes",
    NonAdditivePrimes => "NonAdditivePrimes",
    Composites => "Composites",
    AdditiveComposites => "AdditiveComposites",
    NonAdditiveComposites => "NonAdditiveComposites",
    Frequency => "Frequency",
);

/// Ordered letter -> value mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumerologySystem {
    pub name: String,
    entries: Vec<(char, i64)>,
    #[serde(skip)]
    lookup: HashMap<char, i64>,
}

impl NumerologySystem {
    pub fn new(name: impl Into<String>, entries: Vec<(char, i64)>) -> Self {
        let lookup = entries.iter().copied().collect();
        NumerologySystem {
            name: name.into(),
            entries,
            lookup,
        }
    }

    /// Traditional Abjad (gematria) values.
    pub fn abjad() -> Self {
        const ABJAD: [(char, i64); 28] = [
            ('ا', 1), ('ب', 2), ('ج', 3), ('د', 4), ('ه', 5), ('و', 6), ('ز', 7),
            ('ح', 8), ('ط', 9), ('ي', 10), ('ك', 20), ('ل', 30), ('م', 40), ('ن', 50),
            ('س', 60), ('ع', 70), ('ف', 80), ('ص', 90), ('ق', 100), ('ر', 200),
            ('ش', 300), ('ت', 400), ('ث', 500), ('خ', 600), ('ذ', 700), ('ض', 800),
            ('ظ', 900), ('غ', 1000),
        ];
        NumerologySystem::new("Abjad", ABJAD.to_vec())
    }

    /// Build a table from the letters of `text`.
    pub fn synthesize(
        mode: TextMode,
        text: &str,
        order: LetterOrder,
        sequence: ValueSequence,
    ) -> Self {
        let mut counts: HashMap<char, i64> = HashMap::new();
        let mut appearance: Vec<char> = Vec::new();
        for c in text.chars().filter(|&c| is_letter(c)) {
            let count = counts.entry(c).or_insert(0);
            if *count == 0 {
                appearance.push(c);
            }
            *count += 1;
        }

        let alphabet_rank = |c: char| -> (usize, u32) {
            match ALPHABET_29.chars().position(|a| a == c) {
                Some(i) => (i, 0),
                None => (usize::MAX, c as u32),
            }
        };

        let mut letters = appearance.clone();
        match order {
            LetterOrder::Alphabet => letters.sort_by_key(|&c| alphabet_rank(c)),
            LetterOrder::Appearance => {}
            LetterOrder::FrequencyDescending => {
                letters.sort_by_key(|&c| (std::cmp::Reverse(counts[&c]), alphabet_rank(c)))
            }
            LetterOrder::FrequencyAscending => {
                letters.sort_by_key(|&c| (counts[&c], alphabet_rank(c)))
            }
        }

        let n = letters.len();
        let values: Vec<i64> = match sequence {
            ValueSequence::Linear => (1..=n as i64).collect(),
            ValueSequence::Primes => numbers::primes(n),
            ValueSequence::AdditivePrimes => numbers::additive_primes(n),
            ValueSequence::NonAdditivePrimes => numbers::non_additive_primes(n),
            ValueSequence::Composites => numbers::composites(n),
            ValueSequence::AdditiveComposites => numbers::additive_composites(n),
            ValueSequence::NonAdditiveComposites => numbers::non_additive_composites(n),
            ValueSequence::Frequency => letters.iter().map(|c| counts[c]).collect(),
        };

        let entries = letters.into_iter().zip(values).collect();
        NumerologySystem::new(system_name(mode, order, sequence), entries)
    }

    /// Value of a single letter; letters outside the table are worth nothing.
    pub fn letter_value(&self, c: char) -> i64 {
        self.lookup.get(&c).copied().unwrap_or(0)
    }

    /// Sum of the letter values of `text`.
    pub fn text_value(&self, text: &str) -> i64 {
        text.chars().map(|c| self.letter_value(c)).sum()
    }

    pub fn entries(&self) -> &[(char, i64)] {
        &self.entries
    }

    /// Rebuild the lookup after deserialisation.
    pub fn reindexed(mut self) -> Self {
        self.lookup = self.entries.iter().copied().collect();
        self
    }
}

/// Canonical system name, e.g. `Simplified29_Alphabet_Primes`.
pub fn system_name(mode: TextMode, order: LetterOrder, sequence: ValueSequence) -> String {
    format!("{}_{}_{}", mode, order, sequence)
}

/// Named systems available to a session
#[derive(Debug, Clone, Default)]
pub struct NumerologyRegistry {
    systems: BTreeMap<String, Arc<NumerologySystem>>,
}

impl NumerologyRegistry {
    /// Abjad plus the alphabet-ordered Linear, Primes, Composites and Frequency systems
    /// over the book's own letters.
    pub fn precomputed(book: &Book) -> Self {
        let text = book.letter_text(0..book.letters.len());
        let mut registry = NumerologyRegistry::default();
        registry.insert(NumerologySystem::abjad());
        for sequence in [
            ValueSequence::Linear,
            ValueSequence::Primes,
            ValueSequence::Composites,
            ValueSequence::Frequency,
        ] {
            registry.insert(NumerologySystem::synthesize(
                book.mode,
                &text,
                LetterOrder::Alphabet,
                sequence,
            ));
        }
        registry
    }

    /// Add or replace a system; returns the shared handle.
    pub fn insert(&mut self, system: NumerologySystem) -> Arc<NumerologySystem> {
        let system = Arc::new(system);
        self.systems.insert(system.name.clone(), Arc::clone(&system));
        system
    }

    pub fn get(&self, name: &str) -> Option<Arc<NumerologySystem>> {
        self.systems.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.systems.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_book;

    #[test]
    fn test_abjad_values() {
        let abjad = NumerologySystem::abjad();
        // ب س م = 2 + 60 + 40
        assert_eq!(abjad.text_value("بسم"), 102);
        assert_eq!(abjad.letter_value('?'), 0);
    }

    #[test]
    fn test_synthesize_alphabet_linear() {
        let system = NumerologySystem::synthesize(
            TextMode::Simplified29,
            "تبا",
            LetterOrder::Alphabet,
            ValueSequence::Linear,
        );
        assert_eq!(system.entries(), &[('ا', 1), ('ب', 2), ('ت', 3)]);
        assert_eq!(system.name, "Simplified29_Alphabet_Linear");
    }

    #[test]
    fn test_synthesize_appearance_primes() {
        let system = NumerologySystem::synthesize(
            TextMode::Simplified29,
            "تبات",
            LetterOrder::Appearance,
            ValueSequence::Primes,
        );
        assert_eq!(system.entries(), &[('ت', 2), ('ب', 3), ('ا', 5)]);
    }

    #[test]
    fn test_synthesize_frequency_orders() {
        let text = "ببب اا ت";
        let dsc = NumerologySystem::synthesize(
            TextMode::Simplified29,
            text,
            LetterOrder::FrequencyDescending,
            ValueSequence::Frequency,
        );
        assert_eq!(dsc.entries(), &[('ب', 3), ('ا', 2), ('ت', 1)]);

        let asc = NumerologySystem::synthesize(
            TextMode::Simplified29,
            text,
            LetterOrder::FrequencyAscending,
            ValueSequence::Linear,
        );
        assert_eq!(asc.entries(), &[('ت', 1), ('ا', 2), ('ب', 3)]);
    }

    #[test]
    fn test_registry_precomputed() {
        let book = sample_book(TextMode::Simplified29);
        let registry = NumerologyRegistry::precomputed(&book);
        let names: Vec<&str> = registry.names().collect();
        assert!(names.contains(&"Abjad"));
        assert!(names.contains(&"Simplified29_Alphabet_Primes"));
        assert!(names.contains(&"Simplified29_Alphabet_Frequency"));

        let linear = registry.get("Simplified29_Alphabet_Linear").unwrap();
        assert_eq!(linear.letter_value('ا'), 1);
    }

    #[test]
    fn test_order_and_sequence_names_parse() {
        assert_eq!("FrequencyDsc".parse::<LetterOrder>(), Ok(LetterOrder::FrequencyDescending));
        assert_eq!("primes".parse::<ValueSequence>(), Ok(ValueSequence::Primes));
        assert!("random".parse::<ValueSequence>().is_err());
    }
}
