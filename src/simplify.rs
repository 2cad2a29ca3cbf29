//! Text simplification collaborator.
//!
//! The engine only ever calls `simplify(text, mode)`. The rules that turn diacritic-laden
//! source text into a display mode belong to the surrounding system; `DiacriticSimplifier`
//! is the default implementation used by the CLI and the tests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display mode of a corpus build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TextMode {
    /// Source text with diacritics and stop marks (identity mode)
    Original,
    /// Diacritics and stop marks removed, letter shapes kept
    Simplified,
    /// Diacritics removed and letters folded onto the 29-letter alphabet
    #[default]
    Simplified29,
}

impl TextMode {
    pub fn is_original(self) -> bool {
        matches!(self, TextMode::Original)
    }
}

impl fmt::Display for TextMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextMode::Original => "Original",
            TextMode::Simplified => "Simplified",
            TextMode::Simplified29 => "Simplified29",
        };
        f.write_str(name)
    }
}

impl FromStr for TextMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(TextMode::Original),
            "simplified" => Ok(TextMode::Simplified),
            "simplified29" => Ok(TextMode::Simplified29),
            other => Err(format!("unknown text mode: {}", other)),
        }
    }
}

/// Deterministic text transform supplied by the surrounding system.
pub trait TextSimplifier: Send + Sync {
    /// `TextMode::Original` must return the text unchanged.
    fn simplify(&self, text: &str, mode: TextMode) -> String;

    /// Position-stable reduction onto the canonical alphabet.
    fn simplify29(&self, text: &str) -> String {
        self.simplify(text, TextMode::Simplified29)
    }
}

/// The 29-letter canonical alphabet in traditional order.
pub const ALPHABET_29: &str = "ابتثجحخدذرزسشصضطظعغفقكلمنهويء";

/// Arabic combining marks, Quranic annotation signs and the tatweel.
pub fn is_diacritic(c: char) -> bool {
    matches!(c,
        '\u{0610}'..='\u{061A}'
        | '\u{0640}'
        | '\u{064B}'..='\u{065F}'
        | '\u{0670}'
        | '\u{06D6}'..='\u{06ED}'
    )
}

/// A letter is an alphabetic character that is not a combining mark.
pub fn is_letter(c: char) -> bool {
    c.is_alphabetic() && !is_diacritic(c)
}

/// Fold letter variants onto the 29-letter alphabet.
fn fold29(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ٱ' => 'ا',
        'ى' => 'ي',
        'ة' => 'ه',
        'ؤ' | 'ئ' => 'ء',
        other => other,
    }
}

/// Default simplifier: strips diacritics, drops tokens left empty and normalises spacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiacriticSimplifier;

impl DiacriticSimplifier {
    fn strip(text: &str, fold: bool) -> String {
        let mut tokens = Vec::new();
        for token in text.split_whitespace() {
            let simplified: String = token
                .chars()
                .filter(|&c| !is_diacritic(c) && !is_ornament(c))
                .map(|c| if fold { fold29(c) } else { c })
                .collect();
            if !simplified.is_empty() {
                tokens.push(simplified);
            }
        }
        tokens.join(" ")
    }
}

/// Verse-level ornaments (rub el hizb, prostration sign) that carry no letters.
pub fn is_ornament(c: char) -> bool {
    matches!(c, '\u{06DE}' | '\u{06E9}')
}

impl TextSimplifier for DiacriticSimplifier {
    fn simplify(&self, text: &str, mode: TextMode) -> String {
        match mode {
            TextMode::Original => text.to_string(),
            TextMode::Simplified => Self::strip(text, false),
            TextMode::Simplified29 => Self::strip(text, true),
        }
    }
}

/// Collapse runs of whitespace to single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_is_identity() {
        let text = "بِسْمِ ٱللَّهِ ۖ";
        assert_eq!(DiacriticSimplifier.simplify(text, TextMode::Original), text);
    }

    #[test]
    fn test_strip_diacritics_and_stop_marks() {
        let text = "ذَٰلِكَ ٱلْكِتَٰبُ لَا رَيْبَ ۛ فِيهِ";
        assert_eq!(
            DiacriticSimplifier.simplify(text, TextMode::Simplified),
            "ذلك ٱلكتب لا ريب فيه"
        );
        assert_eq!(
            DiacriticSimplifier.simplify(text, TextMode::Simplified29),
            "ذلك الكتب لا ريب فيه"
        );
    }

    #[test]
    fn test_letters_exclude_marks() {
        assert!(is_letter('ب'));
        assert!(!is_letter('\u{064E}'));
        assert!(!is_letter('\u{0670}'));
        assert!(!is_letter('ۖ'));
        assert_eq!(ALPHABET_29.chars().count(), 29);
    }

    #[test]
    fn test_text_mode_parse() {
        assert_eq!("original".parse::<TextMode>(), Ok(TextMode::Original));
        assert_eq!("Simplified29".parse::<TextMode>(), Ok(TextMode::Simplified29));
        assert!("latin".parse::<TextMode>().is_err());
    }
}
