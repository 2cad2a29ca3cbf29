//! Pause marks (waqf signs) attached to words and verse ends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Recitation pause annotation following a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StopMark {
    #[default]
    None,
    MustStop,
    ShouldStop,
    CanStop,
    ShouldContinue,
    MustContinue,
    MustPause,
    CanStopAtEither,
}

impl StopMark {
    /// Parse a stand-alone stop-mark token of the source text.
    pub fn from_token(token: &str) -> Option<StopMark> {
        let mut chars = token.chars();
        let mark = match chars.next()? {
            '\u{06D8}' => StopMark::MustStop,
            '\u{06D7}' => StopMark::ShouldStop,
            '\u{06DA}' => StopMark::CanStop,
            '\u{06D6}' => StopMark::ShouldContinue,
            '\u{06D9}' => StopMark::MustContinue,
            '\u{06DC}' => StopMark::MustPause,
            '\u{06DB}' => StopMark::CanStopAtEither,
            _ => return None,
        };
        if chars.next().is_some() {
            return None;
        }
        Some(mark)
    }

    /// Source-text character for this mark; `None` has no glyph.
    pub fn text(self) -> &'static str {
        match self {
            StopMark::None => "",
            StopMark::MustStop => "\u{06D8}",
            StopMark::ShouldStop => "\u{06D7}",
            StopMark::CanStop => "\u{06DA}",
            StopMark::ShouldContinue => "\u{06D6}",
            StopMark::MustContinue => "\u{06D9}",
            StopMark::MustPause => "\u{06DC}",
            StopMark::CanStopAtEither => "\u{06DB}",
        }
    }

    pub fn is_none(self) -> bool {
        matches!(self, StopMark::None)
    }
}

/// Lookup used when assembling Original-mode text.
pub fn stopmark_text(mark: StopMark) -> &'static str {
    mark.text()
}

impl fmt::Display for StopMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for StopMark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mark = match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "" | "none" => StopMark::None,
            "muststop" => StopMark::MustStop,
            "shouldstop" => StopMark::ShouldStop,
            "canstop" => StopMark::CanStop,
            "shouldcontinue" => StopMark::ShouldContinue,
            "mustcontinue" => StopMark::MustContinue,
            "mustpause" => StopMark::MustPause,
            "canstopateither" => StopMark::CanStopAtEither,
            _ => return StopMark::from_token(s.trim()).ok_or_else(|| format!("unknown stop mark: {}", s)),
        };
        Ok(mark)
    }
}
