//! Sentence segmentation driven by pause marks.
//!
//! The segmenter walks a flat word sequence as a small state machine. Marks that admit
//! alternative readings (MustContinue, CanStopAtEither) make it emit every reading, so the
//! resulting sentences may overlap and must not be treated as a partition of the words.

use std::collections::HashSet;
use std::ops::Range;

use crate::book::Book;
use crate::error::EngineError;
use crate::models::{Phrase, Sentence};
use crate::range::contiguous_runs;
use crate::simplify::TextSimplifier;
use crate::stopmark::{stopmark_text, StopMark};

/// Words whose pause is read straight through.
pub const CONTINUE_THROUGH_PAUSE: [&str; 2] = ["من", "بل"];

/// Words that end the sentence when they follow a pause.
pub const STOP_BEFORE_WORDS: [&str; 3] = ["قيما", "هذا", "هاذا"];

/// How a marked word bounds the sentence being scanned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Boundary {
    Stop,
    Continue,
    Either,
}

#[derive(Debug, Clone, Copy)]
enum State {
    Scan { start: usize },
    /// After a MustContinue mark at `mark`; `chain_start` opens the continued reading
    Continue { chain_start: usize, mark: usize },
    /// After the first CanStopAtEither mark
    Either { start: usize, first: usize },
    /// After the second CanStopAtEither mark
    EitherSecond { first: usize, second: usize },
    Done,
}

/// Segmenter over a contiguous run of the book's words
pub struct Segmenter<'a> {
    book: &'a Book,
    simplifier: &'a dyn TextSimplifier,
    words: Range<usize>,
}

impl<'a> Segmenter<'a> {
    pub fn new(book: &'a Book, simplifier: &'a dyn TextSimplifier, words: Range<usize>) -> Self {
        Segmenter {
            book,
            simplifier,
            words,
        }
    }

    /// Emit every sentence reading of the word run, in discovery order without duplicates.
    pub fn segment(&self) -> Result<Vec<Sentence>, EngineError> {
        let mut emitted: Vec<(usize, usize)> = Vec::new();
        let mut seen: HashSet<(usize, usize)> = HashSet::new();
        let mut emit = |first: usize, last: usize| {
            if first <= last && seen.insert((first, last)) {
                emitted.push((first, last));
            }
        };

        let mut state = State::Scan {
            start: self.words.start,
        };

        loop {
            state = match state {
                State::Scan { start } => match self.next_boundary(start)? {
                    None => State::Done,
                    Some((j, Boundary::Stop)) => {
                        emit(start, j);
                        State::Scan { start: j + 1 }
                    }
                    Some((j, Boundary::Continue)) => {
                        emit(start, j);
                        State::Continue {
                            chain_start: start,
                            mark: j,
                        }
                    }
                    Some((j, Boundary::Either)) => {
                        emit(start, j);
                        State::Either { start, first: j }
                    }
                },

                State::Continue { chain_start, mark } => match self.next_boundary(mark + 1)? {
                    None => State::Done,
                    Some((k, boundary)) => {
                        emit(mark + 1, k);
                        emit(chain_start, k);
                        match boundary {
                            Boundary::Continue => State::Continue { chain_start, mark: k },
                            Boundary::Either => State::Either {
                                start: mark + 1,
                                first: k,
                            },
                            Boundary::Stop => State::Scan { start: k + 1 },
                        }
                    }
                },

                State::Either { start, first } => match self.next_boundary(first + 1)? {
                    None => State::Done,
                    Some((k, Boundary::Either)) => {
                        // Stop at the second mark instead of the first
                        emit(start, k);
                        State::EitherSecond { first, second: k }
                    }
                    Some((k, Boundary::Continue)) => {
                        emit(start, k);
                        emit(first + 1, k);
                        State::Continue {
                            chain_start: first + 1,
                            mark: k,
                        }
                    }
                    Some((k, Boundary::Stop)) => {
                        emit(start, k);
                        emit(first + 1, k);
                        State::Scan { start: k + 1 }
                    }
                },

                State::EitherSecond { first, second } => match self.next_boundary(second + 1)? {
                    None => {
                        emit(first + 1, second);
                        State::Done
                    }
                    Some((m, _)) => {
                        emit(first + 1, m);
                        emit(second + 1, m);
                        State::Scan { start: m + 1 }
                    }
                },

                State::Done => break,
            };
        }

        Ok(emitted
            .into_iter()
            .map(|(first, last)| self.assemble(first, last))
            .collect())
    }

    /// Find the next word at or after `from` that bounds a sentence.
    /// The last word of the run always bounds one.
    fn next_boundary(&self, from: usize) -> Result<Option<(usize, Boundary)>, EngineError> {
        if from >= self.words.end {
            return Ok(None);
        }

        for j in from..self.words.end {
            let boundary = match self.book.words[j].stop_mark {
                StopMark::None => None,
                StopMark::MustStop
                | StopMark::ShouldStop
                | StopMark::CanStop
                | StopMark::ShouldContinue => Some(Boundary::Stop),
                StopMark::MustContinue => Some(Boundary::Continue),
                StopMark::CanStopAtEither => Some(Boundary::Either),
                StopMark::MustPause => self.pause_boundary(j)?,
            };
            if let Some(boundary) = boundary {
                return Ok(Some((j, boundary)));
            }
        }

        Ok(Some((self.words.end - 1, Boundary::Stop)))
    }

    /// Resolve a MustPause mark against the closed word lists.
    fn pause_boundary(&self, j: usize) -> Result<Option<Boundary>, EngineError> {
        let word = self.simplifier.simplify29(&self.book.words[j].text);
        if CONTINUE_THROUGH_PAUSE.contains(&word.as_str()) {
            return Ok(None);
        }

        let Some(next) = self.book.words.get(j + 1).filter(|_| j + 1 < self.words.end) else {
            return Ok(Some(Boundary::Stop));
        };
        let next = self.simplifier.simplify29(&next.text);
        if STOP_BEFORE_WORDS.contains(&next.as_str()) {
            return Ok(Some(Boundary::Stop));
        }

        Err(EngineError::UnknownPauseWord {
            word,
            number: self.book.words[j].number,
        })
    }

    fn assemble(&self, first: usize, last: usize) -> Sentence {
        let words = &self.book.words[first..=last];
        let original = self.book.mode.is_original();

        let mut text = String::new();
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                text.push(' ');
            }
            text.push_str(&word.text);
            if original && i + 1 < words.len() && !word.stop_mark.is_none() {
                text.push(' ');
                text.push_str(stopmark_text(word.stop_mark));
            }
        }

        let head = &words[0];
        let tail = &words[words.len() - 1];
        Sentence {
            words: first..last + 1,
            first_verse: head.verse,
            start_offset: head.position,
            last_verse: tail.verse,
            end_offset: tail.position + tail.text.chars().count(),
            text,
        }
    }
}

/// Segment the given verses; each contiguous run of verse indices is segmented on its own.
pub fn segment_verses(
    book: &Book,
    simplifier: &dyn TextSimplifier,
    verses: &[usize],
) -> Result<Vec<Sentence>, EngineError> {
    let mut sentences = Vec::new();
    for run in contiguous_runs(verses) {
        let words = book.words_of_verses(run);
        if words.is_empty() {
            continue;
        }
        sentences.extend(Segmenter::new(book, simplifier, words).segment()?);
    }
    Ok(sentences)
}

/// The part of a sentence inside each verse it spans, one phrase per verse.
pub fn sentence_phrases(book: &Book, sentence: &Sentence) -> Vec<Phrase> {
    let mut phrases: Vec<Phrase> = Vec::new();
    for word in &book.words[sentence.words.clone()] {
        match phrases.last_mut() {
            Some(phrase) if phrase.verse == word.verse => {
                phrase.text.push(' ');
                phrase.text.push_str(&word.text);
            }
            _ => phrases.push(Phrase {
                verse: word.verse,
                position: word.position,
                text: word.text.clone(),
                mode: book.mode,
            }),
        }
    }
    phrases
}
