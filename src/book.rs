//! In-memory corpus: flat letter/word/verse tables plus the partition schemes.
//!
//! Entities reference their children by index ranges into the book's tables, so a run of
//! letters, words or verses is always a plain `Range<usize>` regardless of where it crosses
//! word, verse or chapter boundaries.

use std::collections::HashMap;
use std::ops::Range;

use crate::models::{
    BuildError, ChapterDetail, CorpusSource, Letter, Partition, PartitionKind, Unit, Verse,
    VerseRef, Word,
};
use crate::simplify::{is_letter, TextMode, TextSimplifier};
use crate::stopmark::StopMark;

/// Immutable corpus built once per text mode
#[derive(Debug, Clone)]
pub struct Book {
    pub mode: TextMode,
    pub letters: Vec<Letter>,
    pub words: Vec<Word>,
    pub verses: Vec<Verse>,
    pub chapters: Vec<ChapterDetail>,
    partitions: Vec<Vec<Partition>>,
}

/// Book statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BookStats {
    pub chapters: usize,
    pub verses: usize,
    pub words: usize,
    pub letters: usize,
    pub unique_letters: usize,
    pub roots: usize,
    pub partitions: Vec<(PartitionKind, usize)>,
}

/// Word collected from the raw verse text before numbering
struct PendingWord {
    text: String,
    position: usize,
    mark: StopMark,
}

impl Book {
    /// Build the book from loader output in the given text mode.
    pub fn build(
        source: &CorpusSource,
        simplifier: &dyn TextSimplifier,
        mode: TextMode,
    ) -> Result<Book, BuildError> {
        let mut book = Book {
            mode,
            letters: Vec::new(),
            words: Vec::new(),
            verses: Vec::new(),
            chapters: Vec::with_capacity(source.chapters.len()),
            partitions: vec![Vec::new(); PartitionKind::ALL.len()],
        };

        for (chapter_idx, chapter) in source.chapters.iter().enumerate() {
            if chapter.verses.is_empty() {
                return Err(BuildError::EmptyChapter(chapter.number));
            }

            let first_verse = book.verses.len();
            let mut words_in_chapter = 0usize;
            let mut letters_in_chapter = 0usize;

            for (verse_idx, verse_source) in chapter.verses.iter().enumerate() {
                let verse_index = book.verses.len();
                let pending = split_words(&verse_source.text, simplifier, mode);

                let text = if mode.is_original() {
                    verse_source.text.clone()
                } else {
                    pending
                        .iter()
                        .map(|w| w.text.as_str())
                        .collect::<Vec<_>>()
                        .join(" ")
                };

                let word_start = book.words.len();
                let mut letters_in_verse = 0usize;
                let word_total = pending.len();

                for (word_idx, pending_word) in pending.into_iter().enumerate() {
                    let word_index = book.words.len();
                    let letter_start = book.letters.len();
                    words_in_chapter += 1;

                    let letters = pending_word.text.chars().filter(|&c| is_letter(c));
                    for (letter_idx, character) in letters.enumerate() {
                        letters_in_chapter += 1;
                        letters_in_verse += 1;
                        book.letters.push(Letter {
                            character,
                            number: book.letters.len() + 1,
                            number_in_chapter: letters_in_chapter,
                            number_in_verse: letters_in_verse,
                            number_in_word: letter_idx + 1,
                            frequency: 0,
                            occurrence: 0,
                            word: word_index,
                        });
                    }

                    // The verse terminal mark closes the last word unless it carries its own
                    let stop_mark = if word_idx + 1 == word_total && pending_word.mark.is_none() {
                        verse_source.stop_mark
                    } else {
                        pending_word.mark
                    };

                    book.words.push(Word {
                        text: pending_word.text,
                        number: word_index + 1,
                        number_in_chapter: words_in_chapter,
                        number_in_verse: word_idx + 1,
                        position: pending_word.position,
                        root: None,
                        stop_mark,
                        frequency: 0,
                        occurrence: 0,
                        verse: verse_index,
                        letters: letter_start..book.letters.len(),
                    });
                }

                book.verses.push(Verse {
                    number: verse_index + 1,
                    number_in_chapter: verse_idx + 1,
                    chapter: chapter_idx,
                    text,
                    raw_text: verse_source.text.clone(),
                    stop_mark: verse_source.stop_mark,
                    prostration: verse_source.prostration,
                    revelation_place: verse_source
                        .revelation_place
                        .unwrap_or(chapter.revelation_place),
                    initialization: verse_source.initialization,
                    words: word_start..book.words.len(),
                });
            }

            book.chapters.push(ChapterDetail {
                number: chapter.number,
                name: chapter.name.clone(),
                revelation_place: chapter.revelation_place,
                revelation_order: chapter.revelation_order,
            });
            book.partitions[PartitionKind::Chapter.index()].push(Partition {
                kind: PartitionKind::Chapter,
                number: chapter_idx + 1,
                verses: first_verse..book.verses.len(),
            });
        }

        for scheme in &source.partitions {
            if scheme.kind == PartitionKind::Chapter {
                continue;
            }
            let starts = scheme
                .starts
                .iter()
                .map(|r| book.verse_index(*r).ok_or(BuildError::UnknownVerse {
                    chapter: r.chapter,
                    verse: r.verse,
                }))
                .collect::<Result<Vec<_>, _>>()?;
            book.partitions[scheme.kind.index()] = build_partitions(scheme.kind, &starts, book.verses.len())?;
        }

        for annotation in &source.roots {
            let unknown = BuildError::UnknownWord {
                chapter: annotation.verse.chapter,
                verse: annotation.verse.verse,
                word: annotation.word,
            };
            let verse = book.verse_index(annotation.verse).ok_or(unknown.clone())?;
            let words = book.verses[verse].words.clone();
            if annotation.word == 0 || annotation.word > words.len() {
                return Err(unknown);
            }
            book.words[words.start + annotation.word - 1].root = Some(annotation.root.clone());
        }

        book.assign_frequencies();
        Ok(book)
    }

    /// Count identical letters and words across the book and rank each occurrence.
    fn assign_frequencies(&mut self) {
        let mut letter_counts: HashMap<char, usize> = HashMap::new();
        for letter in &self.letters {
            *letter_counts.entry(letter.character).or_default() += 1;
        }
        let mut seen: HashMap<char, usize> = HashMap::new();
        for letter in &mut self.letters {
            let rank = seen.entry(letter.character).or_default();
            *rank += 1;
            letter.occurrence = *rank;
            letter.frequency = letter_counts[&letter.character];
        }

        let mut word_counts: HashMap<String, usize> = HashMap::new();
        for word in &self.words {
            *word_counts.entry(word.text.clone()).or_default() += 1;
        }
        let mut seen: HashMap<String, usize> = HashMap::new();
        for word in &mut self.words {
            let rank = seen.entry(word.text.clone()).or_default();
            *rank += 1;
            word.occurrence = *rank;
            word.frequency = word_counts[&word.text];
        }
    }

    /// Entries of one partition scheme (empty when the scheme was not loaded).
    pub fn partitions(&self, kind: PartitionKind) -> &[Partition] {
        &self.partitions[kind.index()]
    }

    /// Index of the partition of `kind` containing `verse`.
    /// Uses binary search over the contiguous partition starts.
    pub fn partition_of(&self, kind: PartitionKind, verse: usize) -> Option<usize> {
        let table = self.partitions(kind);
        table
            .binary_search_by(|p| {
                if verse < p.verses.start {
                    std::cmp::Ordering::Greater
                } else if verse >= p.verses.end {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
    }

    /// Resolve a chapter:verse reference to a verse index.
    pub fn verse_index(&self, r: VerseRef) -> Option<usize> {
        let chapter = self.partitions(PartitionKind::Chapter).get(r.chapter.checked_sub(1)?)?;
        let index = chapter.verses.start + r.verse.checked_sub(1)?;
        (index < chapter.verses.end).then_some(index)
    }

    /// Number of units of a granularity in the whole book. Sentences are not stored.
    pub fn unit_count(&self, unit: Unit) -> usize {
        match unit {
            Unit::Letter => self.letters.len(),
            Unit::Word => self.words.len(),
            Unit::Verse => self.verses.len(),
            Unit::Sentence => 0,
            Unit::Partition(kind) => self.partitions(kind).len(),
        }
    }

    /// Words spanned by a run of verses.
    pub fn words_of_verses(&self, verses: Range<usize>) -> Range<usize> {
        if verses.is_empty() {
            return 0..0;
        }
        self.verses[verses.start].words.start..self.verses[verses.end - 1].words.end
    }

    /// Letters spanned by a run of words.
    pub fn letters_of_words(&self, words: Range<usize>) -> Range<usize> {
        if words.is_empty() {
            return 0..0;
        }
        self.words[words.start].letters.start..self.words[words.end - 1].letters.end
    }

    pub fn letters_of_verses(&self, verses: Range<usize>) -> Range<usize> {
        self.letters_of_words(self.words_of_verses(verses))
    }

    /// Number of verses in the chapter containing `verse`.
    pub fn chapter_verse_count(&self, verse: usize) -> usize {
        let chapter = self.verses[verse].chapter;
        self.partitions(PartitionKind::Chapter)[chapter].verses.len()
    }

    /// Word count of the chapter containing `verse`.
    pub fn chapter_word_count(&self, verse: usize) -> usize {
        let chapter = self.verses[verse].chapter;
        let verses = self.partitions(PartitionKind::Chapter)[chapter].verses.clone();
        self.words_of_verses(verses).len()
    }

    /// Letter count of the chapter containing `verse`.
    pub fn chapter_letter_count(&self, verse: usize) -> usize {
        let chapter = self.verses[verse].chapter;
        let verses = self.partitions(PartitionKind::Chapter)[chapter].verses.clone();
        self.letters_of_verses(verses).len()
    }

    /// Concatenated characters of a letter run.
    pub fn letter_text(&self, letters: Range<usize>) -> String {
        self.letters[letters].iter().map(|l| l.character).collect()
    }

    pub fn stats(&self) -> BookStats {
        let mut unique: Vec<char> = self.letters.iter().map(|l| l.character).collect();
        unique.sort_unstable();
        unique.dedup();
        let mut roots: Vec<&str> = self.words.iter().filter_map(|w| w.root.as_deref()).collect();
        roots.sort_unstable();
        roots.dedup();

        BookStats {
            chapters: self.chapters.len(),
            verses: self.verses.len(),
            words: self.words.len(),
            letters: self.letters.len(),
            unique_letters: unique.len(),
            roots: roots.len(),
            partitions: PartitionKind::ALL
                .iter()
                .map(|&kind| (kind, self.partitions(kind).len()))
                .collect(),
        }
    }
}

/// Split raw verse text into words, attaching stand-alone stop-mark tokens to the
/// preceding word and dropping tokens that carry no letters.
fn split_words(raw: &str, simplifier: &dyn TextSimplifier, mode: TextMode) -> Vec<PendingWord> {
    let mut words: Vec<PendingWord> = Vec::new();
    let mut simplified_offset = 0usize;

    for (raw_offset, token) in tokens_with_offsets(raw) {
        if let Some(mark) = StopMark::from_token(token) {
            if let Some(last) = words.last_mut() {
                last.mark = mark;
            }
            continue;
        }

        let text = if mode.is_original() {
            token.to_string()
        } else {
            simplifier.simplify(token, mode)
        };
        if !text.chars().any(is_letter) {
            continue;
        }

        let position = if mode.is_original() {
            raw_offset
        } else {
            simplified_offset
        };
        simplified_offset += text.chars().count() + 1;

        words.push(PendingWord {
            text,
            position,
            mark: StopMark::None,
        });
    }

    words
}

/// Whitespace-separated tokens with their char offsets.
pub(crate) fn tokens_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start: Option<(usize, usize)> = None; // (byte, char)

    for (char_idx, (byte_idx, c)) in text.char_indices().enumerate() {
        if c.is_whitespace() {
            if let Some((byte_start, char_start)) = start.take() {
                tokens.push((char_start, &text[byte_start..byte_idx]));
            }
        } else if start.is_none() {
            start = Some((byte_idx, char_idx));
        }
    }
    if let Some((byte_start, char_start)) = start {
        tokens.push((char_start, &text[byte_start..]));
    }

    tokens
}

/// Turn ordered start indices into a total, non-overlapping partition table.
fn build_partitions(
    kind: PartitionKind,
    starts: &[usize],
    verse_count: usize,
) -> Result<Vec<Partition>, BuildError> {
    if starts.is_empty() {
        return Ok(Vec::new());
    }
    if starts[0] != 0 {
        return Err(BuildError::PartitionGap { kind });
    }

    let mut table = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(verse_count);
        if end <= start {
            return Err(BuildError::PartitionOverlap { kind, number: i + 1 });
        }
        table.push(Partition {
            kind,
            number: i + 1,
            verses: start..end,
        });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChapterSource, PartitionSource, RootAnnotation, VerseSource};
    use crate::simplify::DiacriticSimplifier;
    use crate::test_support::sample_source;

    #[test]
    fn test_build_numbers_every_scope() {
        let book = Book::build(&sample_source(), &DiacriticSimplifier, TextMode::Simplified29).unwrap();

        assert_eq!(book.chapters.len(), 3);
        let first = &book.verses[0];
        assert_eq!(first.text, "بسم الله الرحمن الرحيم");
        assert_eq!(first.words.len(), 4);

        let second_word = &book.words[1];
        assert_eq!(second_word.text, "الله");
        assert_eq!(second_word.number_in_verse, 2);
        assert_eq!(second_word.position, 4);
        assert_eq!(book.letters[second_word.letters.start].number_in_word, 1);
        assert_eq!(book.letters[second_word.letters.start].number_in_verse, 4);

        // Second verse of chapter one restarts nothing but the in-verse counters
        let verse = &book.verses[1];
        assert_eq!(verse.number_in_chapter, 2);
        let word = &book.words[verse.words.start];
        assert_eq!(word.number_in_verse, 1);
        assert_eq!(word.number_in_chapter, 5);
    }

    #[test]
    fn test_stop_marks_attach_to_previous_word() {
        let book = Book::build(&sample_source(), &DiacriticSimplifier, TextMode::Original).unwrap();
        let verse = &book.verses[book.verse_index(VerseRef { chapter: 2, verse: 2 }).unwrap()];
        let words = &book.words[verse.words.clone()];

        assert_eq!(words[3].stop_mark, StopMark::CanStopAtEither);
        assert!(words.iter().all(|w| !w.text.contains('ۛ')));
        assert_eq!(words.last().unwrap().stop_mark, StopMark::MustStop);
    }

    #[test]
    fn test_original_positions_point_into_raw_text() {
        let book = Book::build(&sample_source(), &DiacriticSimplifier, TextMode::Original).unwrap();
        let verse = &book.verses[0];
        for word in &book.words[verse.words.clone()] {
            let at: String = verse
                .text
                .chars()
                .skip(word.position)
                .take(word.text.chars().count())
                .collect();
            assert_eq!(at, word.text);
        }
    }

    #[test]
    fn test_partition_lookup() {
        let book = Book::build(&sample_source(), &DiacriticSimplifier, TextMode::Simplified29).unwrap();
        let pages = book.partitions(PartitionKind::Page);
        assert_eq!(pages.len(), 2);
        for verse in 0..book.verses.len() {
            let page = book.partition_of(PartitionKind::Page, verse).unwrap();
            assert!(pages[page].verses.contains(&verse));
        }
        assert_eq!(book.partition_of(PartitionKind::Page, book.verses.len()), None);
    }

    #[test]
    fn test_partition_must_cover_first_verse() {
        let mut source = sample_source();
        source.partitions = vec![PartitionSource {
            kind: PartitionKind::Part,
            starts: vec![VerseRef { chapter: 1, verse: 2 }],
        }];
        let result = Book::build(&source, &DiacriticSimplifier, TextMode::Simplified29);
        assert_eq!(result.unwrap_err(), BuildError::PartitionGap { kind: PartitionKind::Part });
    }

    #[test]
    fn test_partition_overlap_rejected() {
        let mut source = sample_source();
        source.partitions = vec![PartitionSource {
            kind: PartitionKind::Quarter,
            starts: vec![
                VerseRef { chapter: 1, verse: 1 },
                VerseRef { chapter: 2, verse: 1 },
                VerseRef { chapter: 1, verse: 3 },
            ],
        }];
        let result = Book::build(&source, &DiacriticSimplifier, TextMode::Simplified29);
        assert!(matches!(result, Err(BuildError::PartitionOverlap { number: 2, .. })));
    }

    #[test]
    fn test_empty_chapter_rejected() {
        let source = CorpusSource {
            chapters: vec![ChapterSource {
                number: 1,
                ..Default::default()
            }],
            ..Default::default()
        };
        let result = Book::build(&source, &DiacriticSimplifier, TextMode::Simplified29);
        assert_eq!(result.unwrap_err(), BuildError::EmptyChapter(1));
    }

    #[test]
    fn test_root_annotation_out_of_range() {
        let mut source = sample_source();
        source.roots.push(RootAnnotation {
            verse: VerseRef { chapter: 1, verse: 1 },
            word: 9,
            root: "سمو".to_string(),
        });
        let result = Book::build(&source, &DiacriticSimplifier, TextMode::Simplified29);
        assert!(matches!(result, Err(BuildError::UnknownWord { word: 9, .. })));
    }

    #[test]
    fn test_frequency_and_occurrence() {
        let source = CorpusSource {
            chapters: vec![ChapterSource {
                number: 1,
                verses: vec![VerseSource {
                    text: "بب ب".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let book = Book::build(&source, &DiacriticSimplifier, TextMode::Simplified29).unwrap();
        let occurrences: Vec<usize> = book.letters.iter().map(|l| l.occurrence).collect();
        assert_eq!(occurrences, vec![1, 2, 3]);
        assert!(book.letters.iter().all(|l| l.frequency == 3));
        assert_eq!(book.words[0].frequency, 1);
    }

    #[test]
    fn test_tokens_with_offsets() {
        let tokens = tokens_with_offsets("  ab  c d ");
        assert_eq!(tokens, vec![(2, "ab"), (6, "c"), (8, "d")]);
    }
}
