//! Output formatting for query results (JSON, CSV, console).

use serde::Serialize;
use std::io::{self, Write};
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

use crate::book::{Book, BookStats};
use crate::models::{Hit, Sentence};
use crate::session::hit_verses;
use crate::similarity::SimilarPair;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Write any result as pretty JSON.
pub fn write_json<T: Serialize + ?Sized, W: Write>(value: &T, writer: &mut W) -> Result<(), OutputError> {
    let json = serde_json::to_string_pretty(value)?;
    writer.write_all(json.as_bytes())?;
    Ok(())
}

pub fn write_json_file<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_json(value, &mut file)
}

/// Quote a CSV field when it holds a separator, quote or newline.
fn csv_field(text: &str) -> String {
    if text.contains([',', '"', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// Write hits as CSV, one row per hit.
pub fn write_csv<W: Write>(book: &Book, hits: &[Hit], writer: &mut W) -> Result<(), OutputError> {
    writeln!(writer, "unit,start,end,reference,phrases")?;

    for hit in hits {
        let phrases: Vec<&str> = hit.phrases.iter().map(|p| p.text.as_str()).collect();
        writeln!(
            writer,
            "{},{},{},{},{}",
            hit.unit,
            hit.range.start,
            hit.range.end,
            format_reference(book, hit_verses(book, hit)),
            csv_field(&phrases.join(" | "))
        )?;
    }

    Ok(())
}

pub fn write_csv_file(book: &Book, hits: &[Hit], path: &Path) -> Result<(), OutputError> {
    let mut file = std::fs::File::create(path)?;
    write_csv(book, hits, &mut file)
}

/// `chapter:verse` of one verse, or `c:v-c:v` for a run.
pub fn format_reference(book: &Book, verses: Range<usize>) -> String {
    if verses.is_empty() {
        return String::new();
    }
    let at = |v: usize| {
        let verse = &book.verses[v];
        format!("{}:{}", book.chapters[verse.chapter].number, verse.number_in_chapter)
    };
    if verses.len() == 1 {
        at(verses.start)
    } else {
        format!("{}-{}", at(verses.start), at(verses.end - 1))
    }
}

/// Format a hit as a human-readable line.
pub fn format_hit(book: &Book, hit: &Hit) -> String {
    let mut line = format!(
        "{} {}..{} [{}]",
        hit.unit,
        hit.range.start,
        hit.range.end,
        format_reference(book, hit_verses(book, hit))
    );
    if !hit.phrases.is_empty() {
        let phrases: Vec<String> = hit.phrases.iter().map(|p| truncate_text(&p.text, 60)).collect();
        line.push_str("  ");
        line.push_str(&phrases.join(" | "));
    }
    line
}

/// Print hits in a human-readable format.
pub fn print_hits(book: &Book, hits: &[Hit], limit: Option<usize>) {
    let to_print = match limit {
        Some(n) => &hits[..n.min(hits.len())],
        None => hits,
    };

    for hit in to_print {
        println!("{}", format_hit(book, hit));
    }

    if let Some(n) = limit {
        if hits.len() > n {
            println!("... and {} more hits", hits.len() - n);
        }
    }
    println!("{} hits", hits.len());
}

pub fn print_sentences(book: &Book, sentences: &[Sentence], limit: Option<usize>) {
    let to_print = match limit {
        Some(n) => &sentences[..n.min(sentences.len())],
        None => sentences,
    };

    for sentence in to_print {
        println!(
            "words {}..{} [{}]  {}",
            sentence.words.start,
            sentence.words.end,
            format_reference(book, sentence.first_verse..sentence.last_verse + 1),
            truncate_text(&sentence.text, 100)
        );
    }

    if let Some(n) = limit {
        if sentences.len() > n {
            println!("... and {} more sentences", sentences.len() - n);
        }
    }
    println!("{} sentences", sentences.len());
}

pub fn print_pairs(book: &Book, pairs: &[SimilarPair], limit: Option<usize>) {
    let to_print = match limit {
        Some(n) => &pairs[..n.min(pairs.len())],
        None => pairs,
    };

    for pair in to_print {
        println!(
            "{} ~ {}  {:.1}%",
            format_reference(book, pair.first..pair.first + 1),
            format_reference(book, pair.second..pair.second + 1),
            pair.score * 100.0
        );
    }
    println!("{} pairs", pairs.len());
}

/// Truncate text to a maximum length, adding ellipsis if needed.
fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Write book statistics to stdout.
pub fn print_stats(stats: &BookStats) {
    println!("\n=== Corpus Statistics ===");
    println!("Chapters: {}", stats.chapters);
    println!("Verses: {}", stats.verses);
    println!("Words: {}", stats.words);
    println!("Letters: {}", stats.letters);
    println!("Unique letters: {}", stats.unique_letters);
    println!("Roots: {}", stats.roots);
    if !stats.partitions.is_empty() {
        println!();
        println!("Partitions:");
        for (kind, count) in &stats.partitions {
            println!("  {}: {}", kind, count);
        }
    }
}
