//! SQLite storage for the corpus and numerology tables.
//!
//! Tables: `chapters`, `verses`, `partitions` (start verse of each entry), `roots` (per-word
//! annotations) and `numerology` (named letter value tables).

use rusqlite::{params, Connection, Result};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::book::Book;
use crate::models::{
    BuildError, ChapterSource, CorpusSource, PartitionKind, PartitionSource, RootAnnotation,
    VerseRef, VerseSource,
};
use crate::numerology::NumerologySystem;
use crate::simplify::{TextMode, TextSimplifier};
use crate::stopmark::StopMark;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Corpus error: {0}")]
    Build(#[from] BuildError),
    #[error("Invalid value '{value}' in table {table}")]
    InvalidValue { table: &'static str, value: String },
    #[error("Verse {chapter}:{verse} belongs to no chapter")]
    OrphanVerse { chapter: usize, verse: usize },
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chapters (
    number INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    revelation_place TEXT NOT NULL,
    revelation_order INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS verses (
    chapter INTEGER NOT NULL,
    number INTEGER NOT NULL,
    text TEXT NOT NULL,
    stop_mark TEXT,
    prostration TEXT,
    initialization TEXT,
    revelation_place TEXT,
    PRIMARY KEY (chapter, number)
);
CREATE TABLE IF NOT EXISTS partitions (
    kind TEXT NOT NULL,
    number INTEGER NOT NULL,
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    PRIMARY KEY (kind, number)
);
CREATE TABLE IF NOT EXISTS roots (
    chapter INTEGER NOT NULL,
    verse INTEGER NOT NULL,
    word INTEGER NOT NULL,
    root TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS numerology (
    system TEXT NOT NULL,
    position INTEGER NOT NULL,
    letter TEXT NOT NULL,
    value INTEGER NOT NULL,
    PRIMARY KEY (system, position)
);
";

/// Create any missing tables.
pub fn create_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

fn parse<T: FromStr>(table: &'static str, value: String) -> Result<T, DbError> {
    value
        .parse::<T>()
        .map_err(|_| DbError::InvalidValue { table, value })
}

fn parse_optional<T: FromStr>(table: &'static str, value: Option<String>) -> Result<Option<T>, DbError> {
    value.map(|v| parse(table, v)).transpose()
}

/// Load the corpus source: chapters with their verses, partition starts and roots.
///
/// A verse without a stored stop mark ends in MustStop.
pub fn load_corpus(db_path: &Path) -> Result<CorpusSource, DbError> {
    let conn = Connection::open(db_path)?;
    let mut source = CorpusSource::default();

    let mut stmt = conn.prepare(
        "SELECT number, name, revelation_place, revelation_order
         FROM chapters
         ORDER BY number",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let number: i64 = row.get(0)?;
        let order: i64 = row.get(3)?;
        source.chapters.push(ChapterSource {
            number: number as usize,
            name: row.get(1)?,
            revelation_place: parse("chapters", row.get(2)?)?,
            revelation_order: order as usize,
            verses: Vec::new(),
        });
    }

    let mut stmt = conn.prepare(
        "SELECT chapter, number, text, stop_mark, prostration, initialization, revelation_place
         FROM verses
         ORDER BY chapter, number",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let chapter: i64 = row.get(0)?;
        let number: i64 = row.get(1)?;
        let stop_mark: Option<String> = row.get(3)?;
        let verse = VerseSource {
            text: row.get(2)?,
            stop_mark: parse_optional("verses", stop_mark)?.unwrap_or(StopMark::MustStop),
            prostration: parse_optional("verses", row.get(4)?)?,
            initialization: parse_optional("verses", row.get(5)?)?,
            revelation_place: parse_optional("verses", row.get(6)?)?,
        };

        let owner = source
            .chapters
            .iter_mut()
            .find(|c| c.number == chapter as usize)
            .ok_or(DbError::OrphanVerse {
                chapter: chapter as usize,
                verse: number as usize,
            })?;
        owner.verses.push(verse);
    }

    let mut stmt = conn.prepare(
        "SELECT kind, chapter, verse
         FROM partitions
         ORDER BY kind, number",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let kind: PartitionKind = parse("partitions", row.get(0)?)?;
        let chapter: i64 = row.get(1)?;
        let verse: i64 = row.get(2)?;
        let start = VerseRef {
            chapter: chapter as usize,
            verse: verse as usize,
        };
        match source.partitions.iter_mut().find(|p| p.kind == kind) {
            Some(table) => table.starts.push(start),
            None => source.partitions.push(PartitionSource {
                kind,
                starts: vec![start],
            }),
        }
    }

    let mut stmt = conn.prepare(
        "SELECT chapter, verse, word, root
         FROM roots
         ORDER BY chapter, verse, word",
    )?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let chapter: i64 = row.get(0)?;
        let verse: i64 = row.get(1)?;
        let word: i64 = row.get(2)?;
        source.roots.push(RootAnnotation {
            verse: VerseRef {
                chapter: chapter as usize,
                verse: verse as usize,
            },
            word: word as usize,
            root: row.get(3)?,
        });
    }

    tracing::info!(
        path = %db_path.display(),
        chapters = source.chapters.len(),
        partitions = source.partitions.len(),
        roots = source.roots.len(),
        "loaded corpus"
    );
    Ok(source)
}

/// Load the corpus and build the book in `mode`.
pub fn load_book(db_path: &Path, simplifier: &dyn TextSimplifier, mode: TextMode) -> Result<Book, DbError> {
    let source = load_corpus(db_path)?;
    Ok(Book::build(&source, simplifier, mode)?)
}

/// Write a corpus source, replacing whatever the tables held.
pub fn save_corpus(db_path: &Path, source: &CorpusSource) -> Result<(), DbError> {
    let mut conn = Connection::open(db_path)?;
    create_schema(&conn)?;
    let tx = conn.transaction()?;
    tx.execute_batch("DELETE FROM chapters; DELETE FROM verses; DELETE FROM partitions; DELETE FROM roots;")?;

    for chapter in &source.chapters {
        tx.execute(
            "INSERT INTO chapters (number, name, revelation_place, revelation_order)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                chapter.number as i64,
                chapter.name,
                format!("{:?}", chapter.revelation_place),
                chapter.revelation_order as i64
            ],
        )?;
        for (i, verse) in chapter.verses.iter().enumerate() {
            tx.execute(
                "INSERT INTO verses
                 (chapter, number, text, stop_mark, prostration, initialization, revelation_place)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    chapter.number as i64,
                    (i + 1) as i64,
                    verse.text,
                    verse.stop_mark.to_string(),
                    verse.prostration.map(|p| format!("{:?}", p)),
                    verse.initialization.map(|k| format!("{:?}", k)),
                    verse.revelation_place.map(|p| format!("{:?}", p)),
                ],
            )?;
        }
    }

    for table in &source.partitions {
        for (i, start) in table.starts.iter().enumerate() {
            tx.execute(
                "INSERT INTO partitions (kind, number, chapter, verse) VALUES (?1, ?2, ?3, ?4)",
                params![
                    table.kind.to_string(),
                    (i + 1) as i64,
                    start.chapter as i64,
                    start.verse as i64
                ],
            )?;
        }
    }

    for root in &source.roots {
        tx.execute(
            "INSERT INTO roots (chapter, verse, word, root) VALUES (?1, ?2, ?3, ?4)",
            params![
                root.verse.chapter as i64,
                root.verse.verse as i64,
                root.word as i64,
                root.root
            ],
        )?;
    }

    tx.commit()?;
    Ok(())
}

/// Load every stored numerology system; a database without the table has none.
pub fn load_numerology(db_path: &Path) -> Result<Vec<NumerologySystem>, DbError> {
    let conn = Connection::open(db_path)?;
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'numerology'",
        [],
        |row| row.get(0),
    )?;
    if tables == 0 {
        return Ok(Vec::new());
    }

    let mut stmt = conn.prepare(
        "SELECT system, letter, value
         FROM numerology
         ORDER BY system, position",
    )?;

    let mut systems: Vec<(String, Vec<(char, i64)>)> = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(0)?;
        let letter: String = row.get(1)?;
        let value: i64 = row.get(2)?;

        let mut chars = letter.chars();
        let c = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(DbError::InvalidValue {
                    table: "numerology",
                    value: letter,
                })
            }
        };

        match systems.last_mut() {
            Some((current, entries)) if *current == name => entries.push((c, value)),
            _ => systems.push((name, vec![(c, value)])),
        }
    }

    Ok(systems
        .into_iter()
        .map(|(name, entries)| NumerologySystem::new(name, entries))
        .collect())
}

fn try_save_numerology(db_path: &Path, system: &NumerologySystem) -> Result<(), DbError> {
    let mut conn = Connection::open(db_path)?;
    create_schema(&conn)?;
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM numerology WHERE system = ?1", [&system.name])?;
    for (i, (letter, value)) in system.entries().iter().enumerate() {
        tx.execute(
            "INSERT INTO numerology (system, position, letter, value) VALUES (?1, ?2, ?3, ?4)",
            params![system.name, i as i64, letter.to_string(), value],
        )?;
    }
    tx.commit()?;
    Ok(())
}

/// Persist a numerology system. Failures are logged and absorbed; the in-memory system stays
/// authoritative. Returns whether the table was written.
pub fn save_numerology(db_path: &Path, system: &NumerologySystem) -> bool {
    match try_save_numerology(db_path, system) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %db_path.display(), system = %system.name, error = %e, "numerology table not saved");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Initialization, Prostration, RevelationPlace};
    use crate::simplify::DiacriticSimplifier;
    use crate::test_support::sample_source;
    use tempfile::TempDir;

    #[test]
    fn test_corpus_survives_storage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.db");
        save_corpus(&path, &sample_source()).unwrap();

        let loaded = load_corpus(&path).unwrap();
        assert_eq!(loaded.chapters.len(), 3);
        assert_eq!(loaded.chapters[1].name, "البقرة");
        assert_eq!(loaded.chapters[1].revelation_place, RevelationPlace::Madinah);
        assert_eq!(loaded.chapters[1].verses[0].initialization, Some(Initialization::Key));
        assert_eq!(loaded.chapters[2].verses[1].prostration, Some(Prostration::Obligatory));
        assert_eq!(loaded.roots.len(), 12);

        let bowing = loaded
            .partitions
            .iter()
            .find(|p| p.kind == PartitionKind::Bowing)
            .unwrap();
        assert_eq!(bowing.starts.len(), 3);

        let book = load_book(&path, &DiacriticSimplifier, TextMode::Simplified29).unwrap();
        assert_eq!(book.verses.len(), 8);
    }

    #[test]
    fn test_missing_stop_mark_ends_verse() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.db");
        let conn = Connection::open(&path).unwrap();
        create_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO chapters VALUES (1, 'x', 'Makkah', 1)",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO verses (chapter, number, text) VALUES (1, 1, 'ا ب')", [])
            .unwrap();

        let loaded = load_corpus(&path).unwrap();
        assert_eq!(loaded.chapters[0].verses[0].stop_mark, StopMark::MustStop);
    }

    #[test]
    fn test_orphan_verse_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.db");
        let conn = Connection::open(&path).unwrap();
        create_schema(&conn).unwrap();
        conn.execute("INSERT INTO verses (chapter, number, text) VALUES (4, 1, 'ا')", [])
            .unwrap();

        assert!(matches!(
            load_corpus(&path),
            Err(DbError::OrphanVerse { chapter: 4, verse: 1 })
        ));
    }

    #[test]
    fn test_numerology_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.db");
        assert!(save_numerology(&path, &NumerologySystem::abjad()));

        let systems = load_numerology(&path).unwrap();
        assert_eq!(systems.len(), 1);
        assert_eq!(systems[0].name, "Abjad");
        assert_eq!(systems[0].letter_value('غ'), 1000);
    }

    #[test]
    fn test_numerology_table_may_be_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corpus.db");
        Connection::open(&path).unwrap();
        assert!(load_numerology(&path).unwrap().is_empty());
    }

    #[test]
    fn test_numerology_save_failure_is_absorbed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("corpus.db");
        assert!(!save_numerology(&path, &NumerologySystem::abjad()));
    }
}
