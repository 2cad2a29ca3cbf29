//! Mushaf Query Library
//!
//! Multi-modal query engine over a chapter/verse/word/letter scripture corpus: text patterns,
//! boolean word lists, roots, numeric criteria and windows, sentence segmentation by pause
//! marks, verse similarity and verse tags.
//!
//! # Example
//!
//! ```no_run
//! use mushaf_query::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! let source = load_corpus(Path::new("corpus.db")).unwrap();
//! let session =
//!     QuerySession::from_source(&source, Arc::new(DiacriticSimplifier), SessionParams::default())
//!         .unwrap();
//!
//! // Verses containing a whole word
//! let query = TextQuery::new("الرحمن").wordness(Wordness::WholeWord);
//! let hits = session.find_text(&query, Unit::Verse, Scope::Book).unwrap();
//!
//! // Chain: among those verses, the ones with seven words
//! let chained = session.with_result(&hits);
//! let seven = NumberQuery::new().with(Field::WordCount, Test::equal(7));
//! let narrowed = chained.find_numbers(&seven, Unit::Verse, Scope::Result).unwrap();
//!
//! println!("{} of {} verses", narrowed.len(), hits.len());
//! ```

pub mod book;
pub mod db;
pub mod error;
pub mod models;
pub mod number_query;
pub mod numbers;
pub mod numerology;
pub mod output;
pub mod pattern;
pub mod range;
pub mod root_search;
pub mod sentence;
pub mod server;
pub mod session;
pub mod similarity;
pub mod simplify;
pub mod stopmark;
pub mod tags;
pub mod text_search;
pub mod word_search;

#[cfg(test)]
pub(crate) mod test_support;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::book::{Book, BookStats};
    pub use crate::db::{load_book, load_corpus, load_numerology, save_corpus, save_numerology, DbError};
    pub use crate::error::EngineError;
    pub use crate::models::{
        BuildError, CorpusSource, Hit, Initialization, Partition, PartitionKind, Phrase,
        Prostration, RevelationPlace, Scope, Sentence, SessionParams, Unit, VerseRef,
        MAX_RANGE_LENGTH,
    };
    pub use crate::number_query::{
        Comparison, Evaluator, Field, Multiplicity, NumberQuery, NumberScope, Test,
    };
    pub use crate::numbers::NumberKind;
    pub use crate::numerology::{LetterOrder, NumerologyRegistry, NumerologySystem, ValueSequence};
    pub use crate::output::{print_hits, write_csv, write_json, OutputError};
    pub use crate::pattern::{build_pattern, Pattern, TextLocation, Wordness};
    pub use crate::root_search::{BestRootResolver, RootIndex, RootResolver};
    pub use crate::sentence::{segment_verses, Segmenter};
    pub use crate::session::QuerySession;
    pub use crate::similarity::{SimilarPair, SimilarityMethod};
    pub use crate::simplify::{DiacriticSimplifier, TextMode, TextSimplifier};
    pub use crate::stopmark::StopMark;
    pub use crate::text_search::{switch_text_mode, TextQuery, TextSearcher};
    pub use crate::word_search::{build_word_lists, Grouping, WordQuery};
}

// Re-export commonly used types at the crate root
pub use error::EngineError;
pub use models::{Hit, Scope, SessionParams, Unit};
pub use session::QuerySession;
