//! Immutable query session.
//!
//! A session bundles the built book with everything a query reads: the simplifier, the
//! numerology registry and active system, the root index, and the verse sets of the user's
//! selection and of the previous result. Nothing here mutates; `with_*` methods return a new
//! session sharing the unchanged parts, so sessions can be handed to other threads freely.

use std::ops::Range;
use std::sync::Arc;

use crate::book::Book;
use crate::models::{BuildError, CorpusSource, Hit, PartitionKind, Scope, SessionParams, Unit};
use crate::numerology::{NumerologyRegistry, NumerologySystem};
use crate::root_search::{BestRootResolver, RootIndex, RootResolver};
use crate::simplify::TextSimplifier;

#[derive(Clone)]
pub struct QuerySession {
    book: Arc<Book>,
    simplifier: Arc<dyn TextSimplifier>,
    registry: Arc<NumerologyRegistry>,
    system: Option<Arc<NumerologySystem>>,
    roots: Arc<RootIndex>,
    resolver: Arc<dyn RootResolver>,
    selection: Arc<Vec<usize>>,
    result: Arc<Vec<usize>>,
    params: SessionParams,
}

impl QuerySession {
    /// Build the book from a corpus source in the configured text mode.
    pub fn from_source(
        source: &CorpusSource,
        simplifier: Arc<dyn TextSimplifier>,
        params: SessionParams,
    ) -> Result<Self, BuildError> {
        let book = Book::build(source, simplifier.as_ref(), params.text_mode)?;
        Ok(Self::new(book, simplifier, params))
    }

    pub fn new(book: Book, simplifier: Arc<dyn TextSimplifier>, params: SessionParams) -> Self {
        let registry = NumerologyRegistry::precomputed(&book);
        let system = registry.get(&params.numerology_system);
        if system.is_none() {
            tracing::warn!(
                system = %params.numerology_system,
                "numerology system not registered, value criteria will match nothing"
            );
        }
        let roots = RootIndex::build(&book);
        let resolver: Arc<dyn RootResolver> =
            Arc::new(BestRootResolver::new(&book, Arc::clone(&simplifier)));

        tracing::info!(
            mode = %book.mode,
            verses = book.verses.len(),
            words = book.words.len(),
            roots = roots.len(),
            "session ready"
        );

        QuerySession {
            book: Arc::new(book),
            simplifier,
            registry: Arc::new(registry),
            system,
            roots: Arc::new(roots),
            resolver,
            selection: Arc::new(Vec::new()),
            result: Arc::new(Vec::new()),
            params,
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn simplifier(&self) -> &dyn TextSimplifier {
        self.simplifier.as_ref()
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn registry(&self) -> &NumerologyRegistry {
        &self.registry
    }

    /// Active numerology system; `None` makes every value criterion fail.
    pub fn system(&self) -> Option<&NumerologySystem> {
        self.system.as_deref()
    }

    pub fn roots(&self) -> &RootIndex {
        &self.roots
    }

    pub fn resolver(&self) -> &dyn RootResolver {
        self.resolver.as_ref()
    }

    /// Verses of the user's selection, sorted
    pub fn selection(&self) -> &[usize] {
        &self.selection
    }

    /// Verses carried over from the previous result, sorted
    pub fn result(&self) -> &[usize] {
        &self.result
    }

    /// Same session with a different root resolver.
    pub fn with_resolver(&self, resolver: Arc<dyn RootResolver>) -> Self {
        QuerySession {
            resolver,
            ..self.clone()
        }
    }

    /// Same session with a new selection; out-of-range verses are dropped.
    pub fn with_selection(&self, verses: impl IntoIterator<Item = usize>) -> Self {
        QuerySession {
            selection: Arc::new(normalize(verses, self.book.verses.len())),
            ..self.clone()
        }
    }

    /// Select whole partitions by index.
    pub fn with_selected_partitions(
        &self,
        kind: PartitionKind,
        partitions: impl IntoIterator<Item = usize>,
    ) -> Self {
        let table = self.book.partitions(kind);
        let verses = partitions
            .into_iter()
            .filter_map(|p| table.get(p))
            .flat_map(|p| p.verses.clone());
        self.with_selection(verses)
    }

    /// Same session whose result scope holds the verses covered by `hits`.
    pub fn with_result(&self, hits: &[Hit]) -> Self {
        let verses = hits.iter().flat_map(|hit| hit_verses(&self.book, hit));
        QuerySession {
            result: Arc::new(normalize(verses, self.book.verses.len())),
            ..self.clone()
        }
    }

    /// Register `system` and make it active.
    pub fn with_system(&self, system: NumerologySystem) -> Self {
        let mut registry = NumerologyRegistry::clone(&self.registry);
        let system = registry.insert(system);
        let params = SessionParams {
            numerology_system: system.name.clone(),
            ..self.params.clone()
        };
        QuerySession {
            registry: Arc::new(registry),
            system: Some(system),
            params,
            ..self.clone()
        }
    }

    /// Register stored systems without changing which name is active. A stored system with
    /// the active name replaces the precomputed one.
    pub fn with_registered(&self, systems: impl IntoIterator<Item = NumerologySystem>) -> Self {
        let mut registry = NumerologyRegistry::clone(&self.registry);
        for system in systems {
            registry.insert(system);
        }
        let system = registry.get(&self.params.numerology_system);
        QuerySession {
            registry: Arc::new(registry),
            system,
            ..self.clone()
        }
    }

    /// Activate a registered system by name; `None` when no such system exists.
    pub fn with_system_named(&self, name: &str) -> Option<Self> {
        let system = self.registry.get(name)?;
        let params = SessionParams {
            numerology_system: name.to_string(),
            ..self.params.clone()
        };
        Some(QuerySession {
            system: Some(system),
            params,
            ..self.clone()
        })
    }

    /// Verse universe of a scope, in corpus order.
    pub fn source_verses(&self, scope: Scope) -> Vec<usize> {
        match scope {
            Scope::Book => (0..self.book.verses.len()).collect(),
            Scope::Selection => self.selection.to_vec(),
            Scope::Result => self.result.to_vec(),
        }
    }

    /// Units of a granularity inside a scope's verses, in corpus order.
    ///
    /// A partition belongs to the universe when any of its verses does. Sentences are derived
    /// per query and have no stored universe.
    pub fn source_units(&self, scope: Scope, unit: Unit) -> Vec<usize> {
        let verses = self.source_verses(scope);
        let book = &self.book;
        match unit {
            Unit::Verse => verses,
            Unit::Word => verses
                .iter()
                .flat_map(|&v| book.verses[v].words.clone())
                .collect(),
            Unit::Letter => verses
                .iter()
                .flat_map(|&v| book.letters_of_verses(v..v + 1))
                .collect(),
            Unit::Partition(kind) => {
                let mut partitions: Vec<usize> = verses
                    .iter()
                    .filter_map(|&v| book.partition_of(kind, v))
                    .collect();
                partitions.dedup();
                partitions
            }
            Unit::Sentence => Vec::new(),
        }
    }
}

fn normalize(verses: impl IntoIterator<Item = usize>, len: usize) -> Vec<usize> {
    let mut verses: Vec<usize> = verses.into_iter().filter(|&v| v < len).collect();
    verses.sort_unstable();
    verses.dedup();
    verses
}

/// Verses covered by a hit. Sentence hits are resolved through their phrases.
pub fn hit_verses(book: &Book, hit: &Hit) -> Range<usize> {
    if hit.range.is_empty() {
        return 0..0;
    }
    let (first, last) = (hit.range.start, hit.range.end - 1);
    match hit.unit {
        Unit::Letter => {
            let start = book.words[book.letters[first].word].verse;
            let end = book.words[book.letters[last].word].verse;
            start..end + 1
        }
        Unit::Word => book.words[first].verse..book.words[last].verse + 1,
        Unit::Verse => hit.range.clone(),
        Unit::Partition(kind) => {
            let table = book.partitions(kind);
            table[first].verses.start..table[last].verses.end
        }
        Unit::Sentence => {
            let start = hit.phrases.iter().map(|p| p.verse).min();
            let end = hit.phrases.iter().map(|p| p.verse).max();
            match (start, end) {
                (Some(start), Some(end)) => start..end + 1,
                _ => 0..0,
            }
        }
    }
}
