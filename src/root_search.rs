//! Root-indexed word lookup.
//!
//! Text that is not an indexed root goes through a `RootResolver` once. A resolver that finds
//! nothing, or names a root the index does not hold, is a fatal error rather than an empty
//! result.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::book::Book;
use crate::error::EngineError;
use crate::models::{Hit, Phrase, Unit};
use crate::number_query::Multiplicity;
use crate::simplify::TextSimplifier;

/// Root -> ordered indices of the words sharing it
#[derive(Debug, Clone, Default)]
pub struct RootIndex {
    roots: BTreeMap<String, Vec<usize>>,
}

impl RootIndex {
    pub fn build(book: &Book) -> Self {
        let mut roots: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, word) in book.words.iter().enumerate() {
            if let Some(root) = &word.root {
                roots.entry(root.clone()).or_default().push(i);
            }
        }
        RootIndex { roots }
    }

    pub fn contains(&self, root: &str) -> bool {
        self.roots.contains_key(root)
    }

    pub fn words(&self, root: &str) -> &[usize] {
        self.roots.get(root).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.roots.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Finds the root that best explains arbitrary text.
pub trait RootResolver: Send + Sync {
    fn resolve(&self, text: &str, index: &RootIndex) -> Option<String>;
}

/// Default resolver.
///
/// An annotated word form resolves to its own root. Otherwise the longest indexed root whose
/// letters occur in order in the text wins, preferring roots with more words and then the
/// alphabetically first.
pub struct BestRootResolver {
    forms: HashMap<String, String>,
    simplifier: Arc<dyn TextSimplifier>,
}

impl BestRootResolver {
    pub fn new(book: &Book, simplifier: Arc<dyn TextSimplifier>) -> Self {
        let mut forms = HashMap::new();
        for word in &book.words {
            if let Some(root) = &word.root {
                forms
                    .entry(simplifier.simplify29(&word.text))
                    .or_insert_with(|| root.clone());
            }
        }
        BestRootResolver { forms, simplifier }
    }
}

fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut hay = haystack.chars();
    needle.chars().all(|c| hay.any(|h| h == c))
}

impl RootResolver for BestRootResolver {
    fn resolve(&self, text: &str, index: &RootIndex) -> Option<String> {
        let text = self.simplifier.simplify29(text);
        if let Some(root) = self.forms.get(&text) {
            return Some(root.clone());
        }

        index
            .roots()
            .filter(|root| is_subsequence(root, &text))
            .max_by(|a, b| {
                a.chars()
                    .count()
                    .cmp(&b.chars().count())
                    .then(index.words(a).len().cmp(&index.words(b).len()))
                    .then(b.cmp(a))
            })
            .map(str::to_string)
    }
}

/// Resolve query text to an indexed root.
pub fn resolve_root(
    text: &str,
    index: &RootIndex,
    resolver: &dyn RootResolver,
) -> Result<String, EngineError> {
    if index.contains(text) {
        return Ok(text.to_string());
    }

    let resolved = resolver
        .resolve(text, index)
        .ok_or_else(|| EngineError::UnresolvableRoot(text.to_string()))?;
    if !index.contains(&resolved) {
        return Err(EngineError::UnindexedRoot {
            text: text.to_string(),
            resolved,
        });
    }

    tracing::debug!(text, root = %resolved, "resolved root");
    Ok(resolved)
}

/// Units among `verses` whose count of words with the root passes `multiplicity`.
///
/// Coarser units are found from words to verses to partitions.
pub fn find_root(
    book: &Book,
    index: &RootIndex,
    resolver: &dyn RootResolver,
    text: &str,
    unit: Unit,
    verses: &[usize],
    multiplicity: Multiplicity,
) -> Result<Vec<Hit>, EngineError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    if matches!(unit, Unit::Letter | Unit::Sentence) {
        return Err(EngineError::InvalidQuery(format!(
            "root search does not run at {} granularity",
            unit
        )));
    }

    let root = resolve_root(text, index, resolver)?;
    let universe: HashSet<usize> = verses.iter().copied().collect();
    let words: Vec<usize> = index
        .words(&root)
        .iter()
        .copied()
        .filter(|&w| universe.contains(&book.words[w].verse))
        .collect();

    let phrase = |w: usize| {
        let word = &book.words[w];
        Phrase {
            verse: word.verse,
            position: word.position,
            text: word.text.clone(),
            mode: book.mode,
        }
    };

    if unit == Unit::Word {
        // Each word holds the root once or not at all
        let rooted: HashSet<usize> = words.iter().copied().collect();
        let hits: Vec<Hit> = verses
            .iter()
            .flat_map(|&v| book.verses[v].words.clone())
            .filter_map(|w| {
                let found = rooted.contains(&w);
                multiplicity.admits(found as usize).then(|| {
                    let phrases = if found { vec![phrase(w)] } else { Vec::new() };
                    Hit::with_phrases(unit, w, phrases)
                })
            })
            .collect();
        tracing::debug!(%unit, %root, hits = hits.len(), "root search");
        return Ok(hits);
    }

    let mut by_verse: HashMap<usize, Vec<Phrase>> = HashMap::new();
    for &w in &words {
        by_verse.entry(book.words[w].verse).or_default().push(phrase(w));
    }
    let per_verse: Vec<(usize, Vec<Phrase>)> = verses
        .iter()
        .map(|v| (*v, by_verse.remove(v).unwrap_or_default()))
        .collect();

    let hits = crate::text_search::group_phrases(book, unit, per_verse, multiplicity);
    tracing::debug!(%unit, %root, hits = hits.len(), "root search");
    Ok(hits)
}
