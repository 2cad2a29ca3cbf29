//! Query facade.
//!
//! One entry point per query kind, each taking the granularity to report and the scope whose
//! verses form the universe. Blank queries and empty universes give empty results; only the
//! fatal conditions of `EngineError` are reported as errors.

use crate::book::BookStats;
use crate::error::EngineError;
use crate::models::{Hit, Initialization, Prostration, RevelationPlace, Scope, Sentence, Unit};
use crate::number_query::{find_units, Evaluator, Multiplicity, NumberQuery};
use crate::range;
use crate::root_search;
use crate::sentence::{segment_verses, sentence_phrases};
use crate::session::QuerySession;
use crate::similarity::{self, SimilarPair, SimilarityMethod};
use crate::tags::{find_tagged, TagFilter};
use crate::text_search::{TextQuery, TextSearcher};
use crate::word_search::{self, WordQuery};

impl QuerySession {
    pub fn text_searcher(&self) -> TextSearcher<'_> {
        TextSearcher::new(self.book(), self.simplifier(), self.params().with_diacritics)
    }

    /// Units containing matches of a text pattern.
    pub fn find_text(&self, query: &TextQuery, unit: Unit, scope: Scope) -> Result<Vec<Hit>, EngineError> {
        if query.text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.text_searcher().find(query, unit, &self.source_verses(scope))
    }

    /// Units accepted by a boolean word query.
    pub fn find_words(&self, query: &WordQuery, unit: Unit, scope: Scope) -> Result<Vec<Hit>, EngineError> {
        word_search::find_words(&self.text_searcher(), query, unit, &self.source_verses(scope))
    }

    /// Units holding words of the root `text` resolves to.
    pub fn find_root(
        &self,
        text: &str,
        unit: Unit,
        scope: Scope,
        multiplicity: Multiplicity,
    ) -> Result<Vec<Hit>, EngineError> {
        root_search::find_root(
            self.book(),
            self.roots(),
            self.resolver(),
            text,
            unit,
            &self.source_verses(scope),
            multiplicity,
        )
    }

    /// Every sentence reading of the scope's verses.
    pub fn find_sentences(&self, scope: Scope) -> Result<Vec<Sentence>, EngineError> {
        let sentences = segment_verses(self.book(), self.simplifier(), &self.source_verses(scope))?;
        tracing::debug!(?scope, sentences = sentences.len(), "segmentation");
        Ok(sentences)
    }

    /// Single units passing every criterion of `query`.
    pub fn find_numbers(&self, query: &NumberQuery, unit: Unit, scope: Scope) -> Result<Vec<Hit>, EngineError> {
        self.run_numbers(query, unit, scope, |evaluator, candidates| {
            find_units(evaluator, query, unit, candidates)
        })
    }

    /// Runs of consecutive units whose aggregates pass `query`.
    pub fn find_ranges(
        &self,
        query: &NumberQuery,
        unit: Unit,
        scope: Scope,
        show_progress: bool,
    ) -> Result<Vec<Hit>, EngineError> {
        let max_length = self.params().max_range_length;
        self.run_numbers(query, unit, scope, |evaluator, candidates| {
            range::find_ranges(evaluator, query, unit, candidates, max_length, show_progress)
        })
    }

    fn run_numbers<F>(&self, query: &NumberQuery, unit: Unit, scope: Scope, find: F) -> Result<Vec<Hit>, EngineError>
    where
        F: Fn(&Evaluator<'_>, &[usize]) -> Vec<Hit>,
    {
        query.validate()?;
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let evaluator = Evaluator::new(self.book(), self.system());
        let hits = if unit == Unit::Sentence {
            let sentences = self.find_sentences(scope)?;
            let evaluator = evaluator.with_sentences(&sentences);
            let candidates: Vec<usize> = (0..sentences.len()).collect();
            let mut hits = find(&evaluator, &candidates);
            for hit in &mut hits {
                hit.phrases = sentences[hit.range.clone()]
                    .iter()
                    .flat_map(|s| sentence_phrases(self.book(), s))
                    .collect();
            }
            hits
        } else {
            find(&evaluator, &self.source_units(scope, unit))
        };

        tracing::debug!(%unit, ?scope, criteria = query.criteria.len(), hits = hits.len(), "number query");
        Ok(hits)
    }

    /// Verses similar to `reference` at the session's threshold.
    pub fn find_similar(&self, reference: usize, method: SimilarityMethod, scope: Scope) -> Vec<Hit> {
        similarity::find_similar(
            self.book(),
            reference,
            method,
            self.params().similarity_threshold,
            &self.source_verses(scope),
        )
    }

    /// Pairs of mutually similar verses at the session's threshold.
    pub fn find_similar_pairs(&self, method: SimilarityMethod, scope: Scope) -> Vec<SimilarPair> {
        similarity::find_similar_pairs(
            self.book(),
            method,
            self.params().similarity_threshold,
            &self.source_verses(scope),
        )
    }

    pub fn find_prostrations(
        &self,
        kind: Option<Prostration>,
        unit: Unit,
        scope: Scope,
    ) -> Result<Vec<Hit>, EngineError> {
        find_tagged(self.book(), TagFilter::Prostration(kind), unit, &self.source_verses(scope))
    }

    pub fn find_revelation(
        &self,
        place: RevelationPlace,
        unit: Unit,
        scope: Scope,
    ) -> Result<Vec<Hit>, EngineError> {
        find_tagged(self.book(), TagFilter::Revelation(place), unit, &self.source_verses(scope))
    }

    pub fn find_initialized(
        &self,
        kind: Option<Initialization>,
        unit: Unit,
        scope: Scope,
    ) -> Result<Vec<Hit>, EngineError> {
        find_tagged(self.book(), TagFilter::Initialization(kind), unit, &self.source_verses(scope))
    }

    pub fn stats(&self) -> BookStats {
        self.book().stats()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::models::{PartitionKind, SessionParams};
    use crate::number_query::{Comparison, Field, Test};
    use crate::pattern::Wordness;
    use crate::simplify::DiacriticSimplifier;
    use crate::test_support::sample_source;

    fn session() -> QuerySession {
        QuerySession::from_source(
            &sample_source(),
            Arc::new(DiacriticSimplifier),
            SessionParams::default(),
        )
        .unwrap()
    }

    fn starts(hits: &[Hit]) -> Vec<usize> {
        hits.iter().map(|h| h.range.start).collect()
    }

    #[test]
    fn test_blank_queries_are_empty() {
        let session = session();
        let text = session.find_text(&TextQuery::new("  "), Unit::Verse, Scope::Book).unwrap();
        assert!(text.is_empty());
        let numbers = session.find_numbers(&NumberQuery::new(), Unit::Verse, Scope::Book).unwrap();
        assert!(numbers.is_empty());
        let selection = session
            .find_text(&TextQuery::new("الله"), Unit::Verse, Scope::Selection)
            .unwrap();
        assert!(selection.is_empty());
    }

    #[test]
    fn test_diacritic_only_text_is_blank() {
        let session = session();
        let query = TextQuery::new("\u{064E}").multiplicity(Multiplicity::None);
        let hits = session.find_text(&query, Unit::Verse, Scope::Book).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_exclusion_only_word_query() {
        let session = session();
        let query = WordQuery::new("-الله").wordness(Wordness::WholeWord);
        let hits = session.find_words(&query, Unit::Verse, Scope::Book).unwrap();
        // Only the opening verse holds the whole word
        assert_eq!(starts(&hits), (1..8).collect::<Vec<_>>());
    }

    #[test]
    fn test_chaining_through_result_scope() {
        let session = session();
        let query = TextQuery::new("الرحمن").wordness(Wordness::WholeWord);
        let first = session.find_text(&query, Unit::Verse, Scope::Book).unwrap();
        assert_eq!(starts(&first), vec![0, 2]);

        let chained = session.with_result(&first);
        let two_words = NumberQuery::new().with(Field::WordCount, Test::equal(2));
        let second = chained.find_numbers(&two_words, Unit::Verse, Scope::Result).unwrap();
        assert_eq!(starts(&second), vec![2]);
    }

    #[test]
    fn test_sentence_numbers_carry_phrases() {
        let session = session().with_selection([0, 1]);
        let query = NumberQuery::new().with(Field::WordCount, Test::literal(Comparison::GreaterThan, 0));
        let hits = session.find_numbers(&query, Unit::Sentence, Scope::Selection).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| !h.phrases.is_empty()));
    }

    #[test]
    fn test_sum_on_value_is_invalid() {
        let session = session();
        let query = NumberQuery::new().with(Field::Value, Test::literal(Comparison::EqualSum, 6));
        let result = session.find_numbers(&query, Unit::Verse, Scope::Book);
        assert!(matches!(result, Err(EngineError::InvalidQuery(_))));
    }

    #[test]
    fn test_tags_and_stats() {
        let session = session();
        let chapter = Unit::Partition(PartitionKind::Chapter);
        let prostrations = session.find_prostrations(None, chapter, Scope::Book).unwrap();
        assert_eq!(starts(&prostrations), vec![2]);
        assert_eq!(session.stats().verses, 8);
    }
}
