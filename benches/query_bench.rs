//! Criterion benchmarks for pattern, range and similarity search.
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mushaf_query::models::{ChapterSource, VerseSource};
use mushaf_query::prelude::*;

const WORDS: [&str; 8] = ["الحمد", "لله", "رب", "العلمين", "الرحمن", "الرحيم", "ملك", "يوم"];

/// Synthetic corpus of `chapters` chapters with `verses` verses each.
fn create_session(chapters: usize, verses: usize) -> QuerySession {
    let source = CorpusSource {
        chapters: (0..chapters)
            .map(|c| ChapterSource {
                number: c + 1,
                verses: (0..verses)
                    .map(|v| {
                        let length = 3 + (c + v) % 5;
                        let text: Vec<&str> = (0..length).map(|w| WORDS[(c * 7 + v * 3 + w) % WORDS.len()]).collect();
                        VerseSource {
                            text: text.join(" "),
                            stop_mark: StopMark::MustStop,
                            ..Default::default()
                        }
                    })
                    .collect(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };
    QuerySession::from_source(&source, Arc::new(DiacriticSimplifier), SessionParams::default())
        .expect("synthetic corpus builds")
}

fn bench_text_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_search");

    for chapters in [10, 50, 100] {
        let session = create_session(chapters, 20);
        let whole = TextQuery::new("الرحمن").wordness(Wordness::WholeWord);
        let part = TextQuery::new("حم").wordness(Wordness::PartOfWord);

        group.bench_with_input(BenchmarkId::new("whole_word", chapters), &chapters, |b, _| {
            b.iter(|| session.find_text(black_box(&whole), Unit::Verse, Scope::Book))
        });

        group.bench_with_input(BenchmarkId::new("part_of_word", chapters), &chapters, |b, _| {
            b.iter(|| session.find_text(black_box(&part), Unit::Word, Scope::Book))
        });
    }

    group.finish();
}

fn bench_range_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_search");

    for chapters in [5, 20, 50] {
        let session = create_session(chapters, 20);

        // Explicit window length
        let fixed = NumberQuery::new()
            .with(Field::VerseCount, Test::equal(7))
            .with(Field::WordCount, Test::Classify(NumberKind::Prime));
        group.bench_with_input(BenchmarkId::new("fixed_length", chapters), &chapters, |b, _| {
            b.iter(|| session.find_ranges(black_box(&fixed), Unit::Verse, Scope::Book, false))
        });

        // Every length up to the ceiling
        let open = NumberQuery::new().with(Field::LetterCount, Test::literal(Comparison::EqualSum, 1000));
        group.bench_with_input(BenchmarkId::new("all_lengths", chapters), &chapters, |b, _| {
            b.iter(|| session.find_ranges(black_box(&open), Unit::Verse, Scope::Book, false))
        });
    }

    group.finish();
}

fn bench_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");

    for chapters in [5, 10, 20] {
        let session = create_session(chapters, 20);

        group.bench_with_input(BenchmarkId::new("pairs_text", chapters), &chapters, |b, _| {
            b.iter(|| session.find_similar_pairs(black_box(SimilarityMethod::Text), Scope::Book))
        });
    }

    group.finish();
}

fn bench_sentences(c: &mut Criterion) {
    let session = create_session(50, 20);

    c.bench_function("segment_book", |b| {
        b.iter(|| session.find_sentences(black_box(Scope::Book)))
    });
}

criterion_group!(
    benches,
    bench_text_search,
    bench_range_search,
    bench_similarity,
    bench_sentences,
);
criterion_main!(benches);
