//! Small diacritised corpus shared by the unit tests.

use crate::book::Book;
use crate::models::{
    ChapterSource, CorpusSource, Initialization, PartitionKind, PartitionSource, Prostration,
    RevelationPlace, RootAnnotation, VerseRef, VerseSource,
};
use crate::simplify::{DiacriticSimplifier, TextMode};
use crate::stopmark::StopMark;

fn verse(text: &str) -> VerseSource {
    VerseSource {
        text: text.to_string(),
        stop_mark: StopMark::MustStop,
        ..Default::default()
    }
}

fn at(chapter: usize, verse: usize) -> VerseRef {
    VerseRef { chapter, verse }
}

fn root(chapter: usize, verse: usize, word: usize, root: &str) -> RootAnnotation {
    RootAnnotation {
        verse: at(chapter, verse),
        word,
        root: root.to_string(),
    }
}

/// Three short chapters:
///
/// 1. بسم الله الرحمن الرحيم / الحمد لله رب العلمين / الرحمن الرحيم
/// 2. الم / ذلك الكتب لا ريب ∴ فيه ∴ هدي للمتقين / الذين يؤمنون بالغيب ۖ ويقيمون الصلوه
/// 3. الحمد لله الذي انزل علي عبده الكتب ولم يجعل له عوجا ۜ / قيما لينذر باسا شديدا
pub(crate) fn sample_source() -> CorpusSource {
    let mut key = verse("الٓمٓ");
    key.initialization = Some(Initialization::Key);

    let mut prostration = verse("قَيِّمًا لِّيُنذِرَ بَأْسًا شَدِيدًا");
    prostration.prostration = Some(Prostration::Obligatory);

    CorpusSource {
        chapters: vec![
            ChapterSource {
                number: 1,
                name: "الفاتحة".to_string(),
                revelation_place: RevelationPlace::Makkah,
                revelation_order: 5,
                verses: vec![
                    verse("بِسْمِ ٱللَّهِ ٱلرَّحْمَٰنِ ٱلرَّحِيمِ"),
                    verse("ٱلْحَمْدُ لِلَّهِ رَبِّ ٱلْعَٰلَمِينَ"),
                    verse("ٱلرَّحْمَٰنِ ٱلرَّحِيمِ"),
                ],
            },
            ChapterSource {
                number: 2,
                name: "البقرة".to_string(),
                revelation_place: RevelationPlace::Madinah,
                revelation_order: 87,
                verses: vec![
                    key,
                    verse("ذَٰلِكَ ٱلْكِتَٰبُ لَا رَيْبَ ۛ فِيهِ ۛ هُدًى لِّلْمُتَّقِينَ"),
                    verse("ٱلَّذِينَ يُؤْمِنُونَ بِٱلْغَيْبِ ۖ وَيُقِيمُونَ ٱلصَّلَوٰةَ"),
                ],
            },
            ChapterSource {
                number: 3,
                name: "الكهف".to_string(),
                revelation_place: RevelationPlace::Makkah,
                revelation_order: 69,
                verses: vec![
                    verse("ٱلْحَمْدُ لِلَّهِ ٱلَّذِىٓ أَنزَلَ عَلَىٰ عَبْدِهِ ٱلْكِتَٰبَ وَلَمْ يَجْعَل لَّهُۥ عِوَجَا ۜ"),
                    prostration,
                ],
            },
        ],
        partitions: vec![
            PartitionSource {
                kind: PartitionKind::Page,
                starts: vec![at(1, 1), at(2, 1)],
            },
            PartitionSource {
                kind: PartitionKind::Part,
                starts: vec![at(1, 1)],
            },
            PartitionSource {
                kind: PartitionKind::Bowing,
                starts: vec![at(1, 1), at(2, 1), at(3, 1)],
            },
        ],
        roots: vec![
            root(1, 1, 1, "سمو"),
            root(1, 1, 2, "اله"),
            root(1, 1, 3, "رحم"),
            root(1, 1, 4, "رحم"),
            root(1, 2, 1, "حمد"),
            root(1, 2, 2, "اله"),
            root(1, 2, 3, "ربب"),
            root(1, 3, 1, "رحم"),
            root(1, 3, 2, "رحم"),
            root(2, 2, 2, "كتب"),
            root(3, 1, 1, "حمد"),
            root(3, 1, 7, "كتب"),
        ],
    }
}

pub(crate) fn sample_book(mode: TextMode) -> Book {
    Book::build(&sample_source(), &DiacriticSimplifier, mode).expect("sample corpus builds")
}

/// Book of unnamed chapters from plain verse texts; every verse ends in MustStop.
pub(crate) fn book_of(chapters: &[&[&str]], mode: TextMode) -> Book {
    let source = CorpusSource {
        chapters: chapters
            .iter()
            .enumerate()
            .map(|(i, verses)| ChapterSource {
                number: i + 1,
                verses: verses.iter().map(|text| verse(text)).collect(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };
    Book::build(&source, &DiacriticSimplifier, mode).expect("corpus builds")
}
