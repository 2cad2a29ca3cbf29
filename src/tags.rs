//! Verse tag searches: prostration, revelation place and chapter initialization.
//!
//! Tags live on verses. At partition granularity a partition is reported when any of its
//! verses inside the universe carries the tag.

use crate::book::Book;
use crate::error::EngineError;
use crate::models::{Hit, Initialization, Prostration, RevelationPlace, Unit, Verse};

/// Which verses a tag search keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagFilter {
    /// `None` accepts either prostration kind
    Prostration(Option<Prostration>),
    Revelation(RevelationPlace),
    /// `None` accepts Key and PartOfKey openings
    Initialization(Option<Initialization>),
}

impl TagFilter {
    pub fn accepts(self, verse: &Verse) -> bool {
        match self {
            TagFilter::Prostration(wanted) => match (wanted, verse.prostration) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(wanted), Some(found)) => wanted == found,
            },
            TagFilter::Revelation(place) => verse.revelation_place == place,
            TagFilter::Initialization(wanted) => match (wanted, verse.initialization) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(wanted), Some(found)) => wanted == found,
            },
        }
    }
}

/// Units among `verses` carrying the tag.
pub fn find_tagged(
    book: &Book,
    filter: TagFilter,
    unit: Unit,
    verses: &[usize],
) -> Result<Vec<Hit>, EngineError> {
    let tagged = verses
        .iter()
        .copied()
        .filter(|&v| filter.accepts(&book.verses[v]));

    let hits: Vec<Hit> = match unit {
        Unit::Verse => tagged.map(|v| Hit::single(unit, v)).collect(),
        Unit::Partition(kind) => {
            let mut partitions: Vec<usize> =
                tagged.filter_map(|v| book.partition_of(kind, v)).collect();
            partitions.dedup();
            partitions.into_iter().map(|p| Hit::single(unit, p)).collect()
        }
        other => {
            return Err(EngineError::InvalidQuery(format!(
                "tag search runs on verses and partitions, not {}",
                other
            )))
        }
    };

    tracing::debug!(?filter, %unit, hits = hits.len(), "tag search");
    Ok(hits)
}
