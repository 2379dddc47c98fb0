use crate::neighborhood::{LocationHint, NeighborhoodRecord};
use strsim::normalized_levenshtein;

/// A match must score strictly above this to be used for prompt context.
pub const MATCH_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult<'a> {
    pub record: Option<&'a NeighborhoodRecord>,
    pub score: f64,
}

impl<'a> MatchResult<'a> {
    fn none() -> Self {
        Self {
            record: None,
            score: 0.0,
        }
    }

    pub fn confident(&self) -> Option<&'a NeighborhoodRecord> {
        self.record.filter(|_| self.score > MATCH_THRESHOLD)
    }

    pub fn location(&self) -> Option<LocationHint> {
        self.confident().map(NeighborhoodRecord::location)
    }
}

/// Similarity in `[0, 1]` between a free-text query and a neighborhood name.
///
/// The name is slid over the query one character at a time and each window is
/// scored with normalized Levenshtein similarity, so a name mentioned anywhere
/// in a longer sentence scores as if it were asked alone. Queries shorter than
/// the name are compared whole.
pub fn similarity(query: &str, name: &str) -> f64 {
    let query = query.trim().to_lowercase();
    let name = name.trim().to_lowercase();
    if query.is_empty() || name.is_empty() {
        return 0.0;
    }
    if query.contains(&name) {
        return 1.0;
    }

    let query_chars = query.chars().collect::<Vec<_>>();
    let width = name.chars().count();
    if query_chars.len() < width {
        return normalized_levenshtein(&query, &name);
    }

    query_chars
        .windows(width)
        .map(|window| normalized_levenshtein(&window.iter().collect::<String>(), &name))
        .fold(0.0, f64::max)
}

/// Highest-scoring record for `query`. Ties keep the earlier record.
pub fn best_match<'a>(query: &str, records: &'a [NeighborhoodRecord]) -> MatchResult<'a> {
    if query.trim().is_empty() {
        return MatchResult::none();
    }

    let mut best = MatchResult::none();
    for record in records {
        let score = similarity(query, &record.name);
        if best.record.is_none() || score > best.score {
            best = MatchResult {
                record: Some(record),
                score,
            };
        }
    }

    best
}
