//! "Top N" rankings.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankEntry {
    pub label: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranking {
    pub entries: Vec<RankEntry>,
}

impl Ranking {
    /// Highest value first; ties keep their input order. Repeated labels
    /// are summed into their first occurrence.
    pub fn build<I>(entries: I, limit: Option<usize>) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut merged: indexmap::IndexMap<String, i64> = indexmap::IndexMap::new();
        for (label, value) in entries {
            *merged.entry(label).or_insert(0) += value;
        }
        let mut entries: Vec<RankEntry> = merged
            .into_iter()
            .map(|(label, value)| RankEntry { label, value })
            .collect();
        entries.sort_by(|a, b| b.value.cmp(&a.value));
        if let Some(n) = limit {
            entries.truncate(n);
        }
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(r: &Ranking) -> Vec<&str> {
        r.entries.iter().map(|e| e.label.as_str()).collect()
    }

    #[test]
    fn sorted_descending_with_stable_ties() {
        let r = Ranking::build(
            [
                ("alice".to_string(), 3),
                ("bob".to_string(), 9),
                ("carol".to_string(), 3),
            ],
            None,
        );
        assert_eq!(labels(&r), vec!["bob", "alice", "carol"]);
    }

    #[test]
    fn limit_and_merge() {
        let r = Ranking::build(
            [
                ("I10001".to_string(), 1),
                ("I10002".to_string(), 2),
                ("I10001".to_string(), 5),
            ],
            Some(1),
        );
        assert_eq!(r.entries, vec![RankEntry { label: "I10001".into(), value: 6 }]);
    }
}
