use crate::record::StudentRecord;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

/// The loaded student file. Never modified after [`crate::load`].
#[derive(Debug, Clone, Default)]
pub struct StudentTable {
    records: Vec<StudentRecord>,
}

impl StudentTable {
    pub fn new(records: Vec<StudentRecord>) -> Self {
        StudentTable { records }
    }

    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A view over every record.
    pub fn all(&self) -> Subset<'_> {
        Subset {
            rows: self.records.iter().collect(),
        }
    }

    /// Distinct modalities in file order.
    pub fn modalities(&self) -> Vec<&str> {
        self.all().distinct(|r| r.modality.as_str())
    }

    /// Distinct courses of `modality` in file order.
    pub fn courses(&self, modality: &str) -> Vec<&str> {
        self.all()
            .filter_by_modality(modality)
            .distinct(|r| r.course.as_str())
    }
}

/// Records selected from a [`StudentTable`] by borrowing; filtering a
/// subset yields a new subset and leaves the table untouched.
#[derive(Debug, Clone, Default)]
pub struct Subset<'a> {
    rows: Vec<&'a StudentRecord>,
}

impl<'a> Subset<'a> {
    pub fn from_rows(rows: Vec<&'a StudentRecord>) -> Self {
        Subset { rows }
    }

    pub fn filter<F>(&self, predicate: F) -> Subset<'a>
    where
        F: Fn(&StudentRecord) -> bool,
    {
        Subset {
            rows: self.rows.iter().copied().filter(|r| predicate(*r)).collect(),
        }
    }

    /// Exact, case-sensitive match.
    pub fn filter_by_modality(&self, modality: &str) -> Subset<'a> {
        self.filter(|r| r.modality == modality)
    }

    /// Exact, case-sensitive match.
    pub fn filter_by_course(&self, course: &str) -> Subset<'a> {
        self.filter(|r| r.course == course)
    }

    pub fn dropouts(&self) -> Subset<'a> {
        self.filter(StudentRecord::is_dropout)
    }

    pub fn non_dropouts(&self) -> Subset<'a> {
        self.filter(|r| !r.is_dropout())
    }

    /// Groups rows by `key`, emitted in ascending key order. Every group is
    /// non-empty.
    pub fn group_by<K, F>(&self, key: F) -> Vec<(K, Subset<'a>)>
    where
        K: Ord,
        F: Fn(&'a StudentRecord) -> K,
    {
        let mut groups: BTreeMap<K, Vec<&'a StudentRecord>> = BTreeMap::new();
        for row in self.rows.iter().copied() {
            groups.entry(key(row)).or_default().push(row);
        }
        groups
            .into_iter()
            .map(|(k, rows)| (k, Subset { rows }))
            .collect()
    }

    /// Distinct keys in first-seen order.
    pub fn distinct<K, F>(&self, key: F) -> Vec<K>
    where
        K: Eq + Hash + Clone,
        F: Fn(&'a StudentRecord) -> K,
    {
        let mut seen = HashSet::new();
        let mut keys = vec![];
        for row in self.rows.iter().copied() {
            let k = key(row);
            if seen.insert(k.clone()) {
                keys.push(k);
            }
        }
        keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a StudentRecord> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn dropout_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_dropout()).count()
    }
}
