//! Deduplicating aggregation of extracted records
//!
//! Every raw record is prefixed with its machine's OS label triple and
//! inserted into an ordered set keyed by full field-tuple equality. The set
//! is simultaneously the dedup structure and the deterministic serialization
//! order: iteration is lexicographic over (label, record fields), so
//! repeated runs over unchanged input write byte-identical files.

use std::collections::BTreeSet;

/// The `(os_family, os_type, os_version)` triple attached to every extracted
/// record. Deliberately carries no machine-name discriminator: two machines
/// with identical OS labels producing the same raw record collapse to one row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Label {
    pub os_family: String,
    pub os_type: String,
    pub os_version: String,
}

/// A raw record tagged with its owning machine's label; the unit of
/// deduplication
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Labeled<R> {
    pub label: Label,
    pub record: R,
}

/// An order-irrelevant set of unique labeled records, accumulated across
/// artifacts and, in fleet-wide mode, across machines
#[derive(Debug, Clone, Default)]
pub struct ResultSet<R: Ord> {
    rows: BTreeSet<Labeled<R>>,
}

impl<R: Ord> ResultSet<R> {
    pub fn new() -> Self {
        Self {
            rows: BTreeSet::new(),
        }
    }

    /// Insert one labeled record. Returns false if it was already present;
    /// inserting a duplicate never changes the set.
    pub fn insert(&mut self, row: Labeled<R>) -> bool {
        self.rows.insert(row)
    }

    /// Label a batch of raw records and insert them all
    pub fn absorb<I>(&mut self, label: &Label, records: I)
    where
        I: IntoIterator<Item = R>,
    {
        for record in records {
            self.insert(Labeled {
                label: label.clone(),
                record,
            });
        }
    }

    /// Set union with another result set. Union is associative and
    /// commutative, so partial sets built from disjoint artifact subsets
    /// merge to the same final set in any order.
    pub fn union(&mut self, other: ResultSet<R>) {
        self.rows.extend(other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in their deterministic serialization order
    pub fn iter(&self) -> impl Iterator<Item = &Labeled<R>> {
        self.rows.iter()
    }

    pub fn contains(&self, row: &Labeled<R>) -> bool {
        self.rows.contains(row)
    }
}

/// Label a batch of raw records as one result set
pub fn aggregate<R: Ord>(label: &Label, records: Vec<R>) -> ResultSet<R> {
    let mut set = ResultSet::new();
    set.absorb(label, records);
    set
}
