//! Sorted, de-duplicated sets of 1-based line numbers.
//!
//! Every piece of diff/violation logic in this crate reduces to set
//! operations over line numbers, so they get a dedicated type instead
//! of ad-hoc `Vec<u32>` juggling.

use serde::Serialize;

/// A set of positive line numbers, stored sorted ascending without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LineSet(Vec<u32>);

impl LineSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a line number, keeping the storage sorted and unique.
    pub fn insert(&mut self, line: u32) {
        if let Err(pos) = self.0.binary_search(&line) {
            self.0.insert(pos, line);
        }
    }

    pub fn contains(&self, line: u32) -> bool {
        self.0.binary_search(&line).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lines present in both sets.
    pub fn intersect(&self, other: &LineSet) -> LineSet {
        LineSet(self.0.iter().copied().filter(|l| other.contains(*l)).collect())
    }

    /// Lines present in either set.
    pub fn union(&self, other: &LineSet) -> LineSet {
        let mut merged = self.clone();
        for line in other.iter() {
            merged.insert(line);
        }
        merged
    }

    /// Lines present in `self` but not in `other`.
    pub fn difference(&self, other: &LineSet) -> LineSet {
        LineSet(self.0.iter().copied().filter(|l| !other.contains(*l)).collect())
    }

    /// Remove every line that appears in `other`.
    pub fn remove_all(&mut self, other: &LineSet) {
        self.0.retain(|l| !other.contains(*l));
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

impl FromIterator<u32> for LineSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut lines: Vec<u32> = iter.into_iter().collect();
        lines.sort_unstable();
        lines.dedup();
        Self(lines)
    }
}

impl Extend<u32> for LineSet {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        for line in iter {
            self.insert(line);
        }
    }
}

impl From<Vec<u32>> for LineSet {
    fn from(lines: Vec<u32>) -> Self {
        lines.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_keeps_sorted_unique() {
        let mut set = LineSet::new();
        set.insert(5);
        set.insert(2);
        set.insert(5);
        set.insert(9);
        assert_eq!(set.as_slice(), &[2, 5, 9]);
    }

    #[test]
    fn test_from_iter_dedups() {
        let set: LineSet = vec![3, 1, 3, 2, 1].into_iter().collect();
        assert_eq!(set.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_intersect_and_union() {
        let a: LineSet = vec![1, 2, 3, 5].into();
        let b: LineSet = vec![2, 5, 8].into();
        assert_eq!(a.intersect(&b).as_slice(), &[2, 5]);
        assert_eq!(a.union(&b).as_slice(), &[1, 2, 3, 5, 8]);
    }

    #[test]
    fn test_remove_all() {
        let mut a: LineSet = vec![1, 2, 3, 4].into();
        let b: LineSet = vec![2, 4, 6].into();
        a.remove_all(&b);
        assert_eq!(a.as_slice(), &[1, 3]);
    }

    #[test]
    fn test_difference() {
        let a: LineSet = vec![1, 2, 3].into();
        let b: LineSet = vec![2].into();
        assert_eq!(a.difference(&b).as_slice(), &[1, 3]);
    }
}
