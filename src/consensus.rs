use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("observation recorded after the group was finalized")]
    Frozen,

    #[error("expected value requested before finalization")]
    NotFinalized,

    #[error("no observations recorded")]
    Empty,
}

/// Majority vote over `(value, path)` observations.
///
/// Files across the tree report the convention they follow (line ending,
/// preamble text); the value backed by the most files becomes the expected
/// convention and every other observation becomes an oddball. Ties resolve
/// to the value encountered earliest.
#[derive(Debug, Clone)]
pub struct ConsistencyGroup<T> {
    /// Insertion order until finalized, then descending by supporter count.
    groups: Vec<(T, Vec<PathBuf>)>,
    oddballs: Vec<(T, PathBuf)>,
    frozen: bool,
}

impl<T> Default for ConsistencyGroup<T> {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            oddballs: Vec::new(),
            frozen: false,
        }
    }
}

impl<T: Clone + Eq> ConsistencyGroup<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation. Fails once the group has been finalized.
    pub fn observe(&mut self, value: T, path: &Path) -> Result<(), ConsensusError> {
        if self.frozen {
            return Err(ConsensusError::Frozen);
        }
        match self.groups.iter_mut().find(|(v, _)| *v == value) {
            Some((_, paths)) => paths.push(path.to_path_buf()),
            None => self.groups.push((value, vec![path.to_path_buf()])),
        }
        Ok(())
    }

    /// Fix the expected value. Idempotent.
    ///
    /// Groups are reordered by descending supporter count; the stable sort
    /// keeps insertion order among equals, so the earliest-seen value wins
    /// a tie.
    pub fn finalize(&mut self) {
        if self.frozen {
            return;
        }
        self.frozen = true;
        self.groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()));
        for (value, paths) in self.groups.iter().skip(1) {
            for path in paths {
                self.oddballs.push((value.clone(), path.clone()));
            }
        }
    }

    /// The majority value. Only valid after [`finalize`](Self::finalize).
    pub fn expected(&self) -> Result<&T, ConsensusError> {
        if !self.frozen {
            return Err(ConsensusError::NotFinalized);
        }
        match self.groups.first() {
            Some((value, _)) => Ok(value),
            None => Err(ConsensusError::Empty),
        }
    }

    /// Every observation whose value diverges from the expected one.
    pub fn oddballs(&self) -> &[(T, PathBuf)] {
        &self.oddballs
    }

    /// All groups; descending by supporter count once finalized.
    pub fn pairs(&self) -> &[(T, Vec<PathBuf>)] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Set that remembers first-seen insertion order.
#[derive(Debug, Clone, Default)]
pub struct OrderedSet<T> {
    items: Vec<T>,
}

impl<T: PartialEq> OrderedSet<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Insert, keeping the first occurrence. Returns whether the item was new.
    pub fn insert(&mut self, item: T) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
