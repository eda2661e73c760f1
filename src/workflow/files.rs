//! The working file set.

use std::path::PathBuf;

/// Ordered paths under consideration for editing.
///
/// Grows as edits add files and as diagnoses name more of them. Never
/// shrinks, and holds each path once, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct WorkingFileSet {
    files: Vec<PathBuf>,
}

impl WorkingFileSet {
    pub fn new<I: IntoIterator<Item = PathBuf>>(initial: I) -> Self {
        let mut set = Self::default();
        set.merge(initial);
        set
    }

    /// Appends unseen paths and returns how many were new.
    pub fn merge<I: IntoIterator<Item = PathBuf>>(&mut self, paths: I) -> usize {
        let before = self.files.len();
        for path in paths {
            if !self.files.contains(&path) {
                self.files.push(path);
            }
        }
        self.files.len() - before
    }

    pub fn as_slice(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn into_vec(self) -> Vec<PathBuf> {
        self.files
    }
}
