//! The pull request view that reconciliation works on.

use serde::{Deserialize, Serialize};

use super::ids::{PrNumber, RepoId};

/// What is known about the marker label when a target is built.
///
/// Search rows carry their labels, so the bulk scan knows the answer up
/// front. Webhook targets start as `Unknown` and are resolved with a live
/// label fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerLabel {
    Present,
    Absent,
    Unknown,
}

impl MarkerLabel {
    /// Builds a known state from a label list.
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>, marker: &str) -> Self {
        if labels.into_iter().any(|l| l == marker) {
            MarkerLabel::Present
        } else {
            MarkerLabel::Absent
        }
    }
}

/// A single pull request to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationTarget {
    /// Repository the pull request belongs to.
    pub repo: RepoId,

    /// The pull request number.
    pub number: PrNumber,

    /// Login of the pull request author, addressed in the comment.
    pub author: String,

    /// Current title.
    pub title: String,

    /// Merged pull requests are never touched.
    pub merged: bool,

    /// Marker label state, if already known.
    pub marker: MarkerLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_labels_finds_marker() {
        let labels = ["bug", "needs-retitle", "size/S"];
        assert_eq!(
            MarkerLabel::from_labels(labels, "needs-retitle"),
            MarkerLabel::Present
        );
    }

    #[test]
    fn from_labels_is_exact_match() {
        let labels = ["needs-retitle-later", "Needs-Retitle"];
        assert_eq!(
            MarkerLabel::from_labels(labels, "needs-retitle"),
            MarkerLabel::Absent
        );
    }

    #[test]
    fn from_labels_empty() {
        assert_eq!(
            MarkerLabel::from_labels(std::iter::empty(), "needs-retitle"),
            MarkerLabel::Absent
        );
    }
}
