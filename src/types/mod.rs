//! Core domain types for the needs-retitle bot.

pub mod ids;
pub mod target;

pub use ids::{CommentId, DeliveryId, PrNumber, RepoId};
pub use target::{MarkerLabel, ReconciliationTarget};
