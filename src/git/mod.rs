//! Local git history for repository analysis
//!
//! Provides clones of remote repositories, first-parent history extraction,
//! and evenly spaced sampling of that history.

/// Clone provider for remote repositories
pub mod clone;
/// Evenly spaced commit sampling
pub mod sampler;
/// First-parent history extraction
pub mod walker;

pub use clone::{GitCloneProvider, LocalRepo, RepoProvider};
pub use sampler::{sample, sample_indices};
pub use walker::{CommitInfo, GitWalker};
