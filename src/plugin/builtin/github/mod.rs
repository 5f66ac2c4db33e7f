//! GitHub integration
//!
//! Issue tracking plugin plus the repository providers registered under the
//! `repository.provider` and `integration-repository.provider` bindings.

pub mod client;
pub mod issues;
pub mod repository;

pub use client::{GitHubClient, DEFAULT_API_URL};
pub use issues::GitHubPlugin;
pub use repository::{GitHubIntegrationRepositoryProvider, GitHubRepositoryProvider};
