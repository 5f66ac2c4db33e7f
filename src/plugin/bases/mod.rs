//! Specialized plugin contracts
//!
//! Each sub-trait extends [`Plugin`](crate::plugin::Plugin) with the hooks
//! of one plugin family, plus provided methods carrying the shared
//! behaviour of that family (rate limiting, ticket bookkeeping, payloads).

pub mod notify;
pub mod issue;
pub mod data_forwarding;
pub mod tag;
pub mod repository;

pub use notify::NotificationPlugin;
pub use issue::{ErrorPayload, IssueTrackingPlugin, LinkedIssue};
pub use data_forwarding::DataForwardingPlugin;
pub use tag::{TagPlugin, MAX_TAG_VALUE_LENGTH};
pub use repository::{IntegrationRepositoryProvider, RepositoryProvider};
