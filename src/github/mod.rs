//! GitHub REST API: resources, board loading and issue mutations.

pub mod api_types;
pub mod client;
pub mod issue_manager;
pub mod types;

pub use client::GithubClient;
pub use issue_manager::{IssueManager, TimeLabels};
