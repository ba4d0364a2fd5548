//! wsync GitHub - GitHub implementation of the wsync code host capabilities
//!
//! [`GitHubClient`] acts as the author of branches and pull requests,
//! [`GitHubApprover`] approves them with a separate token.

mod approve;
mod client;
mod error;
mod pr;

pub use approve::GitHubApprover;
pub use client::GitHubClient;
pub use error::{Error, Result};
