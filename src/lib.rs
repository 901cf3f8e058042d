//! # jrocket
//!
//! Maps repository files to webhooks and notifies them when the files change.
//!
//! - [`config`]: named configurations stored as JSON, one file each.
//! - [`git`]: the cached working copy and the change set of the last N commits.
//! - [`publish`]: matching changed files to webhooks and sending the POSTs.
//! - [`docker`]: daemon and buildx builder checks.
//! - [`log`]: the logger handed to every component.

pub mod app;
pub mod cli;
pub mod config;
pub mod docker;
pub mod error;
pub mod git;
pub mod log;
pub mod publish;
