//! Synthesizes an RSS 2.0 feed of a user's unread Instapaper items.
//!
//! A generation cycle logs in (or reuses a supplied session cookie), joins the
//! unread list with the account's RSS export to recover publish dates, fetches
//! the read view of the first few items, and renders the result.

pub mod config;
pub mod content;
pub mod feed;
pub mod generator;
pub mod remote;
pub mod storage;
pub mod util;

pub use config::Config;
pub use generator::{FeedGenerator, GenerateError};
