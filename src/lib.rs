//! Forum reposter library.
//!
//! Polls a forum's recent-posts API for newly created topics and reposts each one
//! to a social media account, keeping a small cursor file between runs and backing
//! off when the posting API rate limits.

pub mod config;
pub mod constants;
pub mod driver;
pub mod filter;
pub mod forum;
pub mod publisher;
pub mod state;
