//! Friendship lifecycle and social-graph queries.
//!
//! Relationships between two users are an append-only status log; the
//! newest entry is the current status. [`modules::friend`] drives the state
//! machine, [`modules::group`] labels accepted friendships, and
//! [`modules::graph`] serves paginated slices over the result.

pub mod api;
pub mod configs;
pub mod constants;
pub mod middlewares;
pub mod modules;
pub mod store;
pub mod utils;
