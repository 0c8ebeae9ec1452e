//! HTTP surface of the Waggle backend.
//!
//! Handlers stay thin: validate input, run queries on a blocking thread, wrap
//! the result in the `{status, data, error}` envelope. Anything realtime goes
//! out through the gateway dispatcher.

pub mod auth;
pub mod discover;
pub mod error;
pub mod matches;
pub mod matchmaking;
pub mod messages;
pub mod middleware;
pub mod pets;
pub mod photos;
pub mod state;
pub mod users;
