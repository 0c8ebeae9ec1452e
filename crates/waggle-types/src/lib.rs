//! Shared types for the Waggle backend: REST request/response DTOs, gateway
//! event and command enums, and SQLite timestamp handling.

pub mod api;
pub mod events;
pub mod time;
