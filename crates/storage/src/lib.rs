#![forbid(unsafe_code)]

//! Storage adapters for challenges and daily progress: repository traits,
//! an in-memory implementation for tests, and a `SQLite` backend.

pub mod repository;
pub mod sqlite;
