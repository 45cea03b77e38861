//! Persistence adapters: repository contracts, in-memory fakes, and the
//! `SQLite` backend.

#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;
