//! Data layer module
//!
//! Handles all data persistence:
//! - Users and login sessions
//! - Posts and messages

mod database;
mod models;

pub use database::Database;
pub use models::*;

#[cfg(test)]
mod database_test;
