//! Persistent job and download-history store (SQLite via sqlx).
//!
//! Holds the durable projection of every job (`download_jobs`) and the
//! immutable history of completed downloads (`downloads`). Only the
//! controller writes job rows.

pub mod db;
pub mod types;
mod history;
mod jobs;

pub use db::*;
pub use jobs::INTERRUPTED_MESSAGE;
pub use types::*;

#[cfg(test)]
mod tests;
