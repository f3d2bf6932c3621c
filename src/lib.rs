//! Flashcard review scheduler.
//!
//! [`flashcards`] holds the card store and the doubling/reset interval
//! algorithm; [`server`] exposes them over HTTP.

pub mod config;
pub mod flashcards;
pub mod server;

pub use config::ServerConfig;
pub use flashcards::{Card, CardStore, CardStoreError, Outcome, ReviewUpdate};
