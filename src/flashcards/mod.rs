//! Flashcard review scheduling
//!
//! This module provides:
//! - Card store (identity-keyed, insertion ordered, optional JSON snapshot)
//! - Doubling/reset interval algorithm
//! - Due card selection

pub mod algorithm;
pub mod models;
pub mod storage;

pub use algorithm::{record_review, select_due};
pub use models::*;
pub use storage::{CardStore, CardStoreError};
