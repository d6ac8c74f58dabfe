//! Domain layer - canonical ad types and pure classification logic
//!
//! Everything in here is I/O free. Infrastructure implements the
//! `repositories` traits against SQLite.

pub mod ad;
pub mod constants;
pub mod error;
pub mod normalizer;
pub mod repositories;
