//! Storage is organized through [ledger_store::JsonFileStore].
//! The basic idea is:
//!   - There is a single ledger file in the application directory.
//!   - Top level keys are domains, each holding a map of `YYYY-MM-DD` day keys to seconds.
//!   - Writers do a read-modify-write under an exclusive file lock.

pub mod entities;
pub mod ledger_store;
