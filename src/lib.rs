//! Per-site browsing time tracker. A native messaging host records how long each website stays
//! focused in the browser, and a cli reports the time per day and per week in the terminal.
//!

pub mod cli;
pub mod daemon;
pub mod utils;
