//! penacq - acquisition of administrative penalty disclosure records.
//!
//! Walks the paginated disclosure listings of a financial regulator's
//! website, opens each announcement's detail page, and normalizes the
//! irregular penalty tables found there into structured records.

pub mod cli;
pub mod config;
pub mod crawl;
pub mod error;
pub mod fetch;
pub mod models;
pub mod parse;
pub mod table;
pub mod text;
