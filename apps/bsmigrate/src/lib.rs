//! bsmigrate core library.
//!
//! Converts Bootstrap 3 markup, templates and stylesheets to Bootstrap 5 and
//! reports residual issues that need manual follow-up.
//!
//! High-level modules:
//! - `classify`: File kind from the file name.
//! - `rewrite`: Ordered rewrite stages (CDN, dismissible header, attributes,
//!   classes, selectors, navigation).
//! - `detect`: Line and whole-document issue detection on original content.
//! - `aggregate`: Folding per-file records into a `ProjectSummary`.
//! - `strategy`: Optional external conversion strategy.
//! - `engine`: Parallel orchestration with cancellation and fallback.
//! - `models`: Data models and the immutable rule tables.
//! - `config`: Discovery and effective configuration resolution.
//! - `sources` / `package`: Reading inputs and writing converted files.
//! - `output`: Human/JSON printers.
//! - `cli`, `errors`, `utils`: Supporting pieces.
pub mod aggregate;
pub mod classify;
pub mod cli;
pub mod config;
pub mod detect;
pub mod engine;
pub mod errors;
pub mod models;
pub mod output;
pub mod package;
pub mod rewrite;
pub mod sources;
pub mod strategy;
pub mod utils;
