//! # CLI Behavior
//!
//! This is one UI client for mdview. It is the only place that knows about
//! terminal I/O, exit codes and output formatting.
//!
//! ## Sources
//!
//! Commands that take a document accept a file path, an http(s) URL, `-`
//! for text piped on stdin, `@sample` for the built-in sample, or `@N` for
//! the Nth entry of the recent list (newest is `@1`).
//!
//! `view`, `toc`, `find` and `copy` open files read-only. `edit` keeps a
//! write handle unless `--read-only` is given, so saving overwrites the file
//! in place; everything else is saved as a numbered copy in the save
//! directory (`save-dir` in config, else the current directory).
//!
//! ## Output
//!
//! Commands that print a document (`view`, `find --html`) send status lines
//! to stderr so stdout stays clean for redirection.
//!
//! ## Environment
//!
//! - `MDV_HOME`: data directory holding `store.json` and `config.json`
//! - `MDV_LOG`: tracing filter, `warn` by default (`--verbose` means `debug`)
//! - `EDITOR` / `VISUAL`: editor for `mdv edit`

mod commands;
mod print;
pub mod setup;

pub use commands::run;
