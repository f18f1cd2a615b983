//! # mdview Architecture
//!
//! mdview is a markdown viewer core: it loads a document from a file, a URL,
//! pasted text or the built-in sample, renders it, and saves edits either by
//! overwriting the file it came from or by writing a numbered copy
//! (`note(1).md`, `note(2).md`, ...). Every opened document is kept as a
//! snapshot in an on-device recent list.
//!
//! Like any library with a CLI client, the core makes no terminal
//! assumptions; `mdv` is one UI on top of it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (cli/, wired by main.rs)                         │
//! │  - Parses arguments, prints results, sets up logging        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Owns store + session, maps recent numbers to ids         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - Load, save resolution, recent list, prefs, viewing       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Storage Layer (store/)                                     │
//! │  - KeyValueStore trait, FileStore and MemoryStore           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failures
//!
//! A failed load, save or fetch is not an `Err`: commands report it as an
//! error-level [`commands::CmdMessage`] and leave the session usable. `Err`
//! is reserved for the store itself misbehaving.
//!
//! ## Persisted keys
//!
//! See [`store`] for the key space shared by the theme, the recent list,
//! the save-as counters and scroll memory.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: Business logic per action
//! - [`store`]: Key-value storage abstraction and implementations
//! - [`naming`]: Numbered save-as names and their counters
//! - [`recent`]: Recent list with content snapshots
//! - [`session`]: The open document
//! - [`model`]: Document sources, recent entries, theme, mode
//! - [`render`]: Markdown to HTML, TOC, code blocks
//! - [`find`]: Find-in-document matching and position
//! - [`fetch`]: URL loading
//! - [`emit`]: Writing numbered copies out
//! - [`config`]: Configuration file
//! - [`editor`]: External editor integration
//! - [`clipboard`]: Cross-platform clipboard support
//! - [`error`]: Error types

pub mod api;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod editor;
pub mod emit;
pub mod error;
pub mod fetch;
pub mod find;
pub mod model;
pub mod naming;
pub mod recent;
pub mod render;
pub mod session;
pub mod store;
