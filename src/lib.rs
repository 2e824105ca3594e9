//! promptsmith library crate
//!
//! Exposes the core modules so benchmarks can exercise the editor, history
//! and render paths without going through CLI startup.

pub mod app;
pub mod catalog;
pub mod config;
pub mod draft;
pub mod editor;
pub mod history;
pub mod llm;
pub mod logging;
pub mod store;
pub mod templates;
pub mod ui;
pub mod util;
