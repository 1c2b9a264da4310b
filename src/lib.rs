//! Exam ticket flashcards for the terminal.
//!
//! Tickets are loaded from a JSON file served by an origin (HTTP or a local
//! directory), shown one card at a time, and study progress is kept in a
//! small key-value store. An optional cache worker keeps the origin's assets
//! on disk so the deck still opens offline.

pub mod app;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod input;
pub mod loader;
pub mod logging;
pub mod net;
pub mod session;
pub mod storage;
pub mod ticket;
pub mod ui;
pub mod worker;
