//! Text Wrapped - yearly iMessage statistics
//!
//! A Rust library that loads an iMessage `chat.db` image and computes the
//! numbers behind a "year in texts" slideshow.
//!
//! # Features
//!
//! - Load a database image (or a SQL dump) into memory
//! - Self-sent totals, top senders and a per-month or per-weekday histogram
//! - Top words and emoji for the three most-messaged correspondents
//! - The most balanced long-running conversation
//! - Optional contact names from a vCard export, or pseudonyms

/// Configuration management
pub mod config;
/// Contact names and pseudonyms
pub mod contacts;
/// Per-correspondent word and emoji rankings
pub mod correspondent;
/// Error types
pub mod error;
/// Logging setup and utilities
pub mod logging;
/// Metrics collection
pub mod metrics;
/// Data models and structures
pub mod models;
/// Tokenizer and emoji extraction
pub mod nlp;
/// Aggregate SQL queries
pub mod queries;
/// Report assembly
pub mod report;
/// Database schema definitions
pub mod schema;
/// Analysis pipeline
pub mod service;
/// In-memory message database
pub mod store;
/// Apple-epoch timestamps
pub mod timestamp;
/// Input validation and sanitization
pub mod validation;

// Re-export key components for easier access
pub use error::{Result, WrappedError};
pub use nlp::NlpProcessor;
pub use report::ResultRecord;
pub use service::{AnalysisOptions, WrappedService};
pub use store::MessageStore;
