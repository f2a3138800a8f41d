//! Adaptive context selection for document question answering.
//!
//! `adaptive-context` decides which previously extracted chunks of a document
//! to forward to a generative model for one question: lexical pre-filtering,
//! optional semantic re-ranking through an external embedding provider,
//! Maximum Marginal Relevance selection, and token-budget-aware compression
//! chosen by document size. Selection is deterministic: identical inputs
//! always produce identical outputs.
//!
//! The entry point is [`selection::ContextSelector::select_context`].

pub mod cache;
pub mod compression;
pub mod config;
pub mod selection;
pub mod types;

pub use config::{ConfigError, SelectorConfig};
pub use selection::ContextSelector;
pub use types::{SelectionOptions, SelectionResult};
