//! Marquee Core - catalog model and storage for list-backed catalogs
//!
//! This crate provides the building blocks that do not talk to the network:
//! list and title identifiers, classified items, the genre taxonomy, the
//! catalog query engine, surface visibility and the discovery manifest, the
//! in-memory cache tier, durable snapshot and user registry storage,
//! configuration, and tracing setup.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod storage;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use catalog::{Bucket, ClassifiedItem, InvalidIdentifier, ListId, MetaRecord, TitleId};
pub use config::MarqueeConfig;
pub use storage::{StorageError, UserRegistry};

/// Errors raised by list-management operations.
#[derive(Debug, thiserror::Error)]
pub enum ListError {
    #[error("Could not find a list id in {input:?}")]
    Malformed { input: String },

    #[error("List {list} is already added")]
    Duplicate { list: ListId },

    #[error("List {list} not found")]
    NotFound { list: String },

    #[error("List {list} could not be fetched")]
    Unavailable { list: String },
}

/// Core errors that can bubble up from any Marquee subsystem.
#[derive(Debug, thiserror::Error)]
pub enum MarqueeError {
    #[error("List error: {0}")]
    List(#[from] ListError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid identifier: {0}")]
    Identifier(#[from] InvalidIdentifier),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MarqueeError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            MarqueeError::List(e) => e.to_string(),
            MarqueeError::Identifier(e) => e.to_string(),
            MarqueeError::Storage(StorageError::InvalidUid { uid }) => {
                format!("Invalid user id: {uid:?}")
            }
            MarqueeError::Storage(_) => "Storage error occurred".to_string(),
            MarqueeError::Configuration { .. } => "Configuration error occurred".to_string(),
            MarqueeError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        match self {
            MarqueeError::List(e) => e.is_user_error(),
            MarqueeError::Identifier(_) => true,
            MarqueeError::Storage(StorageError::InvalidUid { .. }) => true,
            _ => false,
        }
    }
}

impl ListError {
    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(self, ListError::Malformed { .. } | ListError::Duplicate { .. })
    }
}

pub type Result<T> = std::result::Result<T, MarqueeError>;
