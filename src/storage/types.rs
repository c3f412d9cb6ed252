use thiserror::Error;

use crate::news::{Article, Source};

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another instance of the application has locked the database
    #[error("Another instance of headlines appears to be running. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY, SQLITE_LOCKED, and SQLITE_CANTOPEN all surface as one of
/// these messages.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for saved article queries (used by sqlx FromRow)
///
/// The source is flattened to its name; see [`Source::from_name`].
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SavedArticleRow {
    pub url: String,
    pub source_name: Option<String>,
    pub author: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub url_to_image: Option<String>,
    pub published_at: String,
    pub content: Option<String>,
}

impl SavedArticleRow {
    pub(crate) fn into_article(self) -> Article {
        Article {
            source: self.source_name.as_deref().map(Source::from_name),
            author: self.author,
            title: self.title,
            description: self.description,
            url: self.url,
            url_to_image: self.url_to_image,
            published_at: self.published_at,
            content: self.content,
        }
    }
}
