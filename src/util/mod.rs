//! Utility functions for common operations.
//!
//! - **URL validation**: API base URL policy and article URL checks
//! - **Text processing**: terminal-safe, width-aware rendering of server text

mod text;
mod url_validator;

pub use text::{display_width, single_line, strip_control_chars, truncate_to_width};
pub use url_validator::{validate_api_base, validate_article_url, UrlValidationError};
