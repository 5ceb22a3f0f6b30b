//! Parsing error types for locator tables and link resolution

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Invalid CSS selector table '{table}': {reason}")]
    InvalidSelector {
        table: String,
        reason: String,
        rejected: Vec<String>,
    },

    #[error("Invalid pattern '{pattern}' in {list}: {reason}")]
    InvalidPattern {
        list: String,
        pattern: String,
        reason: String,
    },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },
}

impl ParsingError {
    /// Create an invalid selector error listing the entries that failed to compile
    pub fn invalid_selector(table: &str, reason: &str, rejected: Vec<String>) -> Self {
        Self::InvalidSelector {
            table: table.to_string(),
            reason: reason.to_string(),
            rejected,
        }
    }

    pub fn invalid_pattern(list: &str, pattern: &str, reason: impl ToString) -> Self {
        Self::InvalidPattern {
            list: list.to_string(),
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
