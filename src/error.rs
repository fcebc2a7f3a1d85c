use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::compliance::ComplianceStatus;

/// Errors that can occur during a recipe extraction attempt
#[derive(Error, Debug)]
pub enum ExtractError {
    /// URL is not a page of the supported recipe site
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The compliance gate refused the attempt
    #[error("Compliance check failed: {0}")]
    ComplianceRejected(ComplianceStatus),

    /// The page could not be loaded (HTTP error, no response, timeout)
    #[error("Failed to load page: {0}")]
    PageLoad(String),

    /// One or more of title, ingredients, instructions could not be found
    #[error("Failed to extract recipe data: missing {}", .0.join(", "))]
    MissingRegions(Vec<&'static str>),

    /// Unexpected fault while reading the rendered document
    #[error("Extraction error: {0}")]
    Internal(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Coarse classification of an [`ExtractError`], reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    ComplianceRejected,
    RenderFailure,
    IncompleteExtraction,
    InternalError,
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::InvalidUrl(_) => ErrorKind::InvalidInput,
            ExtractError::ComplianceRejected(_) => ErrorKind::ComplianceRejected,
            ExtractError::PageLoad(_) => ErrorKind::RenderFailure,
            ExtractError::MissingRegions(_) => ErrorKind::IncompleteExtraction,
            ExtractError::Internal(_) | ExtractError::Config(_) => ErrorKind::InternalError,
        }
    }
}

impl From<RenderError> for ExtractError {
    fn from(err: RenderError) -> Self {
        ExtractError::PageLoad(err.to_string())
    }
}

/// Errors raised by a page renderer
#[derive(Error, Debug)]
pub enum RenderError {
    /// Transport failure talking to the page or the page service
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The page service answered with a non-success status
    #[error("page service returned {0}")]
    Service(reqwest::StatusCode),

    /// Navigation did not finish in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Content was requested before a successful navigation
    #[error("page has no loaded document")]
    NotLoaded,

    /// Header or client construction failure
    #[error("renderer setup failed: {0}")]
    Setup(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_regions_message_lists_regions() {
        let err = ExtractError::MissingRegions(vec!["title", "instructions"]);
        assert_eq!(
            err.to_string(),
            "Failed to extract recipe data: missing title, instructions"
        );
        assert_eq!(err.kind(), ErrorKind::IncompleteExtraction);
    }

    #[test]
    fn test_render_error_becomes_page_load() {
        let err: ExtractError = RenderError::Timeout(Duration::from_secs(30)).into();
        assert_eq!(err.to_string(), "Failed to load page: timed out after 30s");
        assert_eq!(err.kind(), ErrorKind::RenderFailure);
    }
}
