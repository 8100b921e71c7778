//! Parsing error types for storefront HTML extraction
//!
//! Selector compilation, embedded product JSON and URL resolution all report
//! through `ParsingError`; field-level misses are ordinary `None`s and never
//! become errors.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum ParsingError {
    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Embedded product JSON could not be read: {reason}")]
    ProductJson {
        reason: String,
        script_id: Option<String>,
    },

    #[error("URL resolution failed: {url} - {reason}")]
    UrlResolutionFailed {
        url: String,
        reason: String,
        base_url: Option<String>,
    },
}

impl ParsingError {
    pub fn invalid_selector(selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn product_json(reason: impl ToString, script_id: Option<&str>) -> Self {
        Self::ProductJson {
            reason: reason.to_string(),
            script_id: script_id.map(|s| s.to_string()),
        }
    }

    pub fn url_resolution_failed(url: &str, reason: impl ToString, base_url: Option<&str>) -> Self {
        Self::UrlResolutionFailed {
            url: url.to_string(),
            reason: reason.to_string(),
            base_url: base_url.map(|s| s.to_string()),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ParsingError::invalid_selector("div[", "unexpected end");
        assert_eq!(err.to_string(), "Invalid CSS selector: div[ - unexpected end");

        let err = ParsingError::product_json("expected value", Some("ProductJson-9"));
        assert!(err.to_string().contains("expected value"));
        assert!(matches!(err, ParsingError::ProductJson { script_id: Some(ref id), .. } if id == "ProductJson-9"));
    }
}
