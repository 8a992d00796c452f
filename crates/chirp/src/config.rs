//! Decoder configuration.
//!
//! [`DecodeConfig`] controls body handling in the [`Decoder`](crate::Decoder)
//! and error policy in the [`DecodeLayer`](crate::DecodeLayer). It can be
//! deserialized from any serde format or built in code.

use crate::body::DEFAULT_MAX_BODY_SIZE;
use http::StatusCode;
use mime::Mime;
use serde::{Deserialize, Serialize};

/// Error raised when a configuration is invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The body limit is zero.
    #[error("max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    /// A form content type does not parse as a media type.
    #[error("invalid form content type '{0}'")]
    InvalidContentType(String),

    /// The interrupt status is not a client or server error.
    #[error("interrupt_status must be a 4xx or 5xx status, got {0}")]
    InvalidInterruptStatus(u16),
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_SIZE
}

fn default_form_content_types() -> Vec<String> {
    vec![
        mime::APPLICATION_WWW_FORM_URLENCODED.essence_str().to_string(),
        mime::MULTIPART_FORM_DATA.essence_str().to_string(),
    ]
}

const fn default_log_errors() -> bool {
    true
}

/// Decoder and middleware configuration.
///
/// # Example
///
/// ```
/// use chirp::DecodeConfig;
///
/// let config: DecodeConfig = serde_json::from_str(
///     r#"{"max_body_bytes": 4096, "interrupt_status": 400}"#,
/// ).unwrap();
///
/// assert_eq!(config.max_body_bytes, 4096);
/// assert_eq!(config.interrupt_status, Some(400));
/// assert!(config.log_errors);
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DecodeConfig {
    /// Maximum body size read by the body stage.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Content types (by essence) decoded as forms; everything else is
    /// decoded as a structured body.
    #[serde(default = "default_form_content_types")]
    pub form_content_types: Vec<String>,

    /// Status written by the middleware when decoding fails. `None` lets the
    /// request continue to the handler.
    #[serde(default)]
    pub interrupt_status: Option<u16>,

    /// Whether the middleware logs decode failures.
    #[serde(default = "default_log_errors")]
    pub log_errors: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            form_content_types: default_form_content_types(),
            interrupt_status: None,
            log_errors: default_log_errors(),
        }
    }
}

impl DecodeConfig {
    /// Create a new configuration builder.
    ///
    /// ```
    /// use chirp::DecodeConfig;
    ///
    /// let config = DecodeConfig::builder()
    ///     .max_body_bytes(64 * 1024)
    ///     .interrupt_status(422)
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(config.max_body_bytes, 65536);
    /// ```
    #[must_use]
    pub fn builder() -> DecodeConfigBuilder {
        DecodeConfigBuilder::new()
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 {
            return Err(ConfigError::ZeroBodyLimit);
        }
        for content_type in &self.form_content_types {
            if content_type.parse::<Mime>().is_err() {
                return Err(ConfigError::InvalidContentType(content_type.clone()));
            }
        }
        if let Some(status) = self.interrupt_status {
            let valid = StatusCode::from_u16(status)
                .map(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidInterruptStatus(status));
            }
        }
        Ok(())
    }

    /// Returns true if `content_type` should be decoded as a form.
    #[must_use]
    pub fn is_form(&self, content_type: &Mime) -> bool {
        let essence = content_type.essence_str();
        self.form_content_types
            .iter()
            .any(|kind| kind.eq_ignore_ascii_case(essence))
    }

    /// Returns the interrupt status as a [`StatusCode`], if one is set and
    /// is a client or server error.
    #[must_use]
    pub fn interrupt(&self) -> Option<StatusCode> {
        self.interrupt_status
            .and_then(|status| StatusCode::from_u16(status).ok())
            .filter(|status| status.is_client_error() || status.is_server_error())
    }
}

/// Builder for [`DecodeConfig`].
#[derive(Debug, Clone, Default)]
pub struct DecodeConfigBuilder {
    config: DecodeConfig,
}

impl DecodeConfigBuilder {
    /// Create a builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum body size.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.config.max_body_bytes = limit;
        self
    }

    /// Replace the list of form content types.
    #[must_use]
    pub fn form_content_types<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.form_content_types = kinds.into_iter().map(Into::into).collect();
        self
    }

    /// Set the status written when decoding fails.
    #[must_use]
    pub fn interrupt_status(mut self, status: u16) -> Self {
        self.config.interrupt_status = Some(status);
        self
    }

    /// Enable or disable failure logging.
    #[must_use]
    pub fn log_errors(mut self, enabled: bool) -> Self {
        self.config.log_errors = enabled;
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<DecodeConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
