//! Bootstrap template substitution
//!
//! Instance bootstrap scripts are opaque shell text containing placeholder
//! tokens. Substitution is textual and exact-match: a token is replaced
//! everywhere it occurs, and text outside applied substitutions is left
//! byte-identical. A recognized token that does not occur in the template
//! is reported back to the caller instead of silently passing through.

use base64::Engine;
use thiserror::Error;

/// Placeholder tokens recognized in bootstrap scripts.
pub mod placeholders {
    /// Public address of the cluster's router/config node.
    pub const ROUTER_IP: &str = "%ROUTER_IP%";
    /// Blob-store bucket holding the instance's compose definition.
    pub const S3_DOMAIN: &str = "%S3_DOMAIN%";
    /// Blob-store key of the instance's compose definition.
    pub const OBJECT_KEY: &str = "%OBJECT_KEY%";
    /// Replica-set name derived from the shard identity.
    pub const UNIQUE_SHARD_NAME: &str = "%UNIQUE_SHARD_NAME%";
    /// Blob-store bucket holding the monitoring agent configuration.
    pub const S3_MONITORING_JSON_DOMAIN: &str = "%S3_MONITORING_JSON_DOMAIN%";
    /// Blob-store key of the monitoring agent configuration.
    pub const MONITORING_JSON_KEY: &str = "%MONITORING_JSON_KEY%";
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid base64 template payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("template is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("template is missing placeholders: {}", .0.join(", "))]
    MissingPlaceholders(Vec<String>),
}

/// Result of a lossy substitution pass.
///
/// `missing` lists the recognized tokens that did not occur in the template,
/// in the order they were requested.
#[derive(Debug, Clone)]
pub struct Substitution {
    pub text: String,
    pub missing: Vec<String>,
}

/// An instance bootstrap script with placeholder tokens.
#[derive(Debug, Clone)]
pub struct BootstrapTemplate {
    text: String,
}

impl BootstrapTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Decode a template from its base64 transport encoding.
    pub fn from_base64(encoded: &str) -> Result<Self, TemplateError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded.trim())?;
        Ok(Self {
            text: String::from_utf8(bytes)?,
        })
    }

    /// Encode the template for transport through an environment variable.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.text.as_bytes())
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Substitute each `(token, value)` pair, reporting tokens that were
    /// not found rather than failing.
    pub fn substitute(&self, pairs: &[(&str, &str)]) -> Substitution {
        let mut text = self.text.clone();
        let mut missing = Vec::new();
        for (token, value) in pairs {
            if text.contains(token) {
                text = text.replace(token, value);
            } else {
                missing.push((*token).to_string());
            }
        }
        Substitution { text, missing }
    }

    /// Substitute each `(token, value)` pair, treating an absent token as an
    /// error enumerating everything that was missing.
    pub fn render(&self, pairs: &[(&str, &str)]) -> Result<String, TemplateError> {
        let substitution = self.substitute(pairs);
        if substitution.missing.is_empty() {
            Ok(substitution.text)
        } else {
            Err(TemplateError::MissingPlaceholders(substitution.missing))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::placeholders::*;
    use super::*;
    use crate::identity::ShardId;

    #[test]
    fn test_render_replaces_every_occurrence() {
        let template = BootstrapTemplate::new(
            "curl https://%S3_DOMAIN%/%OBJECT_KEY%\nmongos --configdb %UNIQUE_SHARD_NAME% --bind_ip %ROUTER_IP%\necho %ROUTER_IP%",
        );
        let rendered = template
            .render(&[
                (ROUTER_IP, "10.0.1.5"),
                (S3_DOMAIN, "assets-bucket"),
                (OBJECT_KEY, "compose/shard.yml"),
                (UNIQUE_SHARD_NAME, "shard1set"),
            ])
            .unwrap();
        assert!(!rendered.contains('%'));
        assert!(rendered.ends_with("echo 10.0.1.5"));
    }

    #[test]
    fn test_render_golden_mongos_line() {
        let template =
            BootstrapTemplate::new("mongos --configdb %UNIQUE_SHARD_NAME% --bind_ip %ROUTER_IP%");
        let replica_set = ShardId::from_raw(5).replica_set();
        let rendered = template
            .render(&[(UNIQUE_SHARD_NAME, replica_set.as_str()), (ROUTER_IP, "10.0.1.5")])
            .unwrap();
        assert_eq!(rendered, "mongos --configdb shard5set --bind_ip 10.0.1.5");
    }

    #[test]
    fn test_substitute_reports_missing_and_passes_rest_through() {
        let template = BootstrapTemplate::new("bind to %ROUTER_IP%; no shard name here");
        let substitution = template.substitute(&[
            (ROUTER_IP, "10.0.1.5"),
            (UNIQUE_SHARD_NAME, "shard1set"),
        ]);
        assert_eq!(substitution.text, "bind to 10.0.1.5; no shard name here");
        assert_eq!(substitution.missing, vec![UNIQUE_SHARD_NAME.to_string()]);
    }

    #[test]
    fn test_substitute_without_tokens_is_byte_identical() {
        let template = BootstrapTemplate::new("#!/bin/bash\necho plain script\n");
        let substitution = template.substitute(&[(ROUTER_IP, "10.0.1.5")]);
        assert_eq!(substitution.text, template.as_str());
    }

    #[test]
    fn test_render_enumerates_all_missing_tokens() {
        let template = BootstrapTemplate::new("nothing to see");
        let err = template
            .render(&[(ROUTER_IP, "10.0.1.5"), (OBJECT_KEY, "k")])
            .unwrap_err();
        match err {
            TemplateError::MissingPlaceholders(missing) => {
                assert_eq!(missing, vec![ROUTER_IP.to_string(), OBJECT_KEY.to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_base64_round_trip() {
        let template = BootstrapTemplate::new("echo %ROUTER_IP%");
        let decoded = BootstrapTemplate::from_base64(&template.to_base64()).unwrap();
        assert_eq!(decoded.as_str(), template.as_str());
    }

    #[test]
    fn test_invalid_base64_is_an_error() {
        assert!(matches!(
            BootstrapTemplate::from_base64("%%not base64%%"),
            Err(TemplateError::Base64(_))
        ));
    }
}
