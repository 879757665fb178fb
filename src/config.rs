use crate::error::{UploadError, UploadResult};
use crate::upload::{RequestSettings, ValidationRules, DEFAULT_ACTION, DEFAULT_STORAGE_ROOT};
use crate::utils::curl_parser::CurlParser;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings for talking to the attachment endpoint, usually read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct UploaderConfig {
    pub endpoint: Url,
    #[serde(default = "default_action")]
    pub action: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_storage_root")]
    pub storage_root: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub rules: ValidationRules,
}

fn default_action() -> String {
    DEFAULT_ACTION.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_storage_root() -> String {
    DEFAULT_STORAGE_ROOT.to_string()
}

impl UploaderConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            action: default_action(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage_root: default_storage_root(),
            headers: BTreeMap::new(),
            rules: ValidationRules::default(),
        }
    }

    pub fn from_json(text: &str) -> UploadResult<Self> {
        serde_json::from_str(text).map_err(|e| UploadError::config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> UploadResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| UploadError::io(path, e))?;
        Self::from_json(&text)
    }

    pub fn from_curl(curl_text: &str) -> UploadResult<Self> {
        let mut parser = CurlParser::new();
        parser.parse(curl_text).map_err(UploadError::Config)?;

        let endpoint = parser.endpoint.unwrap_or_default();
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| UploadError::config(format!("invalid endpoint {}: {}", endpoint, e)))?;

        let mut config = Self::new(endpoint);
        config.headers = parser.headers;
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_settings(&self) -> RequestSettings {
        RequestSettings {
            action: self.action.clone(),
            storage_root: self.storage_root.clone(),
        }
    }

    pub fn header_map(&self) -> UploadResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        for (key, value) in &self.headers {
            let name = HeaderName::from_str(key)
                .map_err(|e| UploadError::config(format!("invalid header name {}: {}", key, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| UploadError::config(format!("invalid value for {}: {}", key, e)))?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_defaults_everything_but_endpoint() {
        let config = UploaderConfig::from_json(r#"{"endpoint": "https://example.com/api"}"#).unwrap();

        assert_eq!(config.action, DEFAULT_ACTION);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.rules, ValidationRules::default());
        assert_eq!(config.request_settings(), RequestSettings::default());
    }

    #[test]
    fn json_overrides_rules_partially() {
        let config = UploaderConfig::from_json(
            r#"{
                "endpoint": "https://example.com/api",
                "action": "adjuntar",
                "headers": {"authorization": "Bearer t"},
                "rules": {"max_file_count": 3, "allowed_mime_types": ["image/*"]}
            }"#,
        )
        .unwrap();

        assert_eq!(config.action, "adjuntar");
        assert_eq!(config.rules.max_file_count, 3);
        assert_eq!(config.rules.max_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.header_map().unwrap()["authorization"], "Bearer t");
    }

    #[test]
    fn missing_endpoint_is_a_config_error() {
        assert!(matches!(
            UploaderConfig::from_json("{}"),
            Err(UploadError::Config(_))
        ));
    }

    #[test]
    fn invalid_header_is_rejected() {
        let mut config = UploaderConfig::new(Url::parse("https://example.com").unwrap());
        config.headers.insert("bad header".into(), "x".into());
        assert!(config.header_map().is_err());
    }

    #[test]
    fn builds_from_curl() {
        let config = UploaderConfig::from_curl(
            "curl 'https://example.com/api/adjuntos' -H 'cookie: session=1'",
        )
        .unwrap();
        assert_eq!(config.endpoint.as_str(), "https://example.com/api/adjuntos");
    }
}
