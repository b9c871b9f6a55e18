//! Resolved profile attributes.
//!
//! The attribute resolver hands the generator a bag of namespaced keys, each
//! holding an ordered list of values. Accessors here never invent defaults:
//! callers decide whether absence is fatal.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{GeneratorError, Result};

/// Attribute keys consumed by the generator.
pub mod keys {
    pub const EAP_METHOD: &str = "internal:eap_method";
    pub const USE_ANON_OUTER: &str = "internal:use_anon_outer";
    pub const ANON_LOCAL_VALUE: &str = "internal:anon_local_value";
    pub const REALM: &str = "internal:realm";
    pub const SERVER_NAME: &str = "eap:server_name";
    pub const ALT_SUPPLICANT: &str = "device-specific:geantlink";
    pub const TLS_USE_OTHER_ID: &str = "eap-specific:tls_use_other_id";
    pub const WIRED: &str = "media:wired";
    pub const SSID: &str = "internal:SSID";
    pub const REMOVE_SSID: &str = "internal:remove_SSID";
    pub const CONSORTIA: &str = "internal:consortia";
    pub const INST_NAME: &str = "general:instname";
    pub const PROFILE_NAME: &str = "profile:name";
    pub const PROFILE_COUNT: &str = "internal:profile_count";
    pub const PROFILE_ID: &str = "internal:profile_id";
    pub const SUPPORT_EMAIL: &str = "support:email";
    pub const SUPPORT_URL: &str = "support:url";
    pub const HINT_USERINPUT_SUFFIX: &str = "internal:hint_userinput_suffix";
    pub const VERIFY_USERINPUT_SUFFIX: &str = "internal:verify_userinput_suffix";
    pub const FED_LOGO: &str = "fed:logo_file";
    pub const INST_LOGO: &str = "internal:logo_file";
    pub const FED_INCLUDE_LOGO: &str = "fed:include_logo_installers";
    pub const INFO_FILE: &str = "internal:info_file";
}

/// One attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    /// Ordered key/value pair, e.g. an SSID and its cipher.
    Keyed { key: String, value: String },
    /// A file already resolved by the attribute resolver.
    File { path: PathBuf, mime: String },
}

impl AttributeValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn keyed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Keyed {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>, mime: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            mime: mime.into(),
        }
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// A reference to a resolved file attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRef<'a> {
    pub path: &'a std::path::Path,
    pub mime: &'a str,
}

/// Namespaced attribute bag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileAttributes {
    values: BTreeMap<String, Vec<AttributeValue>>,
}

impl ProfileAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to `key`.
    pub fn push(&mut self, key: impl Into<String>, value: AttributeValue) -> &mut Self {
        self.values.entry(key.into()).or_default().push(value);
        self
    }

    /// Builder-style variant of [`push`](Self::push).
    pub fn with(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.push(key, value);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.get(key).is_some_and(|v| !v.is_empty())
    }

    pub fn values(&self, key: &str) -> &[AttributeValue] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First text value of `key`.
    pub fn first_text(&self, key: &str) -> Option<&str> {
        self.values(key).iter().find_map(AttributeValue::as_text)
    }

    /// First text value of `key`, treating an empty string as absent.
    pub fn first_non_empty(&self, key: &str) -> Option<&str> {
        self.first_text(key).filter(|s| !s.trim().is_empty())
    }

    /// All text values of `key` in order.
    pub fn texts(&self, key: &str) -> Vec<&str> {
        self.values(key)
            .iter()
            .filter_map(AttributeValue::as_text)
            .collect()
    }

    /// All key/value pairs of `key` in order.
    pub fn keyed(&self, key: &str) -> Vec<(&str, &str)> {
        self.values(key)
            .iter()
            .filter_map(|v| match v {
                AttributeValue::Keyed { key, value } => Some((key.as_str(), value.as_str())),
                _ => None,
            })
            .collect()
    }

    /// First file value of `key`.
    pub fn first_file(&self, key: &str) -> Option<FileRef<'_>> {
        self.values(key).iter().find_map(|v| match v {
            AttributeValue::File { path, mime } => Some(FileRef {
                path: path.as_path(),
                mime: mime.as_str(),
            }),
            _ => None,
        })
    }

    /// Whether a toggle attribute is switched on.
    pub fn is_enabled(&self, key: &str) -> bool {
        self.first_text(key)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "on" | "1" | "true" | "yes"))
            .unwrap_or(false)
    }

    /// First text value of `key`, or a `MissingAttribute` error naming `context`.
    pub fn require_text(&self, key: &str, context: &str) -> Result<&str> {
        self.first_text(key)
            .ok_or_else(|| GeneratorError::missing(key, context))
    }

    /// Like [`require_text`](Self::require_text) but rejects blank values.
    pub fn require_non_empty(&self, key: &str, context: &str) -> Result<&str> {
        self.first_non_empty(key)
            .ok_or_else(|| GeneratorError::missing(key, context))
    }
}
