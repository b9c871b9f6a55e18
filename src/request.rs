//! Build request files.
//!
//! The CLI takes a JSON document describing one build:
//!
//! ```json
//! {
//!   "platform": "w10",
//!   "locale": "de",
//!   "attributes": { "internal:eap_method": ["PEAP-MSCHAPv2"], ... },
//!   "certificates": [ { "path": "ca.der", "root": true } ],
//!   "client_certificate": null
//! }
//! ```
//!
//! Relative paths are resolved against the directory of the request file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::attributes::ProfileAttributes;
use crate::certificate::CertificateAuthority;
use crate::generator::BuildRequest;
use crate::locale::Locale;
use crate::types::Platform;

/// One CA entry of a request file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateEntry {
    /// DER or PEM file.
    pub path: PathBuf,
    #[serde(default)]
    pub root: bool,
}

/// On-disk shape of a build request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestFile {
    #[serde(default)]
    pub platform: Platform,
    #[serde(default = "default_locale")]
    pub locale: String,
    pub attributes: ProfileAttributes,
    #[serde(default)]
    pub certificates: Vec<CertificateEntry>,
    #[serde(default)]
    pub client_certificate: Option<PathBuf>,
}

fn default_locale() -> String {
    "en".to_string()
}

impl RequestFile {
    /// Load a request from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read build request from {:?}", path.as_ref()))?;

        let request: Self =
            serde_json::from_str(&content).context("Failed to parse build request JSON")?;

        Ok(request)
    }

    /// Read referenced files and produce a `BuildRequest`.
    ///
    /// Certificates are staged as `cert-1.der`, `cert-2.der`, ... in file order.
    pub fn into_build_request(self, base_dir: &Path) -> Result<BuildRequest> {
        let mut certificates = Vec::with_capacity(self.certificates.len());
        for (n, entry) in self.certificates.iter().enumerate() {
            let path = resolve(base_dir, &entry.path);
            let raw = fs::read(&path)
                .with_context(|| format!("Failed to read certificate {:?}", path))?;
            let der = decode_certificate(&raw)
                .with_context(|| format!("Failed to decode certificate {:?}", path))?;
            certificates.push(CertificateAuthority::from_der(
                der,
                entry.root,
                format!("cert-{}.der", n + 1),
            ));
        }

        let client_certificate = match &self.client_certificate {
            Some(p) => {
                let path = resolve(base_dir, p);
                Some(
                    fs::read(&path)
                        .with_context(|| format!("Failed to read client certificate {:?}", path))?,
                )
            }
            None => None,
        };

        Ok(BuildRequest {
            attributes: self.attributes,
            platform: self.platform,
            locale: Locale::for_code(&self.locale),
            certificates,
            client_certificate,
        })
    }
}

/// Load and resolve a request file in one step.
pub fn load_request(path: &Path) -> Result<BuildRequest> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    RequestFile::load_from_file(path)?.into_build_request(base_dir)
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Accept DER as-is and unwrap a single PEM block.
fn decode_certificate(raw: &[u8]) -> Result<Vec<u8>> {
    let Ok(text) = std::str::from_utf8(raw) else {
        return Ok(raw.to_vec());
    };
    if !text.trim_start().starts_with("-----BEGIN") {
        return Ok(raw.to_vec());
    }
    let body: String = text
        .lines()
        .map(str::trim)
        .skip_while(|l| !l.starts_with("-----BEGIN"))
        .skip(1)
        .take_while(|l| !l.starts_with("-----END"))
        .collect();
    BASE64
        .decode(body.as_bytes())
        .context("PEM body is not valid base64")
}
