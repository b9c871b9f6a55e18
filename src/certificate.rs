//! Certificate authorities and their fingerprints.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha1::{Digest, Sha1};

/// A CA certificate shipped with the installer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateAuthority {
    der: Vec<u8>,
    sha1: String,
    is_root: bool,
    staged_file_name: String,
}

impl CertificateAuthority {
    /// Wrap DER bytes, computing the SHA-1 fingerprint once.
    pub fn from_der(
        der: impl Into<Vec<u8>>,
        is_root: bool,
        staged_file_name: impl Into<String>,
    ) -> Self {
        let der = der.into();
        let sha1 = sha1_fingerprint(&der);
        Self {
            der,
            sha1,
            is_root,
            staged_file_name: staged_file_name.into(),
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn is_root(&self) -> bool {
        self.is_root
    }

    pub fn staged_file_name(&self) -> &str {
        &self.staged_file_name
    }

    /// Uppercase hex, no separators.
    pub fn sha1_plain(&self) -> &str {
        &self.sha1
    }

    /// Uppercase hex with a space after every byte.
    pub fn sha1_chunked(&self) -> String {
        chunk_hex(&self.sha1)
    }

    pub fn der_base64(&self) -> String {
        BASE64.encode(&self.der)
    }

    /// Trust store the installer puts this certificate in.
    pub fn store(&self) -> &'static str {
        if self.is_root { "root" } else { "ca" }
    }
}

/// SHA-1 over `der`, uppercase hex.
pub fn sha1_fingerprint(der: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(der);
    format!("{:X}", hasher.finalize())
}

/// Insert a single space after every two characters, trailing one included.
pub fn chunk_hex(hex: &str) -> String {
    let mut out = String::with_capacity(hex.len() + hex.len() / 2 + 1);
    for (i, c) in hex.chars().enumerate() {
        out.push(c);
        if i % 2 == 1 {
            out.push(' ');
        }
    }
    out
}

/// Root-marked entries only.
pub fn roots(cas: &[CertificateAuthority]) -> impl Iterator<Item = &CertificateAuthority> {
    cas.iter().filter(|ca| ca.is_root())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha1_known_vector() {
        assert_eq!(
            sha1_fingerprint(b"abc"),
            "A9993E364706816ABA3E25717850C26C9CD0D89D"
        );
    }

    #[test]
    fn test_chunked_form() {
        let ca = CertificateAuthority::from_der(b"abc".to_vec(), true, "cert-0.der");
        assert_eq!(
            ca.sha1_chunked(),
            "A9 99 3E 36 47 06 81 6A BA 3E 25 71 78 50 C2 6C 9C D0 D8 9D "
        );
        assert_eq!(ca.sha1_chunked().replace(' ', ""), ca.sha1_plain());
    }

    #[test]
    fn test_store_and_base64() {
        let ca = CertificateAuthority::from_der(vec![0x30, 0x03, 0x02, 0x01, 0x01], false, "c.der");
        assert_eq!(ca.store(), "ca");
        assert_eq!(ca.der_base64(), "MAMCAQE=");
    }

    #[test]
    fn test_roots_filter() {
        let cas = vec![
            CertificateAuthority::from_der(b"a".to_vec(), true, "cert-0.der"),
            CertificateAuthority::from_der(b"b".to_vec(), false, "cert-1.der"),
        ];
        assert_eq!(roots(&cas).count(), 1);
    }
}
