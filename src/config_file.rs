//! Generator configuration.
//!
//! Deployment-wide settings that are not part of a profile: consortium
//! identity, packaging tool location and product version. Saved and loaded as
//! JSON.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::script_emitter::COMPILED_INSTALLER;

/// Settings shared by every build of a deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Consortium brand shown in captions (e.g. "eduroam").
    pub consortium_display_name: String,
    /// Well-known roaming consortium OIs, keyed by display name.
    pub known_consortium_ois: BTreeMap<String, Vec<String>>,
    /// Hotspot2 domain name used when the profile has no realm.
    pub passpoint_domain_fallback: String,
    /// SSID written into Passpoint profiles.
    pub passpoint_ssid: String,
    /// Packaging compiler executable.
    pub makensis_path: PathBuf,
    /// Major version of the packaging compiler.
    pub nsis_major_version: u8,
    pub version_major: u32,
    pub version_minor: u32,
    /// Shown when the profile has no support e-mail.
    pub support_email_substitute: String,
    /// Shown when the profile has no support URL.
    pub support_url_substitute: String,
    /// Execution level requested by the installer.
    pub exec_level: String,
    /// File name, without extension, of the final installer.
    pub installer_basename: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let mut known = BTreeMap::new();
        known.insert("eduroam".to_string(), vec!["001bc50460".to_string()]);
        known.insert(
            "OpenRoaming".to_string(),
            vec!["5a03ba0000".to_string(), "004096".to_string()],
        );
        Self {
            consortium_display_name: "eduroam".to_string(),
            known_consortium_ois: known,
            passpoint_domain_fallback: "eduroam.org".to_string(),
            passpoint_ssid: "cat-passpoint-profile".to_string(),
            makensis_path: PathBuf::from("/usr/bin/makensis"),
            nsis_major_version: 3,
            version_major: 2,
            version_minor: 1,
            support_email_substitute: "your local eduroam support".to_string(),
            support_url_substitute: "your local eduroam support page".to_string(),
            exec_level: "user".to_string(),
            installer_basename: "eduroam-installer".to_string(),
        }
    }
}

impl GeneratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize generator configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.consortium_display_name.trim().is_empty() {
            anyhow::bail!("Consortium display name must be specified");
        }

        // Installers are written as UTF-8; older compilers need code page transcoding
        if self.nsis_major_version < 3 {
            anyhow::bail!(
                "Packaging compiler major version {} is not supported (need 3 or later)",
                self.nsis_major_version
            );
        }

        if self.passpoint_ssid.trim().is_empty() {
            anyhow::bail!("Passpoint SSID must be specified");
        }

        for (name, ois) in &self.known_consortium_ois {
            for oi in ois {
                if oi.is_empty() || !oi.chars().all(|c| c.is_ascii_hexdigit()) {
                    anyhow::bail!("Consortium '{}' has invalid OI '{}'", name, oi);
                }
            }
        }

        let base = self.installer_basename.trim();
        if base.is_empty() {
            anyhow::bail!("Installer base name must be specified");
        }
        if base.contains(['/', '\\']) {
            anyhow::bail!("Installer base name cannot contain path separators");
        }
        if self
            .installer_file_name()
            .eq_ignore_ascii_case(COMPILED_INSTALLER)
        {
            anyhow::bail!(
                "Installer base name '{}' collides with the compiler output {}",
                base,
                COMPILED_INSTALLER
            );
        }

        Ok(())
    }

    /// Well-known name for an OI, compared case-insensitively.
    pub fn known_oi_name(&self, oi: &str) -> Option<&str> {
        self.known_consortium_ois
            .iter()
            .find(|(_, ois)| ois.iter().any(|known| known.eq_ignore_ascii_case(oi)))
            .map(|(name, _)| name.as_str())
    }

    /// `major.minor`
    pub fn version_string(&self) -> String {
        format!("{}.{}", self.version_major, self.version_minor)
    }

    pub fn installer_file_name(&self) -> String {
        format!("{}.exe", self.installer_basename.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        GeneratorConfig::default()
            .validate()
            .expect("default configuration should validate");
    }

    #[test]
    fn test_rejects_old_compiler() {
        let config = GeneratorConfig {
            nsis_major_version: 2,
            ..GeneratorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_oi() {
        let mut config = GeneratorConfig::default();
        config
            .known_consortium_ois
            .insert("Broken".to_string(), vec!["xyz".to_string()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_compiler_output_name() {
        for base in ["installer", " Installer "] {
            let config = GeneratorConfig {
                installer_basename: base.to_string(),
                ..GeneratorConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("collides"), "{base}: {err}");
        }
    }

    #[test]
    fn test_known_oi_lookup() {
        let config = GeneratorConfig::default();
        assert_eq!(config.known_oi_name("001BC50460"), Some("eduroam"));
        assert_eq!(config.known_oi_name("004096"), Some("OpenRoaming"));
        assert_eq!(config.known_oi_name("abcdef"), None);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        let config = GeneratorConfig {
            installer_basename: "example-installer".to_string(),
            ..GeneratorConfig::default()
        };
        config.save_to_file(&path).expect("save");
        let loaded = GeneratorConfig::load_from_file(&path).expect("load");
        assert_eq!(loaded.installer_file_name(), "example-installer.exe");
        assert_eq!(loaded.version_string(), "2.1");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GeneratorConfig =
            serde_json::from_str(r#"{"installer_basename": "x"}"#).expect("partial config");
        assert_eq!(config.nsis_major_version, 3);
        assert_eq!(config.installer_basename, "x");
    }
}
