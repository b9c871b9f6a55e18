//! Network profile planning.
//!
//! Expands SSIDs, cipher markers and roaming consortium OIs into an ordered
//! list of `NetworkProfileSpec` values, computes the deletion list for retired
//! profiles, and renders the WLAN/LAN profile documents that wrap the EAP
//! configuration block.
//!
//! # Ordering
//!
//! ```text
//! for each SSID:   [<ssid> (TKIP)  WPA/TKIP]  <ssid>  WPA2/AES
//! for each OI:     <name>  WPA2/AES  Hotspot2      (Passpoint platforms only)
//! ```
//!
//! Indices are assigned in that order starting at 0 and name the on-disk
//! artifacts, so the plan is fully determined by the attribute order.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::attributes::{ProfileAttributes, keys};
use crate::config_file::GeneratorConfig;
use crate::engine::selector::EapSelection;
use crate::engine::xml_escape;
use crate::error::{GeneratorError, Result};
use crate::locale::{Locale, Translator};
use crate::types::{AuthMode, Cipher, RemovalMarker};

/// Directory inside the workspace holding profile documents.
pub const PROFILE_DIR: &str = "w8";

/// One WLAN profile the installer creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfileSpec {
    pub display_name: String,
    pub ssid: String,
    pub auth_mode: AuthMode,
    pub cipher: Cipher,
    pub index: usize,
    pub roaming_consortium_oi: Option<String>,
}

impl NetworkProfileSpec {
    pub fn is_passpoint(&self) -> bool {
        self.roaming_consortium_oi.is_some()
    }

    /// Workspace-relative path of the profile document.
    pub fn artifact_path(&self) -> String {
        format!("{}/wlan_prof-{}.xml", PROFILE_DIR, self.index)
    }
}

impl fmt::Display for NetworkProfileSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} \"{}\" ssid={} {}/{}",
            self.index, self.display_name, self.ssid, self.auth_mode, self.cipher
        )?;
        if let Some(oi) = &self.roaming_consortium_oi {
            write!(f, " oi={}", oi)?;
        }
        Ok(())
    }
}

/// Name of a profile the installer removes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionEntry(String);

impl DeletionEntry {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeletionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ordered profile plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfilePlan {
    pub profiles: Vec<NetworkProfileSpec>,
    pub deletions: Vec<DeletionEntry>,
    /// Whether a wired (LAN) profile is built as well.
    pub wired: bool,
    /// Hotspot2 domain name for Passpoint profiles.
    pub passpoint_domain: String,
}

impl ProfilePlan {
    pub fn has_passpoint(&self) -> bool {
        self.profiles.iter().any(NetworkProfileSpec::is_passpoint)
    }

    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Profiles ({}):", self.profiles.len())];
        for profile in &self.profiles {
            lines.push(format!("    {}", profile));
        }
        if self.wired {
            lines.push("    wired LAN profile".to_string());
        }
        lines.push(format!("Deletions ({}):", self.deletions.len()));
        for entry in &self.deletions {
            lines.push(format!("    \"{}\"", entry));
        }
        lines.join("\n")
    }
}

/// Name of the transitional TKIP profile for an SSID.
///
/// Shared by profile creation and deletion so both always agree.
pub fn transitional_name(ssid: &str) -> String {
    format!("{} (TKIP)", ssid)
}

/// Calculate the profile plan.
///
/// # Errors
///
/// - `MalformedAttribute` for an unknown cipher or removal marker, or an SSID
///   listed twice
/// - `MissingAttribute` if a custom consortium OI needs the institution name
///   and none is set
pub fn plan_profiles(
    attrs: &ProfileAttributes,
    selection: &EapSelection,
    config: &GeneratorConfig,
    translator: &dyn Translator,
    locale: &Locale,
) -> Result<ProfilePlan> {
    let mut profiles = Vec::new();
    let mut seen = HashSet::new();

    for (ssid, cipher) in attrs.keyed(keys::SSID) {
        if !seen.insert(ssid) {
            return Err(GeneratorError::malformed(
                keys::SSID,
                format!("SSID '{}' is listed more than once", ssid),
            ));
        }
        let cipher = Cipher::from_str(cipher.trim()).map_err(|_| {
            GeneratorError::malformed(keys::SSID, format!("unknown cipher '{}' for SSID '{}'", cipher, ssid))
        })?;

        // Transitional profile first so it sorts before the stronger one
        if cipher == Cipher::Tkip {
            push_profile(&mut profiles, transitional_name(ssid), ssid, AuthMode::Wpa, Cipher::Tkip, None);
        }
        push_profile(&mut profiles, ssid.to_string(), ssid, AuthMode::Wpa2, Cipher::Aes, None);
    }

    if selection.platform.supports_passpoint() {
        let mut roaming_partner = 1;
        for oi in attrs.texts(keys::CONSORTIA) {
            let oi = oi.trim();
            if oi.is_empty() {
                continue;
            }
            let name = match config.known_oi_name(oi) {
                Some(known) => known.to_string(),
                None => {
                    // Custom OI: never reuse the consortium brand
                    let inst = attrs.require_non_empty(keys::INST_NAME, "roaming partner naming")?;
                    let name = format!(
                        "{} {} {}",
                        inst,
                        translator.translate("Roaming Partner", locale),
                        roaming_partner
                    );
                    roaming_partner += 1;
                    name
                }
            };
            let ssid = config.passpoint_ssid.clone();
            push_profile(&mut profiles, name, &ssid, AuthMode::Wpa2, Cipher::Aes, Some(oi.to_string()));
        }
    }

    let deletions = plan_deletions(attrs)?;

    let passpoint_domain = attrs
        .first_non_empty(keys::REALM)
        .map(str::to_string)
        .unwrap_or_else(|| config.passpoint_domain_fallback.clone());

    Ok(ProfilePlan {
        profiles,
        deletions,
        wired: selection.wired,
        passpoint_domain,
    })
}

fn push_profile(
    profiles: &mut Vec<NetworkProfileSpec>,
    display_name: String,
    ssid: &str,
    auth_mode: AuthMode,
    cipher: Cipher,
    roaming_consortium_oi: Option<String>,
) {
    let index = profiles.len();
    profiles.push(NetworkProfileSpec {
        display_name,
        ssid: ssid.to_string(),
        auth_mode,
        cipher,
        index,
        roaming_consortium_oi,
    });
}

fn plan_deletions(attrs: &ProfileAttributes) -> Result<Vec<DeletionEntry>> {
    attrs
        .keyed(keys::REMOVE_SSID)
        .into_iter()
        .map(|(ssid, marker)| {
            let marker = RemovalMarker::from_str(marker.trim()).map_err(|_| {
                GeneratorError::malformed(
                    keys::REMOVE_SSID,
                    format!("unknown removal marker '{}' for SSID '{}'", marker, ssid),
                )
            })?;
            Ok(DeletionEntry(match marker {
                RemovalMarker::Delete => ssid.to_string(),
                RemovalMarker::Tkip => transitional_name(ssid),
            }))
        })
        .collect()
}

/// A rendered profile document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileArtifact {
    /// Workspace-relative path.
    pub path: String,
    pub contents: String,
}

/// Render every document of the plan around `eap_block`.
pub fn build_artifacts(plan: &ProfilePlan, eap_block: &str) -> Vec<ProfileArtifact> {
    let mut artifacts: Vec<ProfileArtifact> = plan
        .profiles
        .iter()
        .map(|spec| ProfileArtifact {
            path: spec.artifact_path(),
            contents: render_wlan_profile(spec, &plan.passpoint_domain, eap_block),
        })
        .collect();
    if plan.wired {
        artifacts.push(ProfileArtifact {
            path: format!("{}/lan_prof.xml", PROFILE_DIR),
            contents: render_lan_profile(eap_block),
        });
    }
    artifacts
}

fn hotspot2_block(domain: &str, oi: &str) -> String {
    format!(
        "<Hotspot2><DomainName>{}</DomainName><RoamingConsortium><OUI>{}</OUI></RoamingConsortium></Hotspot2>\n",
        xml_escape(domain),
        xml_escape(oi)
    )
}

/// WLANProfile document for one network profile.
pub fn render_wlan_profile(spec: &NetworkProfileSpec, passpoint_domain: &str, eap_block: &str) -> String {
    let mut out = format!(
        "<?xml version=\"1.0\"?>\n\
         <WLANProfile xmlns=\"http://www.microsoft.com/networking/WLAN/profile/v1\">\n\
         <name>{}</name>\n\
         <SSIDConfig>\n\
         <SSID>\n\
         <name>{}</name>\n\
         </SSID>\n\
         <nonBroadcast>true</nonBroadcast>\n\
         </SSIDConfig>\n",
        xml_escape(&spec.display_name),
        xml_escape(&spec.ssid)
    );
    if let Some(oi) = &spec.roaming_consortium_oi {
        out.push_str(&hotspot2_block(passpoint_domain, oi));
    }
    out.push_str(&format!(
        "<connectionType>ESS</connectionType>\n\
         <connectionMode>auto</connectionMode>\n\
         <autoSwitch>false</autoSwitch>\n\
         <MSM>\n\
         <security>\n\
         <authEncryption>\n\
         <authentication>{}</authentication>\n\
         <encryption>{}</encryption>\n\
         <useOneX>true</useOneX>\n\
         </authEncryption>\n",
        spec.auth_mode, spec.cipher
    ));
    if spec.auth_mode == AuthMode::Wpa2 {
        out.push_str(
            "<PMKCacheMode>enabled</PMKCacheMode>\n\
             <PMKCacheTTL>720</PMKCacheTTL>\n\
             <PMKCacheSize>128</PMKCacheSize>\n\
             <preAuthMode>disabled</preAuthMode>\n",
        );
    }
    out.push_str(&one_x(eap_block));
    out.push_str("</security>\n</MSM>\n</WLANProfile>\n");
    out
}

/// LANProfile document.
pub fn render_lan_profile(eap_block: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n\
         <LANProfile xmlns=\"http://www.microsoft.com/networking/LAN/profile/v1\">\n\
         <MSM>\n\
         <security>\n\
         <OneXEnforced>false</OneXEnforced>\n\
         <OneXEnabled>true</OneXEnabled>\n\
         {}\
         </security>\n\
         </MSM>\n\
         </LANProfile>\n",
        one_x(eap_block)
    )
}

fn one_x(eap_block: &str) -> String {
    format!(
        "<OneX xmlns=\"http://www.microsoft.com/networking/OneX/v1\">\n\
         <cacheUserData>true</cacheUserData>\n\
         <authMode>user</authMode>\n\
         {}\n\
         </OneX>\n",
        eap_block
    )
}
