//! Certificate and asset staging.
//!
//! Copies everything the packaging script references into the workspace and
//! records it in a `StagingManifest`. Any missing asset aborts the build here,
//! before a single script fragment is written.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::attributes::{ProfileAttributes, keys};
use crate::branding::{self, LogoCompositor};
use crate::certificate::CertificateAuthority;
use crate::engine::profiles::ProfileArtifact;
use crate::engine::selector::EapSelection;
use crate::error::{BuildWarning, GeneratorError, Result};
use crate::locale::{Locale, Translator};
use crate::types::{OuterMethod, Platform};
use crate::workspace::InstallerWorkspace;

/// Packaging script entry point.
pub const MAIN_SCRIPT: &str = "cat.NSI";
/// Branding background.
pub const BACKGROUND_IMAGE: &str = "cat_bg.bmp";
/// Staged client certificate for SILVERBULLET.
pub const CLIENT_CERTIFICATE: &str = "SB_cert.p12";

/// `(source, target)`; `None` keeps the source file name.
type AssetCopy = (&'static str, Option<&'static str>);

const BASIC_ASSETS: &[AssetCopy] = &[
    ("wlan_test.exe", None),
    ("check_wired.cmd", None),
    ("install_wired.cmd", None),
    (BACKGROUND_IMAGE, None),
    ("base64.nsh", None),
    ("cat32.ico", None),
    ("cat_150.bmp", None),
    ("WLANSetEAPUserData/WLANSetEAPUserData32.exe", Some("WLANSetEAPUserDatax86.exe")),
    ("WLANSetEAPUserData/WLANSetEAPUserData64.exe", Some("WLANSetEAPUserDatax64.exe")),
];

const ALTERNATE_SUPPLICANT_ASSETS: &[AssetCopy] = &[
    ("GEANTLink/GEANTLink-x86.msi", Some("GEANTLink-x86.msi")),
    ("GEANTLink/GEANTLink-x64.msi", Some("GEANTLink-x64.msi")),
    ("GEANTLink/GEANTLink-ARM64.msi", Some("GEANTLink-ARM64.msi")),
    ("GEANTLink/CredWrite.exe", Some("CredWrite.exe")),
    ("GEANTLink/MsiUseFeature.exe", Some("MsiUseFeature.exe")),
];

const PWD_ASSETS: &[AssetCopy] = &[
    ("Aruba_Networks_EAP-pwd_x32.msi", None),
    ("Aruba_Networks_EAP-pwd_x64.msi", None),
];

/// Read-only directory of installer assets.
///
/// A file under `<root>/<platform>/` overrides the shared one at `<root>/`.
#[derive(Debug, Clone)]
pub struct AssetSource {
    root: PathBuf,
}

impl AssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate `name`, preferring the platform-specific copy.
    pub fn resolve(&self, platform: Platform, name: &str) -> Result<PathBuf> {
        let specific = self.root.join(platform.to_string()).join(name);
        if specific.is_file() {
            return Ok(specific);
        }
        let shared = self.root.join(name);
        if shared.is_file() {
            return Ok(shared);
        }
        Err(GeneratorError::staging(
            name,
            format!("asset not found in {}", self.root.display()),
        ))
    }
}

/// A certificate written into the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedCertificate {
    pub file_name: String,
    pub sha1: String,
    /// `"root"` or `"ca"`.
    pub store: &'static str,
}

/// Terms-of-use file handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoFile {
    /// Shown as the installer license page.
    License(String),
    /// Shown as an external document.
    External(String),
}

/// What staging put into the workspace.
#[derive(Debug, Clone, Default)]
pub struct StagingManifest {
    pub certificates: Vec<StagedCertificate>,
    /// Workspace-relative file names, in staging order.
    pub files: Vec<String>,
    pub info_file: Option<InfoFile>,
    pub client_certificate: Option<String>,
    pub warnings: Vec<BuildWarning>,
}

impl StagingManifest {
    fn record(&mut self, file: impl Into<String>) {
        self.files.push(file.into());
    }

    pub fn contains(&self, file: &str) -> bool {
        self.files.iter().any(|f| f == file)
    }
}

/// Everything staging needs from the previous stages.
pub struct StagingInputs<'a> {
    pub attributes: &'a ProfileAttributes,
    pub selection: &'a EapSelection,
    pub certificates: &'a [CertificateAuthority],
    /// PKCS#12 bytes, required for SILVERBULLET.
    pub client_certificate: Option<&'a [u8]>,
    pub profiles: &'a [ProfileArtifact],
    pub locale: &'a Locale,
    pub translator: &'a dyn Translator,
    pub compositor: Option<&'a dyn LogoCompositor>,
}

/// Stage certificates, profile documents and helper assets.
///
/// # Errors
///
/// - `Staging` for any file that cannot be read or written
/// - `MissingAttribute` if SILVERBULLET is selected without a client certificate
pub fn stage_all(
    workspace: &InstallerWorkspace,
    assets: &AssetSource,
    inputs: &StagingInputs<'_>,
) -> Result<StagingManifest> {
    let mut manifest = StagingManifest::default();

    stage_certificates(workspace, inputs.certificates, &mut manifest)?;

    for artifact in inputs.profiles {
        workspace.write_staged(&artifact.path, artifact.contents.as_bytes())?;
        manifest.record(artifact.path.clone());
    }

    if inputs.selection.method.needs_client_certificate() {
        let p12 = inputs
            .client_certificate
            .ok_or_else(|| GeneratorError::missing("client_certificate", "SILVERBULLET provisioning"))?;
        workspace.write_staged(CLIENT_CERTIFICATE, p12)?;
        manifest.record(CLIENT_CERTIFICATE);
        manifest.client_certificate = Some(CLIENT_CERTIFICATE.to_string());
    }

    let platform = inputs.selection.platform;
    copy_assets(workspace, assets, platform, BASIC_ASSETS, &mut manifest)?;
    translate_template(workspace, assets, inputs, "common.inc", "common.nsh", &mut manifest)?;

    match (inputs.selection.outer(), inputs.selection.use_alternate_supplicant) {
        (OuterMethod::Ttls, true) => {
            copy_assets(workspace, assets, platform, ALTERNATE_SUPPLICANT_ASSETS, &mut manifest)?;
            translate_template(workspace, assets, inputs, "geant_link.inc", MAIN_SCRIPT, &mut manifest)?;
        }
        (OuterMethod::Pwd, _) => {
            copy_assets(workspace, assets, platform, PWD_ASSETS, &mut manifest)?;
            translate_template(workspace, assets, inputs, "pwd.inc", MAIN_SCRIPT, &mut manifest)?;
        }
        _ => {
            translate_template(workspace, assets, inputs, "eap_w8.inc", MAIN_SCRIPT, &mut manifest)?;
        }
    }

    stage_branding(workspace, inputs, &mut manifest)?;
    let info_file = stage_info_file(workspace, inputs.attributes, &mut manifest)?;
    manifest.info_file = info_file;

    info!(
        "Staged {} files and {} certificates",
        manifest.files.len(),
        manifest.certificates.len()
    );
    Ok(manifest)
}

fn stage_certificates(
    workspace: &InstallerWorkspace,
    certificates: &[CertificateAuthority],
    manifest: &mut StagingManifest,
) -> Result<()> {
    for ca in certificates {
        workspace.write_staged(ca.staged_file_name(), ca.der())?;
        debug!("Staged {} ({}, {})", ca.staged_file_name(), ca.store(), ca.sha1_plain());
        manifest.record(ca.staged_file_name());
        manifest.certificates.push(StagedCertificate {
            file_name: ca.staged_file_name().to_string(),
            sha1: ca.sha1_plain().to_string(),
            store: ca.store(),
        });
    }
    Ok(())
}

fn copy_assets(
    workspace: &InstallerWorkspace,
    assets: &AssetSource,
    platform: Platform,
    list: &[AssetCopy],
    manifest: &mut StagingManifest,
) -> Result<()> {
    for &(source, target) in list {
        let target = target.unwrap_or(source);
        let path = assets.resolve(platform, source)?;
        workspace.copy_in(&path, target)?;
        manifest.record(target);
    }
    Ok(())
}

fn translate_template(
    workspace: &InstallerWorkspace,
    assets: &AssetSource,
    inputs: &StagingInputs<'_>,
    source: &str,
    target: &str,
    manifest: &mut StagingManifest,
) -> Result<()> {
    let path = assets.resolve(inputs.selection.platform, source)?;
    let template = fs::read_to_string(&path).map_err(|e| GeneratorError::staging(&path, e))?;
    let translated = inputs.translator.translate_template(&template, inputs.locale);
    workspace.write_staged(target, translated.as_bytes())?;
    manifest.record(target);
    Ok(())
}

fn stage_branding(
    workspace: &InstallerWorkspace,
    inputs: &StagingInputs<'_>,
    manifest: &mut StagingManifest,
) -> Result<()> {
    let attrs = inputs.attributes;
    let mut logos = Vec::new();
    if attrs.contains(keys::FED_INCLUDE_LOGO) {
        if let Some(fed) = attrs.first_file(keys::FED_LOGO) {
            logos.push(fed.path.to_path_buf());
        }
    }
    if let Some(inst) = attrs.first_file(keys::INST_LOGO) {
        logos.push(inst.path.to_path_buf());
    }
    if logos.is_empty() {
        return Ok(());
    }

    match inputs.compositor {
        Some(compositor) => {
            let background = workspace.path(BACKGROUND_IMAGE)?;
            branding::apply_branding(compositor, &background, &logos)?;
        }
        None => {
            let reason = format!("{} logo(s) configured but no image compositor available", logos.len());
            warn!("Branding skipped: {}", reason);
            manifest.warnings.push(BuildWarning::BrandingSkipped { reason });
        }
    }
    Ok(())
}

fn stage_info_file(
    workspace: &InstallerWorkspace,
    attrs: &ProfileAttributes,
    manifest: &mut StagingManifest,
) -> Result<Option<InfoFile>> {
    let Some(file) = attrs.first_file(keys::INFO_FILE) else {
        return Ok(None);
    };
    let mime = file.mime.trim().to_ascii_lowercase();
    let target = format!("info_f.{}", if mime.is_empty() { "bin" } else { mime.as_str() });

    if mime == "txt" {
        // Plain text becomes the license page only if it has content
        let text = fs::read(file.path).map_err(|e| GeneratorError::staging(file.path, e))?;
        if text.is_empty() {
            return Ok(None);
        }
        workspace.write_staged(&target, &text)?;
        manifest.record(target.clone());
        return Ok(Some(InfoFile::License(target)));
    }

    workspace.copy_in(file.path, &target)?;
    manifest.record(target.clone());
    Ok(Some(if mime == "rtf" {
        InfoFile::License(target)
    } else {
        InfoFile::External(target)
    }))
}
