//! End-to-end tests for installer generation
//!
//! These tests verify:
//! - A full build from attributes to a named installer
//! - Signing fallbacks
//! - Compile failures and missing assets
//! - Deletion and transitional profile ordering in the emitted scripts

use std::fs;
use std::path::Path;

use eapgen::attributes::keys;
use eapgen::error::{BuildWarning, ErrorClass, GeneratorError, SignError};
use eapgen::generator::{self, BuildContext, BuildRequest};
use eapgen::pipeline::{InstallerSigner, PackageCompiler, PackagingStage};
use eapgen::{
    AssetSource, AttributeValue, CertificateAuthority, GeneratorConfig, InstallerWorkspace, Locale,
    PassthroughTranslator, Platform, ProfileAttributes,
};

// =============================================================================
// Fixtures
// =============================================================================

const ASSET_FILES: &[&str] = &[
    "wlan_test.exe",
    "check_wired.cmd",
    "install_wired.cmd",
    "cat_bg.bmp",
    "base64.nsh",
    "cat32.ico",
    "cat_150.bmp",
    "WLANSetEAPUserData/WLANSetEAPUserData32.exe",
    "WLANSetEAPUserData/WLANSetEAPUserData64.exe",
    "GEANTLink/GEANTLink-x86.msi",
    "GEANTLink/GEANTLink-x64.msi",
    "GEANTLink/GEANTLink-ARM64.msi",
    "GEANTLink/CredWrite.exe",
    "GEANTLink/MsiUseFeature.exe",
    "Aruba_Networks_EAP-pwd_x32.msi",
    "Aruba_Networks_EAP-pwd_x64.msi",
    "common.inc",
    "eap_w8.inc",
    "geant_link.inc",
    "pwd.inc",
];

fn populate_assets(dir: &Path) {
    for name in ASSET_FILES {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, name.as_bytes()).unwrap();
    }
}

/// Writes a placeholder `installer.exe`.
struct FakeCompiler;

impl PackageCompiler for FakeCompiler {
    fn compile(&self, workspace: &InstallerWorkspace) -> eapgen::error::Result<()> {
        workspace.write_staged("installer.exe", b"MZ")?;
        Ok(())
    }
}

struct BrokenCompiler;

impl PackageCompiler for BrokenCompiler {
    fn compile(&self, _workspace: &InstallerWorkspace) -> eapgen::error::Result<()> {
        Err(GeneratorError::Compile {
            code: 1,
            log: "Error in script \"cat.NSI\" on line 12".to_string(),
        })
    }
}

struct CopySigner;

impl InstallerSigner for CopySigner {
    fn sign(&self, workspace: &InstallerWorkspace, unsigned: &str, signed: &str) -> Result<(), SignError> {
        let from = workspace.path(unsigned).unwrap();
        let to = workspace.path(signed).unwrap();
        fs::copy(from, to).unwrap();
        Ok(())
    }
}

struct FailingSigner;

impl InstallerSigner for FailingSigner {
    fn sign(&self, _workspace: &InstallerWorkspace, _unsigned: &str, _signed: &str) -> Result<(), SignError> {
        Err(SignError::ToolFailed {
            code: 2,
            stderr: "token not present".to_string(),
        })
    }
}

fn ttls_attributes() -> ProfileAttributes {
    ProfileAttributes::new()
        .with(keys::EAP_METHOD, AttributeValue::text("TTLS-MSCHAPv2"))
        .with(keys::USE_ANON_OUTER, AttributeValue::text("on"))
        .with(keys::ANON_LOCAL_VALUE, AttributeValue::text("anon"))
        .with(keys::REALM, AttributeValue::text("example.org"))
        .with(keys::INST_NAME, AttributeValue::text("Example University"))
        .with(keys::SSID, AttributeValue::keyed("eduroam", "AES"))
}

fn request(attributes: ProfileAttributes) -> BuildRequest {
    BuildRequest {
        attributes,
        platform: Platform::W10,
        locale: Locale::default(),
        certificates: vec![CertificateAuthority::from_der(
            b"example root ca".to_vec(),
            true,
            "cert-1.der",
        )],
        client_certificate: None,
    }
}

struct Harness {
    _assets: tempfile::TempDir,
    _build: tempfile::TempDir,
    source: AssetSource,
    workspace: InstallerWorkspace,
    config: GeneratorConfig,
}

impl Harness {
    fn new() -> Self {
        let assets = tempfile::tempdir().unwrap();
        populate_assets(assets.path());
        let build = tempfile::tempdir().unwrap();
        let workspace = InstallerWorkspace::create(build.path().join("ws")).unwrap();
        Self {
            source: AssetSource::new(assets.path()),
            _assets: assets,
            _build: build,
            workspace,
            config: GeneratorConfig::default(),
        }
    }

    fn ctx(&self) -> BuildContext<'_> {
        BuildContext {
            config: &self.config,
            translator: &PassthroughTranslator,
            assets: &self.source,
            compositor: None,
        }
    }

    fn read(&self, file: &str) -> String {
        fs::read_to_string(self.workspace.path(file).unwrap()).unwrap()
    }
}

// =============================================================================
// Full Build Tests
// =============================================================================

#[test]
fn test_ttls_anonymous_build_end_to_end() {
    let h = Harness::new();
    let outcome = generator::build(
        &h.workspace,
        &request(ttls_attributes()),
        &h.ctx(),
        &FakeCompiler,
        None,
    )
    .expect("build succeeds");

    let plan = &outcome.plan;
    assert_eq!(plan.profiles.profiles.len(), 1);
    let profile = &plan.profiles.profiles[0];
    assert_eq!(profile.ssid, "eduroam");
    assert_eq!(profile.index, 0);
    assert_eq!(profile.auth_mode.to_string(), "WPA2");
    assert_eq!(profile.cipher.to_string(), "AES");
    assert!(plan.eap_block.contains("<AnonymousIdentity>anon@example.org</AnonymousIdentity>"));
    assert!(plan.profiles.deletions.is_empty());

    assert_eq!(outcome.stages.last(), Some(&PackagingStage::Done));
    assert!(outcome.stages.contains(&PackagingStage::Unsigned));
    assert!(!outcome.signed);
    assert_eq!(outcome.file_name, "eduroam-installer.exe");
    assert!(outcome.artifact.exists());
    assert!(!h.workspace.exists("installer.exe"));
}

#[test]
fn test_build_writes_scripts_and_documents() {
    let h = Harness::new();
    generator::build(
        &h.workspace,
        &request(ttls_attributes()),
        &h.ctx(),
        &FakeCompiler,
        None,
    )
    .expect("build succeeds");

    let profiles = h.read("profiles.nsh");
    assert_eq!(
        profiles.trim_end(),
        "!insertmacro define_wlan_profile \"eduroam\" \"AES\" 0"
    );
    assert!(!profiles.contains("AdditionalDeletes"));

    let certs = h.read("certs.nsh");
    assert!(certs.starts_with("!insertmacro install_ca_cert \"cert-1.der\""));
    assert!(certs.trim_end().ends_with("\"root\""));

    let main = h.read("main.nsh");
    assert!(main.contains("!define W10"));
    assert!(main.contains("!define ANONYMOUS_IDENTITY"));
    assert!(main.contains("!define REALM \"example.org\""));
    assert!(main.contains("!define PROVIDERID \"urn:UUID:"));
    assert!(main.contains("!define ORGANISATION \"Example University\""));
    assert!(!main.contains("USER_GROUP"));

    let document = h.read("w8/wlan_prof-0.xml");
    assert!(document.contains("<name>eduroam</name>"));
    assert!(document.contains("anon@example.org"));

    assert!(h.workspace.exists("cat.NSI"));
    assert!(h.workspace.exists("common.nsh"));
    assert!(h.workspace.exists("cert-1.der"));
}

#[test]
fn test_signed_build() {
    let h = Harness::new();
    let outcome = generator::build(
        &h.workspace,
        &request(ttls_attributes()),
        &h.ctx(),
        &FakeCompiler,
        Some(&CopySigner),
    )
    .expect("build succeeds");

    assert!(outcome.signed);
    assert_eq!(
        outcome.stages,
        vec![
            PackagingStage::Staged,
            PackagingStage::Compiled,
            PackagingStage::Signed,
            PackagingStage::Done
        ]
    );
    assert!(outcome.artifact.ends_with("eduroam-installer.exe"));
    assert!(outcome.warnings.is_empty());
}

#[test]
fn test_signing_failure_ships_unsigned() {
    let h = Harness::new();
    let outcome = generator::build(
        &h.workspace,
        &request(ttls_attributes()),
        &h.ctx(),
        &FakeCompiler,
        Some(&FailingSigner),
    )
    .expect("signing failures are not fatal");

    assert!(!outcome.signed);
    assert!(outcome.stages.contains(&PackagingStage::Unsigned));
    assert_eq!(outcome.stages.last(), Some(&PackagingStage::Done));
    assert_eq!(outcome.file_name, "eduroam-installer.exe");
    assert!(outcome.artifact.exists());
    assert!(
        outcome
            .warnings
            .iter()
            .any(|w| matches!(w, BuildWarning::SigningFailed(SignError::ToolFailed { code: 2, .. })))
    );
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_compile_failure_surfaces_log() {
    let h = Harness::new();
    let err = generator::build(
        &h.workspace,
        &request(ttls_attributes()),
        &h.ctx(),
        &BrokenCompiler,
        None,
    )
    .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Compile);
    match err {
        GeneratorError::Compile { code, log } => {
            assert_eq!(code, 1);
            assert!(log.contains("line 12"));
        }
        other => panic!("Expected Compile error, got {:?}", other),
    }
    // Scripts stay behind for inspection
    assert!(h.workspace.exists("main.nsh"));
}

#[test]
fn test_missing_asset_is_staging_error() {
    let h = Harness::new();
    fs::remove_file(h.source.root().join("eap_w8.inc")).unwrap();
    let err = generator::build(
        &h.workspace,
        &request(ttls_attributes()),
        &h.ctx(),
        &FakeCompiler,
        None,
    )
    .unwrap_err();
    assert_eq!(err.class(), ErrorClass::Staging);
    assert!(!h.workspace.exists("main.nsh"));
}

#[test]
fn test_silverbullet_without_client_certificate() {
    let h = Harness::new();
    let attrs = ProfileAttributes::new()
        .with(keys::EAP_METHOD, AttributeValue::text("SILVERBULLET"))
        .with(keys::INST_NAME, AttributeValue::text("Example University"))
        .with(keys::SSID, AttributeValue::keyed("eduroam", "AES"));

    let err = generator::build(&h.workspace, &request(attrs), &h.ctx(), &FakeCompiler, None)
        .unwrap_err();
    assert!(matches!(err, GeneratorError::MissingAttribute { .. }));
}

// =============================================================================
// Profile Ordering Tests
// =============================================================================

#[test]
fn test_transitional_profiles_and_deletions_in_scripts() {
    let h = Harness::new();
    let attrs = ProfileAttributes::new()
        .with(keys::EAP_METHOD, AttributeValue::text("PEAP-MSCHAPv2"))
        .with(keys::INST_NAME, AttributeValue::text("Example University"))
        .with(keys::SSID, AttributeValue::keyed("eduroam", "TKIP"))
        .with(keys::SSID, AttributeValue::keyed("campus", "AES"))
        .with(keys::REMOVE_SSID, AttributeValue::keyed("old-net", "DEL"))
        .with(keys::REMOVE_SSID, AttributeValue::keyed("legacy", "TKIP"));

    let outcome = generator::build(&h.workspace, &request(attrs), &h.ctx(), &FakeCompiler, None)
        .expect("build succeeds");
    assert_eq!(outcome.plan.profiles.profiles.len(), 3);

    let lines: Vec<String> = h.read("profiles.nsh").lines().map(str::to_string).collect();
    assert_eq!(
        lines,
        vec![
            "!insertmacro define_wlan_profile \"eduroam (TKIP)\" \"TKIP\" 0",
            "!insertmacro define_wlan_profile \"eduroam\" \"AES\" 0",
            "!insertmacro define_wlan_profile \"campus\" \"AES\" 0",
            "!define AdditionalDeletes",
            "!insertmacro define_delete_profile \"old-net\"",
            "!insertmacro define_delete_profile \"legacy (TKIP)\"",
        ]
    );
    assert!(h.workspace.exists("w8/wlan_prof-2.xml"));
}

#[test]
fn test_passpoint_profiles_on_w10() {
    let h = Harness::new();
    let attrs = ttls_attributes()
        .with(keys::CONSORTIA, AttributeValue::text("001bc50460"))
        .with(keys::CONSORTIA, AttributeValue::text("aabbcc"));

    let outcome = generator::build(&h.workspace, &request(attrs), &h.ctx(), &FakeCompiler, None)
        .expect("build succeeds");
    let names: Vec<&str> = outcome
        .plan
        .profiles
        .profiles
        .iter()
        .map(|p| p.display_name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["eduroam", "eduroam", "Example University Roaming Partner 1"]
    );
    assert!(h.read("main.nsh").contains("!define PASSPOINT"));
    assert!(h.read("profiles.nsh").contains("\"Example University Roaming Partner 1\" \"AES\" 1"));
}

#[test]
fn test_passpoint_skipped_on_w8() {
    let h = Harness::new();
    let attrs = ttls_attributes().with(keys::CONSORTIA, AttributeValue::text("001bc50460"));
    let mut req = request(attrs);
    req.platform = Platform::W8;

    let outcome = generator::build(&h.workspace, &req, &h.ctx(), &FakeCompiler, None)
        .expect("build succeeds");
    assert_eq!(outcome.plan.profiles.profiles.len(), 1);
    assert!(!h.read("main.nsh").contains("PASSPOINT"));
}

// =============================================================================
// Supplicant Packaging Tests
// =============================================================================

#[test]
fn test_pwd_build_stages_supplicant() {
    let h = Harness::new();
    let attrs = ProfileAttributes::new()
        .with(keys::EAP_METHOD, AttributeValue::text("PWD"))
        .with(keys::INST_NAME, AttributeValue::text("Example University"))
        .with(keys::SSID, AttributeValue::keyed("eduroam", "AES"));

    let outcome = generator::build(&h.workspace, &request(attrs), &h.ctx(), &FakeCompiler, None)
        .expect("build succeeds");

    assert_eq!(outcome.stages.last(), Some(&PackagingStage::Done));
    let main = h.read("main.nsh");
    assert!(main.lines().any(|l| l == "!define PWD"));
    assert!(!main.contains("GEANTLink"));
    assert!(h.workspace.exists("Aruba_Networks_EAP-pwd_x32.msi"));
    assert!(h.workspace.exists("Aruba_Networks_EAP-pwd_x64.msi"));
    assert!(!h.workspace.exists("GEANTLink-x64.msi"));
    assert_eq!(h.read("cat.NSI"), "pwd.inc");
}

#[test]
fn test_geantlink_build_end_to_end() {
    let h = Harness::new();
    let attrs = ttls_attributes().with(keys::ALT_SUPPLICANT, AttributeValue::text("on"));

    let outcome = generator::build(&h.workspace, &request(attrs), &h.ctx(), &FakeCompiler, None)
        .expect("build succeeds");

    assert!(outcome.plan.eap_block.contains("67532"));
    let main = h.read("main.nsh");
    assert!(main.lines().any(|l| l == "!define GEANTLink"));
    assert!(!main.lines().any(|l| l == "!define TTLS"));

    let document = h.read("w8/wlan_prof-0.xml");
    assert!(document.contains(">67532</AuthorId>"));
    assert!(!document.contains(">311</AuthorId>"));

    for file in [
        "GEANTLink-x86.msi",
        "GEANTLink-x64.msi",
        "GEANTLink-ARM64.msi",
        "CredWrite.exe",
        "MsiUseFeature.exe",
    ] {
        assert!(h.workspace.exists(file), "{} not staged", file);
    }
    assert_eq!(h.read("cat.NSI"), "geant_link.inc");
}

// =============================================================================
// Reused Workspace Tests
// =============================================================================

/// Reports success without producing `installer.exe`.
struct SilentCompiler;

impl PackageCompiler for SilentCompiler {
    fn compile(&self, _workspace: &InstallerWorkspace) -> eapgen::error::Result<()> {
        Ok(())
    }
}

#[test]
fn test_reused_workspace_does_not_ship_old_installer() {
    let h = Harness::new();
    h.workspace.write_staged("installer.exe", b"OLD BUILD").unwrap();
    h.workspace.write_staged("eduroam-installer.exe", b"OLD BUILD").unwrap();

    let err = generator::build(
        &h.workspace,
        &request(ttls_attributes()),
        &h.ctx(),
        &SilentCompiler,
        None,
    )
    .unwrap_err();

    assert_eq!(err.class(), ErrorClass::Compile);
    assert!(!h.workspace.exists("installer.exe"));
    assert!(!h.workspace.exists("eduroam-installer.exe"));
}

#[test]
fn test_reused_workspace_rebuild_replaces_installer() {
    let h = Harness::new();
    h.workspace.write_staged("eduroam-installer.exe", b"OLD BUILD").unwrap();

    let outcome = generator::build(
        &h.workspace,
        &request(ttls_attributes()),
        &h.ctx(),
        &FakeCompiler,
        None,
    )
    .expect("build succeeds");

    assert_eq!(fs::read(&outcome.artifact).unwrap(), b"MZ");
}
