//! Installer generation.
//!
//! Runs the stages in order, each one fed by the previous:
//!
//! ```text
//! attributes
//!   → select_method      (engine::selector)
//!   → compose            (engine::eap_config)
//!   → plan_profiles      (engine::profiles)
//!   → stage_all          (staging, branding)
//!   → emit_scripts       (script_emitter)
//!   → package            (pipeline)
//! ```
//!
//! The first three stages are pure and together form a `BuildPlan`. All
//! validation happens there, so a bad request never touches the workspace.

use std::path::PathBuf;

use tracing::{info, warn};
use uuid::Uuid;

use crate::attributes::{ProfileAttributes, keys};
use crate::branding::LogoCompositor;
use crate::certificate::CertificateAuthority;
use crate::config_file::GeneratorConfig;
use crate::engine::eap_config::{self, EapConfigInputs, Representation};
use crate::engine::profiles::{self, ProfileArtifact, ProfilePlan};
use crate::engine::selector::{self, EapSelection};
use crate::error::{BuildWarning, GeneratorError, Result};
use crate::locale::{Locale, Translator};
use crate::pipeline::{self, InstallerSigner, PackageCompiler, PackagingStage};
use crate::script_emitter::{self, DefineInputs, EmittedScripts};
use crate::staging::{self, AssetSource, StagingInputs, StagingManifest};
use crate::types::Platform;
use crate::workspace::InstallerWorkspace;

/// One build request.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub attributes: ProfileAttributes,
    pub platform: Platform,
    pub locale: Locale,
    pub certificates: Vec<CertificateAuthority>,
    /// PKCS#12 bytes for SILVERBULLET.
    pub client_certificate: Option<Vec<u8>>,
}

/// Collaborators shared by builds.
pub struct BuildContext<'a> {
    pub config: &'a GeneratorConfig,
    pub translator: &'a dyn Translator,
    pub assets: &'a AssetSource,
    pub compositor: Option<&'a dyn LogoCompositor>,
}

/// Output of the pure stages.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub selection: EapSelection,
    /// `EapHostConfig` block embedded in every profile.
    pub eap_block: String,
    pub profiles: ProfilePlan,
    pub artifacts: Vec<ProfileArtifact>,
    /// Provider UUID without the `urn:UUID:` prefix.
    pub provider_id: String,
    pub warnings: Vec<BuildWarning>,
}

impl BuildPlan {
    pub fn summary(&self) -> String {
        let s = &self.selection;
        let mut out = vec![
            format!("Platform: {}", s.platform),
            format!("Method: {} ({})", s.method, s.packaging_method_name()),
            format!(
                "Anonymous identity: {}",
                s.anonymous
                    .as_ref()
                    .map(|a| a.identity())
                    .unwrap_or_else(|| "off".to_string())
            ),
            format!("Wired: {}", if s.wired { "on" } else { "off" }),
            format!("Provider: urn:UUID:{}", self.provider_id),
            self.profiles.summary(),
        ];
        for w in &self.warnings {
            out.push(format!("Warning: {}", w));
        }
        out.join("\n")
    }
}

/// Everything written into the workspace before packaging.
#[derive(Debug, Clone)]
pub struct PreparedBuild {
    pub plan: BuildPlan,
    pub manifest: StagingManifest,
    pub scripts: EmittedScripts,
}

impl PreparedBuild {
    /// Warnings from every stage so far.
    pub fn warnings(&self) -> Vec<BuildWarning> {
        self.plan
            .warnings
            .iter()
            .chain(&self.manifest.warnings)
            .cloned()
            .collect()
    }
}

/// A finished installer.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub artifact: PathBuf,
    pub file_name: String,
    pub signed: bool,
    pub stages: Vec<PackagingStage>,
    pub warnings: Vec<BuildWarning>,
    pub plan: BuildPlan,
}

/// Deterministic provider identifier for a profile on a platform.
pub fn provider_id(platform: Platform, attrs: &ProfileAttributes) -> Result<String> {
    let seed = match attrs.first_non_empty(keys::PROFILE_ID) {
        Some(id) => id.to_string(),
        None => attrs
            .require_non_empty(keys::INST_NAME, "provider identifier")?
            .to_string(),
    };
    let uuid = Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("{}:{}", platform, seed).as_bytes());
    Ok(uuid.to_string())
}

/// Run the pure stages: selection, EAP composition and profile planning.
///
/// # Errors
///
/// Validation errors only.
pub fn plan_build(
    request: &BuildRequest,
    config: &GeneratorConfig,
    translator: &dyn Translator,
) -> Result<BuildPlan> {
    let attrs = &request.attributes;

    let selection = selector::select_method(attrs, request.platform)?;
    info!(
        "Selected {} on {} (anonymous: {}, alternate supplicant: {})",
        selection.method,
        selection.platform,
        selection.use_anonymous_identity(),
        selection.use_alternate_supplicant
    );

    script_emitter::validate_define_attributes(attrs)?;
    let provider_id = provider_id(request.platform, attrs)?;

    let inst_name = attrs.require_non_empty(keys::INST_NAME, "EAP provider display name")?;
    let display_name = translator.translate(inst_name, &request.locale);
    let server_names: Vec<String> = attrs
        .texts(keys::SERVER_NAME)
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let composed = eap_config::compose(
        &EapConfigInputs {
            selection: &selection,
            certificates: &request.certificates,
            server_names: &server_names,
            display_name: &display_name,
            provider_id: &provider_id,
        },
        &[Representation::EapHost],
    );
    let eap_block = composed
        .block(Representation::EapHost)
        .map(str::to_string)
        .ok_or_else(|| GeneratorError::config("EAP composer produced no EapHost block"))?;

    let profiles = profiles::plan_profiles(attrs, &selection, config, translator, &request.locale)?;
    let artifacts = profiles::build_artifacts(&profiles, &eap_block);

    Ok(BuildPlan {
        selection,
        eap_block,
        profiles,
        artifacts,
        provider_id,
        warnings: composed.warnings,
    })
}

/// Plan, stage and emit scripts.
pub fn prepare(
    workspace: &InstallerWorkspace,
    request: &BuildRequest,
    ctx: &BuildContext<'_>,
) -> Result<PreparedBuild> {
    let plan = plan_build(request, ctx.config, ctx.translator)?;

    let manifest = staging::stage_all(
        workspace,
        ctx.assets,
        &StagingInputs {
            attributes: &request.attributes,
            selection: &plan.selection,
            certificates: &request.certificates,
            client_certificate: request.client_certificate.as_deref(),
            profiles: &plan.artifacts,
            locale: &request.locale,
            translator: ctx.translator,
            compositor: ctx.compositor,
        },
    )?;

    let scripts = script_emitter::emit_scripts(
        workspace,
        &DefineInputs {
            attributes: &request.attributes,
            selection: &plan.selection,
            plan: &plan.profiles,
            manifest: &manifest,
            config: ctx.config,
            locale: &request.locale,
            translator: ctx.translator,
            provider_id: &plan.provider_id,
        },
    )?;

    Ok(PreparedBuild {
        plan,
        manifest,
        scripts,
    })
}

/// Compile and sign a prepared workspace.
pub fn package(
    workspace: &InstallerWorkspace,
    prepared: PreparedBuild,
    config: &GeneratorConfig,
    compiler: &dyn PackageCompiler,
    signer: Option<&dyn InstallerSigner>,
) -> Result<BuildOutcome> {
    let file_name = config.installer_file_name();
    let mut warnings = prepared.warnings();
    let outcome = pipeline::package(workspace, compiler, signer, &file_name)?;
    warnings.extend(outcome.warnings);

    for w in &warnings {
        warn!("Build warning: {}", w);
    }

    Ok(BuildOutcome {
        artifact: outcome.artifact,
        file_name: outcome.file_name,
        signed: outcome.signed,
        stages: outcome.history,
        warnings,
        plan: prepared.plan,
    })
}

/// Run every stage.
pub fn build(
    workspace: &InstallerWorkspace,
    request: &BuildRequest,
    ctx: &BuildContext<'_>,
    compiler: &dyn PackageCompiler,
    signer: Option<&dyn InstallerSigner>,
) -> Result<BuildOutcome> {
    let prepared = prepare(workspace, request, ctx)?;
    package(workspace, prepared, ctx.config, compiler, signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttributeValue;
    use crate::locale::PassthroughTranslator;

    fn request(attrs: ProfileAttributes) -> BuildRequest {
        BuildRequest {
            attributes: attrs,
            platform: Platform::W10,
            locale: Locale::default(),
            certificates: vec![CertificateAuthority::from_der(b"root".to_vec(), true, "cert-1.der")],
            client_certificate: None,
        }
    }

    fn base() -> ProfileAttributes {
        ProfileAttributes::new()
            .with(keys::EAP_METHOD, AttributeValue::text("PEAP-MSCHAPv2"))
            .with(keys::INST_NAME, AttributeValue::text("Example University"))
            .with(keys::SSID, AttributeValue::keyed("eduroam", "AES"))
    }

    #[test]
    fn test_provider_id_is_stable() {
        let a = provider_id(Platform::W10, &base()).unwrap();
        assert_eq!(a, provider_id(Platform::W10, &base()).unwrap());
        assert_ne!(a, provider_id(Platform::W8, &base()).unwrap());
        let with_id = base().with(keys::PROFILE_ID, AttributeValue::text("42"));
        assert_ne!(a, provider_id(Platform::W10, &with_id).unwrap());
        assert!(provider_id(Platform::W10, &ProfileAttributes::new()).is_err());
    }

    #[test]
    fn test_plan_build() {
        let plan = plan_build(&request(base()), &GeneratorConfig::default(), &PassthroughTranslator)
            .expect("plan");
        assert_eq!(plan.artifacts.len(), 1);
        assert!(plan.artifacts[0].contents.contains(&plan.eap_block));
        assert!(plan.warnings.is_empty());
        assert!(plan.summary().contains("Method: PEAP-MSCHAPv2 (PEAP)"));
    }

    #[test]
    fn test_plan_warns_without_root() {
        let mut req = request(base());
        req.certificates.clear();
        let plan = plan_build(&req, &GeneratorConfig::default(), &PassthroughTranslator).expect("plan");
        assert!(matches!(plan.warnings[0], BuildWarning::NoRootCertificate { .. }));
    }

    #[test]
    fn test_validation_before_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let ws = InstallerWorkspace::create(dir.path().join("ws")).unwrap();
        let assets = AssetSource::new(dir.path().join("assets"));
        let config = GeneratorConfig::default();
        let ctx = BuildContext {
            config: &config,
            translator: &PassthroughTranslator,
            assets: &assets,
            compositor: None,
        };
        let bad = base().with(keys::SSID, AttributeValue::keyed("x", "WEP"));
        let err = prepare(&ws, &request(bad), &ctx).unwrap_err();
        assert_eq!(err.class(), crate::error::ErrorClass::Validation);
        assert_eq!(std::fs::read_dir(ws.root()).unwrap().count(), 0);
    }
}
