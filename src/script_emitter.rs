//! Packaging script emission.
//!
//! Fragments are written in a fixed order that the packaging macros rely on:
//!
//! ```text
//! profiles.nsh   define_wlan_profile ...     (one per profile, creation order)
//! certs.nsh      install_ca_cert ...         (one per CA)
//! profiles.nsh   AdditionalDeletes + define_delete_profile ... (appended)
//! main.nsh       global defines
//! ```
//!
//! Every quoted value goes through [`nsis_escape`] when rendered, so callers
//! pass raw (already translated) text.

use std::fmt;

use tracing::{debug, info};

use crate::attributes::{ProfileAttributes, keys};
use crate::config_file::GeneratorConfig;
use crate::engine::profiles::ProfilePlan;
use crate::engine::selector::EapSelection;
use crate::error::{GeneratorError, Result};
use crate::locale::{Locale, Translator};
use crate::staging::{InfoFile, StagingManifest};
use crate::types::Cipher;
use crate::workspace::InstallerWorkspace;

pub const PROFILES_SCRIPT: &str = "profiles.nsh";
pub const CERTS_SCRIPT: &str = "certs.nsh";
pub const MAIN_DEFINES: &str = "main.nsh";
/// Name the compiler gives the installer before signing.
pub const COMPILED_INSTALLER: &str = "installer.exe";

/// Escape double quotes the way the packaging tool expects (`"` → `$\"`).
pub fn nsis_escape(text: &str) -> String {
    text.replace('"', "$\\\"")
}

/// One line of a packaging script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    DefineProfile {
        name: String,
        cipher: Cipher,
        passpoint: bool,
    },
    InstallCa {
        file: String,
        sha1: String,
        store: &'static str,
    },
    /// Marks the start of the deletion list.
    AdditionalDeletes,
    DeleteProfile {
        name: String,
    },
    /// `!define NAME`
    Flag(&'static str),
    /// `!define NAME "value"`
    Define { name: &'static str, value: String },
    /// `!define NAME value`
    DefineNumber { name: &'static str, value: u32 },
    /// `Keyword "value"`
    Attribute { keyword: &'static str, value: String },
    /// Emitted verbatim.
    Raw(&'static str),
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DefineProfile {
                name,
                cipher,
                passpoint,
            } => write!(
                f,
                "!insertmacro define_wlan_profile \"{}\" \"{}\" {}",
                nsis_escape(name),
                cipher,
                u8::from(*passpoint)
            ),
            Self::InstallCa { file, sha1, store } => write!(
                f,
                "!insertmacro install_ca_cert \"{}\" \"{}\" \"{}\"",
                nsis_escape(file),
                sha1,
                store
            ),
            Self::AdditionalDeletes => f.write_str("!define AdditionalDeletes"),
            Self::DeleteProfile { name } => {
                write!(f, "!insertmacro define_delete_profile \"{}\"", nsis_escape(name))
            }
            Self::Flag(name) => write!(f, "!define {}", name),
            Self::Define { name, value } => write!(f, "!define {} \"{}\"", name, nsis_escape(value)),
            Self::DefineNumber { name, value } => write!(f, "!define {} {}", name, value),
            Self::Attribute { keyword, value } => write!(f, "{} \"{}\"", keyword, nsis_escape(value)),
            Self::Raw(line) => f.write_str(line),
        }
    }
}

fn render(directives: &[Directive]) -> String {
    let mut out = String::new();
    for d in directives {
        out.push_str(&d.to_string());
        out.push('\n');
    }
    out
}

// ============================================================================
// Directive lists
// ============================================================================

pub fn profile_directives(plan: &ProfilePlan) -> Vec<Directive> {
    plan.profiles
        .iter()
        .map(|p| Directive::DefineProfile {
            name: p.display_name.clone(),
            cipher: p.cipher,
            passpoint: p.is_passpoint(),
        })
        .collect()
}

pub fn certificate_directives(manifest: &StagingManifest) -> Vec<Directive> {
    manifest
        .certificates
        .iter()
        .map(|c| Directive::InstallCa {
            file: c.file_name.clone(),
            sha1: c.sha1.clone(),
            store: c.store,
        })
        .collect()
}

/// Empty when nothing is retired; otherwise the marker followed by one entry
/// per deletion.
pub fn deletion_directives(plan: &ProfilePlan) -> Vec<Directive> {
    if plan.deletions.is_empty() {
        return Vec::new();
    }
    std::iter::once(Directive::AdditionalDeletes)
        .chain(plan.deletions.iter().map(|d| Directive::DeleteProfile {
            name: d.as_str().to_string(),
        }))
        .collect()
}

/// Check the attributes global defines depend on.
///
/// Run before staging so a bad request never leaves files behind.
pub fn validate_define_attributes(attrs: &ProfileAttributes) -> Result<()> {
    attrs.require_non_empty(keys::INST_NAME, "installer organisation")?;
    if profile_count(attrs)? > 1 {
        attrs.require_non_empty(keys::PROFILE_NAME, "user group of a multi-profile institution")?;
    }
    Ok(())
}

fn profile_count(attrs: &ProfileAttributes) -> Result<u32> {
    match attrs.first_non_empty(keys::PROFILE_COUNT) {
        None => Ok(1),
        Some(raw) => raw.trim().parse().map_err(|_| {
            GeneratorError::malformed(keys::PROFILE_COUNT, format!("'{}' is not a profile count", raw))
        }),
    }
}

/// Inputs for the global defines.
pub struct DefineInputs<'a> {
    pub attributes: &'a ProfileAttributes,
    pub selection: &'a EapSelection,
    pub plan: &'a ProfilePlan,
    pub manifest: &'a StagingManifest,
    pub config: &'a GeneratorConfig,
    pub locale: &'a Locale,
    pub translator: &'a dyn Translator,
    /// Provider UUID, without the `urn:UUID:` prefix.
    pub provider_id: &'a str,
}

pub fn global_defines(inputs: &DefineInputs<'_>) -> Result<Vec<Directive>> {
    let attrs = inputs.attributes;
    let selection = inputs.selection;
    let config = inputs.config;
    let tr = |text: &str| inputs.translator.translate(text, inputs.locale);

    let mut out: Vec<Directive> = selection
        .platform
        .defines()
        .iter()
        .map(|&name| Directive::Flag(name))
        .collect();
    if config.nsis_major_version >= 3 {
        out.push(Directive::Raw("Unicode true"));
    }

    if selection.tls_other_username {
        out.push(Directive::Flag("PFX_USERNAME"));
    }
    if selection.method.needs_client_certificate() {
        out.push(Directive::Flag("SILVERBULLET"));
    }
    out.push(Directive::Flag(selection.packaging_method_name()));
    out.push(Directive::Define {
        name: "EXECLEVEL",
        value: config.exec_level.clone(),
    });
    if selection.use_anonymous_identity() {
        out.push(Directive::Flag("ANONYMOUS_IDENTITY"));
    }
    if inputs.plan.has_passpoint() {
        out.push(Directive::Flag("PASSPOINT"));
    }
    out.push(Directive::DefineNumber {
        name: "NSIS_MAJOR_VERSION",
        value: u32::from(config.nsis_major_version),
    });

    let inst_name = attrs.require_non_empty(keys::INST_NAME, "installer organisation")?;
    if profile_count(attrs)? > 1 {
        let group = attrs.require_non_empty(keys::PROFILE_NAME, "user group of a multi-profile institution")?;
        out.push(Directive::Define {
            name: "USER_GROUP",
            value: tr(group),
        });
    }

    let caption = tr("%s installer for %s")
        .replacen("%s", &config.consortium_display_name, 1)
        .replacen("%s", inst_name, 1);
    out.push(Directive::Attribute {
        keyword: "Caption",
        value: caption.clone(),
    });
    out.push(Directive::Define {
        name: "APPLICATION",
        value: caption,
    });
    out.push(Directive::Define {
        name: "VERSION",
        value: config.version_string(),
    });
    out.push(Directive::Define {
        name: "INSTALLER_NAME",
        value: COMPILED_INSTALLER.to_string(),
    });
    out.push(Directive::Define {
        name: "LANG",
        value: inputs.locale.nsis_name.to_string(),
    });
    out.push(Directive::Define {
        name: "LOCALE",
        value: inputs.locale.posix.to_string(),
    });
    out.push(Directive::Raw(";--------------------------------"));
    out.push(Directive::Define {
        name: "ORGANISATION",
        value: tr(inst_name),
    });
    out.push(Directive::Define {
        name: "SUPPORT",
        value: attrs
            .first_non_empty(keys::SUPPORT_EMAIL)
            .map(str::to_string)
            .unwrap_or_else(|| tr(&config.support_email_substitute)),
    });
    out.push(Directive::Define {
        name: "URL",
        value: attrs
            .first_non_empty(keys::SUPPORT_URL)
            .map(str::to_string)
            .unwrap_or_else(|| tr(&config.support_url_substitute)),
    });
    if selection.wired {
        out.push(Directive::Flag("WIRED"));
    }
    out.push(Directive::Define {
        name: "PROVIDERID",
        value: format!("urn:UUID:{}", inputs.provider_id),
    });
    if let Some(realm) = attrs.first_non_empty(keys::REALM) {
        out.push(Directive::Define {
            name: "REALM",
            value: realm.to_string(),
        });
    }
    if attrs.first_text(keys::HINT_USERINPUT_SUFFIX).map(str::trim) == Some("1") {
        out.push(Directive::Define {
            name: "HINT_USER_INPUT",
            value: "1".to_string(),
        });
    }
    if attrs.first_text(keys::VERIFY_USERINPUT_SUFFIX).map(str::trim) == Some("1") {
        out.push(Directive::Define {
            name: "VERIFY_USER_REALM_INPUT",
            value: "1".to_string(),
        });
    }
    match &inputs.manifest.info_file {
        Some(InfoFile::License(file)) => out.push(Directive::Define {
            name: "LICENSE_FILE",
            value: file.clone(),
        }),
        Some(InfoFile::External(file)) => out.push(Directive::Define {
            name: "EXTERNAL_INFO",
            value: file.clone(),
        }),
        None => {}
    }

    Ok(out)
}

// ============================================================================
// Emission
// ============================================================================

/// Files written by [`emit_scripts`], in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmittedScripts {
    pub files: Vec<String>,
    pub profile_count: usize,
    pub certificate_count: usize,
    pub deletion_count: usize,
}

/// Write all fragments into the workspace.
///
/// # Errors
///
/// - `Emission` if a fragment cannot be written
/// - validation errors from [`global_defines`]
pub fn emit_scripts(workspace: &InstallerWorkspace, inputs: &DefineInputs<'_>) -> Result<EmittedScripts> {
    // Build everything first so a validation error leaves no partial scripts
    let profiles = profile_directives(inputs.plan);
    let certificates = certificate_directives(inputs.manifest);
    let deletions = deletion_directives(inputs.plan);
    let defines = global_defines(inputs)?;

    let mut emitted = EmittedScripts {
        profile_count: profiles.len(),
        certificate_count: certificates.len(),
        deletion_count: deletions.len().saturating_sub(1),
        ..EmittedScripts::default()
    };

    workspace.write_script(PROFILES_SCRIPT, &render(&profiles))?;
    emitted.files.push(PROFILES_SCRIPT.to_string());

    workspace.write_script(CERTS_SCRIPT, &render(&certificates))?;
    emitted.files.push(CERTS_SCRIPT.to_string());

    if !deletions.is_empty() {
        workspace.append_script(PROFILES_SCRIPT, &render(&deletions))?;
        debug!("Appended {} deletions to {}", emitted.deletion_count, PROFILES_SCRIPT);
    }

    workspace.write_script(MAIN_DEFINES, &render(&defines))?;
    emitted.files.push(MAIN_DEFINES.to_string());

    info!(
        "Emitted scripts: {} profiles, {} certificates, {} deletions",
        emitted.profile_count, emitted.certificate_count, emitted.deletion_count
    );
    Ok(emitted)
}
