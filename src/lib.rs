//! eapgen Library
//!
//! Builds Windows Wi-Fi/EAP onboarding installers: picks the EAP method,
//! composes the EAP configuration and WLAN profiles, stages certificates and
//! assets, writes the packaging scripts and drives the packaging compiler and
//! signer.

pub mod attributes;
pub mod branding;
pub mod certificate;
pub mod cli;
pub mod config_file;
pub mod engine;
pub mod error;
pub mod generator;
pub mod locale;
pub mod pipeline;
pub mod request;
pub mod script_emitter;
pub mod staging;
pub mod tool_args;
pub mod tool_runner;
pub mod tools;
pub mod types;
pub mod workspace;

// Re-export main types for convenience
pub use attributes::{AttributeValue, ProfileAttributes};
pub use branding::{Dimensions, LogoCompositor, LogoPlacement, plan_logo_layout};
pub use certificate::CertificateAuthority;
pub use config_file::GeneratorConfig;
pub use engine::eap_config::{ComposedEapConfig, EapConfigInputs, Representation};
pub use engine::profiles::{NetworkProfileSpec, ProfilePlan};
pub use engine::selector::{EapSelection, select_method};
pub use error::{BuildWarning, ErrorClass, GeneratorError, SignError};
pub use generator::{BuildContext, BuildOutcome, BuildPlan, BuildRequest, PreparedBuild};
pub use locale::{Locale, PassthroughTranslator, Translator};
pub use pipeline::{
    InstallerSigner, PackageCompiler, PackagingContext, PackagingStage, PipelineTransitionError,
};
pub use request::{RequestFile, load_request};
pub use staging::{AssetSource, StagingManifest};
pub use tool_args::ToolArgs;
pub use tool_runner::{ToolOutput, run_tool};
pub use tools::makensis::MakensisCompiler;
pub use tools::sign::CommandSigner;
pub use types::Platform;
pub use workspace::InstallerWorkspace;
