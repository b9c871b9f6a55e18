//! Packaging state machine.
//!
//! Tracks a build from staged scripts to a named installer and enforces the
//! stage order. Compiling and signing go through the `PackageCompiler` and
//! `InstallerSigner` capabilities so tests can substitute fakes.
//!
//! # Stage Flow
//!
//! ```text
//! Staged
//!     ↓
//! Compiled
//!     ↓
//! Signed | Unsigned
//!     ↓
//! Done
//!
//! (Staged and Compiled can transition to Failed)
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{BuildWarning, GeneratorError, Result, SignError};
use crate::script_emitter::COMPILED_INSTALLER;
use crate::workspace::InstallerWorkspace;

/// Packaging stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PackagingStage {
    /// Scripts and assets are in the workspace
    Staged = 0,
    /// The compiler produced the unsigned installer
    Compiled = 1,
    /// The signer produced the final installer
    Signed = 2,
    /// The unsigned installer was renamed to the final name
    Unsigned = 3,
    /// Terminal: the final artifact exists
    Done = 4,
    /// Terminal: a fatal error stopped packaging
    Failed = 255,
}

impl PackagingStage {
    #[inline]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Stages reachable from this one.
    pub const fn successors(self) -> &'static [Self] {
        match self {
            Self::Staged => &[Self::Compiled],
            Self::Compiled => &[Self::Signed, Self::Unsigned],
            Self::Signed | Self::Unsigned => &[Self::Done],
            Self::Done | Self::Failed => &[],
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Staged => "Staged",
            Self::Compiled => "Compiled",
            Self::Signed => "Signed",
            Self::Unsigned => "Unsigned",
            Self::Done => "Done",
            Self::Failed => "Failed",
        }
    }
}

impl fmt::Display for PackagingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Errors that can occur during stage transitions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineTransitionError {
    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        from: PackagingStage,
        to: PackagingStage,
    },

    #[error("Cannot transition from terminal stage {from}")]
    FromTerminalStage { from: PackagingStage },

    #[error("Already at stage {stage}")]
    AlreadyAtStage { stage: PackagingStage },
}

/// Packaging progress for one build.
#[derive(Debug, Clone)]
pub struct PackagingContext {
    current: PackagingStage,
    failed_at: Option<PackagingStage>,
    history: Vec<PackagingStage>,
    artifact: Option<String>,
}

impl Default for PackagingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PackagingContext {
    pub fn new() -> Self {
        Self {
            current: PackagingStage::Staged,
            failed_at: None,
            history: vec![PackagingStage::Staged],
            artifact: None,
        }
    }

    #[inline]
    pub fn current_stage(&self) -> PackagingStage {
        self.current
    }

    #[inline]
    pub fn failed_at(&self) -> Option<PackagingStage> {
        self.failed_at
    }

    pub fn history(&self) -> &[PackagingStage] {
        &self.history
    }

    /// File name of the final artifact, once `Done`.
    pub fn artifact(&self) -> Option<&str> {
        self.artifact.as_deref()
    }

    /// Move to `target`, which must be a direct successor.
    ///
    /// # Errors
    ///
    /// - `FromTerminalStage` if already at Done or Failed
    /// - `AlreadyAtStage` if target is the current stage
    /// - `InvalidTransition` for anything that is not a direct successor
    pub fn transition_to(
        &mut self,
        target: PackagingStage,
    ) -> std::result::Result<PackagingStage, PipelineTransitionError> {
        if self.current.is_terminal() {
            return Err(PipelineTransitionError::FromTerminalStage { from: self.current });
        }
        if target == self.current {
            return Err(PipelineTransitionError::AlreadyAtStage { stage: target });
        }
        if target == PackagingStage::Done || !self.current.successors().contains(&target) {
            return Err(PipelineTransitionError::InvalidTransition {
                from: self.current,
                to: target,
            });
        }
        self.history.push(target);
        self.current = target;
        Ok(target)
    }

    /// Enter `Done` with the final artifact name.
    pub fn finish(
        &mut self,
        artifact: impl Into<String>,
    ) -> std::result::Result<(), PipelineTransitionError> {
        if !self.current.successors().contains(&PackagingStage::Done) {
            return Err(if self.current.is_terminal() {
                PipelineTransitionError::FromTerminalStage { from: self.current }
            } else {
                PipelineTransitionError::InvalidTransition {
                    from: self.current,
                    to: PackagingStage::Done,
                }
            });
        }
        self.artifact = Some(artifact.into());
        self.history.push(PackagingStage::Done);
        self.current = PackagingStage::Done;
        Ok(())
    }

    /// Mark packaging as failed, remembering where.
    pub fn fail(&mut self) -> std::result::Result<(), PipelineTransitionError> {
        if self.current.is_terminal() {
            return Err(PipelineTransitionError::FromTerminalStage { from: self.current });
        }
        self.failed_at = Some(self.current);
        self.history.push(PackagingStage::Failed);
        self.current = PackagingStage::Failed;
        Ok(())
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Turns the emitted scripts into `installer.exe` inside the workspace.
pub trait PackageCompiler {
    /// # Errors
    ///
    /// `Compile` with the captured log when the compiler fails.
    fn compile(&self, workspace: &InstallerWorkspace) -> Result<()>;
}

/// Signs `unsigned` into `signed`, both workspace-relative.
pub trait InstallerSigner {
    fn sign(
        &self,
        workspace: &InstallerWorkspace,
        unsigned: &str,
        signed: &str,
    ) -> std::result::Result<(), SignError>;
}

/// Result of a finished packaging run.
#[derive(Debug, Clone)]
pub struct PackagingOutcome {
    pub artifact: PathBuf,
    pub file_name: String,
    pub signed: bool,
    pub history: Vec<PackagingStage>,
    pub warnings: Vec<BuildWarning>,
}

/// Compile, then sign or rename, ending in `Done`.
///
/// # Errors
///
/// Compile failures and workspace errors. Signing failures are downgraded to
/// a `SigningFailed` warning.
pub fn package(
    workspace: &InstallerWorkspace,
    compiler: &dyn PackageCompiler,
    signer: Option<&dyn InstallerSigner>,
    file_name: &str,
) -> Result<PackagingOutcome> {
    let mut ctx = PackagingContext::new();
    match run_stages(&mut ctx, workspace, compiler, signer, file_name) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            // fail() only errors from a terminal stage, which run_stages never leaves us in on error
            let _ = ctx.fail();
            warn!("Packaging failed at {}: {}", ctx.failed_at().unwrap_or(ctx.current_stage()), e);
            Err(e)
        }
    }
}

fn run_stages(
    ctx: &mut PackagingContext,
    workspace: &InstallerWorkspace,
    compiler: &dyn PackageCompiler,
    signer: Option<&dyn InstallerSigner>,
    file_name: &str,
) -> Result<PackagingOutcome> {
    let mut warnings = Vec::new();

    if file_name.eq_ignore_ascii_case(COMPILED_INSTALLER) {
        return Err(GeneratorError::config(format!(
            "installer name {} collides with the compiler output",
            file_name
        )));
    }
    // The existence checks below must only ever see files written by this run
    for stale in [COMPILED_INSTALLER, file_name] {
        if workspace.remove_file(stale)? {
            debug!("Removed {} left over from an earlier build", stale);
        }
    }

    compiler.compile(workspace)?;
    if !workspace.exists(COMPILED_INSTALLER) {
        return Err(GeneratorError::Compile {
            code: 0,
            log: format!("compiler reported success but {} is missing", COMPILED_INSTALLER),
        });
    }
    ctx.transition_to(PackagingStage::Compiled)?;
    info!("Compiled {}", COMPILED_INSTALLER);

    let signed = match signer {
        Some(signer) => match sign_checked(signer, workspace, file_name) {
            Ok(()) => true,
            Err(e) => {
                warn!("Signing {} failed, shipping it unsigned: {}", file_name, e);
                warnings.push(BuildWarning::SigningFailed(e));
                false
            }
        },
        None => false,
    };

    if signed {
        ctx.transition_to(PackagingStage::Signed)?;
    } else {
        workspace.rename(COMPILED_INSTALLER, file_name)?;
        ctx.transition_to(PackagingStage::Unsigned)?;
    }

    ctx.finish(file_name)?;
    info!("Installer ready: {} ({})", file_name, if signed { "signed" } else { "unsigned" });

    Ok(PackagingOutcome {
        artifact: workspace.path(file_name)?,
        file_name: file_name.to_string(),
        signed,
        history: ctx.history().to_vec(),
        warnings,
    })
}

fn sign_checked(
    signer: &dyn InstallerSigner,
    workspace: &InstallerWorkspace,
    file_name: &str,
) -> std::result::Result<(), SignError> {
    signer.sign(workspace, COMPILED_INSTALLER, file_name)?;
    if !workspace.exists(file_name) {
        return Err(SignError::MissingOutput {
            path: PathBuf::from(file_name),
        });
    }
    Ok(())
}
