//! External code-signing command.
//!
//! The signer is called as `<program> <unsigned> <signed>` from inside the
//! workspace. Failures never abort a build; the pipeline ships the installer
//! unsigned instead.

use std::path::{Path, PathBuf};

use crate::error::SignError;
use crate::pipeline::InstallerSigner;
use crate::tool_args::ToolArgs;
use crate::tool_runner::run_tool;
use crate::workspace::InstallerWorkspace;

/// Type-safe arguments for the signing command.
#[derive(Debug, Clone)]
pub struct SignArgs {
    pub program: PathBuf,
    pub input: String,
    pub output: String,
}

impl ToolArgs for SignArgs {
    fn to_cli_args(&self) -> Vec<String> {
        vec![self.input.clone(), self.output.clone()]
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![]
    }

    fn program(&self) -> &Path {
        &self.program
    }
}

/// `InstallerSigner` that runs a configured command.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    program: PathBuf,
}

impl CommandSigner {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl InstallerSigner for CommandSigner {
    fn sign(
        &self,
        workspace: &InstallerWorkspace,
        unsigned: &str,
        signed: &str,
    ) -> Result<(), SignError> {
        let args = SignArgs {
            program: self.program.clone(),
            input: unsigned.to_string(),
            output: signed.to_string(),
        };
        let output = run_tool(&args, workspace.root()).map_err(|e| SignError::Spawn {
            program: self.program.display().to_string(),
            reason: format!("{:#}", e),
        })?;
        if !output.success {
            return Err(SignError::ToolFailed {
                code: output.code(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}
