//! Packaging compiler invocation.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GeneratorError, Result};
use crate::pipeline::PackageCompiler;
use crate::staging::MAIN_SCRIPT;
use crate::tool_args::ToolArgs;
use crate::tool_runner::run_tool;
use crate::workspace::InstallerWorkspace;

/// Compiler log written next to the scripts.
pub const COMPILE_LOG: &str = "nsis.log";

// ============================================================================
// Arguments
// ============================================================================

/// Type-safe arguments for the packaging compiler.
#[derive(Debug, Clone)]
pub struct MakensisArgs {
    pub program: PathBuf,
    /// Script to compile, relative to the workspace.
    pub script: String,
    /// Declare the scripts as UTF-8 input.
    pub utf8_input: bool,
}

impl MakensisArgs {
    pub fn new(program: impl Into<PathBuf>, script: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            script: script.into(),
            utf8_input: true,
        }
    }
}

impl ToolArgs for MakensisArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.utf8_input {
            args.push("-INPUTCHARSET".to_string());
            args.push("UTF8".to_string());
        }
        args.push("-V4".to_string());
        args.push(self.script.clone());
        args
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        // Compiler messages must not depend on the host locale
        vec![("LC_ALL".to_string(), "en_US.UTF-8".to_string())]
    }

    fn program(&self) -> &Path {
        &self.program
    }
}

// ============================================================================
// Compiler
// ============================================================================

/// `PackageCompiler` backed by a makensis executable.
#[derive(Debug, Clone)]
pub struct MakensisCompiler {
    program: PathBuf,
    nsis_major_version: u8,
}

impl MakensisCompiler {
    pub fn new(program: impl Into<PathBuf>, nsis_major_version: u8) -> Self {
        Self {
            program: program.into(),
            nsis_major_version,
        }
    }

    pub fn args(&self) -> MakensisArgs {
        MakensisArgs {
            utf8_input: self.nsis_major_version >= 3,
            ..MakensisArgs::new(&self.program, MAIN_SCRIPT)
        }
    }
}

impl PackageCompiler for MakensisCompiler {
    fn compile(&self, workspace: &InstallerWorkspace) -> Result<()> {
        let args = self.args();
        let output = run_tool(&args, workspace.root()).map_err(|e| GeneratorError::Compile {
            code: -1,
            log: format!("{:#}", e),
        })?;

        let log = output.combined_log();
        workspace.write_staged(COMPILE_LOG, log.as_bytes())?;
        debug!("Compiler log written to {}", COMPILE_LOG);

        if !output.success {
            return Err(GeneratorError::Compile {
                code: output.code(),
                log,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_makensis_args() {
        let args = MakensisArgs::new("/usr/bin/makensis", "cat.NSI");
        assert_eq!(args.to_cli_args(), vec!["-INPUTCHARSET", "UTF8", "-V4", "cat.NSI"]);
        assert_eq!(
            args.get_env_vars(),
            vec![("LC_ALL".to_string(), "en_US.UTF-8".to_string())]
        );
        assert_eq!(args.tool_name(), "makensis");
    }

    #[test]
    fn test_compiler_args_follow_version() {
        let compiler = MakensisCompiler::new("/usr/bin/makensis", 3);
        assert!(compiler.args().utf8_input);
        assert_eq!(compiler.args().script, MAIN_SCRIPT);
        let old = MakensisCompiler::new("/usr/bin/makensis", 2);
        assert_eq!(old.args().to_cli_args(), vec!["-V4", MAIN_SCRIPT]);
    }

    #[test]
    fn test_failing_compiler_surfaces_log() {
        let dir = tempfile::tempdir().unwrap();
        let ws = InstallerWorkspace::create(dir.path()).unwrap();
        // `false` ignores its arguments and exits 1
        let compiler = MakensisCompiler::new("false", 3);
        let err = compiler.compile(&ws).unwrap_err();
        assert!(matches!(err, GeneratorError::Compile { code: 1, .. }));
        assert!(ws.exists(COMPILE_LOG));
    }

    #[test]
    fn test_missing_compiler() {
        let dir = tempfile::tempdir().unwrap();
        let ws = InstallerWorkspace::create(dir.path()).unwrap();
        let compiler = MakensisCompiler::new("/nonexistent/makensis", 3);
        assert!(matches!(
            compiler.compile(&ws),
            Err(GeneratorError::Compile { code: -1, .. })
        ));
    }
}
