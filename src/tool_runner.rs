//! External tool execution.
//!
//! `run_tool` is the only place that spawns a process. Calls block until the
//! tool exits; timeouts are the caller's business.

use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::tool_args::ToolArgs;

/// Run a tool with `cwd` as its working directory, capturing its output.
///
/// Returns `Err` only if the tool could not be started or waited on; a
/// non-zero exit is reported through `ToolOutput::success`.
pub fn run_tool<T: ToolArgs>(args: &T, cwd: &Path) -> Result<ToolOutput> {
    let program = args.program();
    let cli_args = args.to_cli_args();
    let env_vars = args.get_env_vars();

    info!(
        "run_tool: {} args={:?} env={:?} cwd={}",
        program.display(),
        cli_args,
        env_vars,
        cwd.display()
    );

    let mut cmd = Command::new(program);
    cmd.args(&cli_args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (key, value) in &env_vars {
        cmd.env(key, value);
    }

    let output = cmd
        .output()
        .with_context(|| format!("Failed to run {}", program.display()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code();
    let success = output.status.success();

    if success {
        info!("{} finished successfully", args.tool_name());
    } else {
        info!("{} failed with exit code {}", args.tool_name(), exit_code.unwrap_or(-1));
    }
    debug!("{} stderr: {}", args.tool_name(), stderr.trim());

    Ok(ToolOutput {
        stdout,
        stderr,
        exit_code,
        success,
    })
}

/// Output from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code (None if terminated by signal).
    pub exit_code: Option<i32>,
    pub success: bool,
}

impl ToolOutput {
    /// Exit code, with -1 standing in for "killed by a signal".
    pub fn code(&self) -> i32 {
        self.exit_code.unwrap_or(-1)
    }

    /// stdout followed by stderr, the way a shell redirect `> log 2>&1` would
    /// collect them.
    pub fn combined_log(&self) -> String {
        let mut log = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !log.is_empty() && !log.ends_with('\n') {
                log.push('\n');
            }
            log.push_str(&self.stderr);
        }
        log
    }
}
