//! Type-safe external tool argument contracts.
//!
//! The compiler and the signer are opaque executables. Each invocation is a
//! struct implementing `ToolArgs`, so the exact command line lives in one
//! place and the runner never assembles raw string vectors.

use std::path::Path;

/// Typed arguments for one external tool invocation.
///
/// # Contract
///
/// - `to_cli_args()`: arguments exactly as the tool expects them.
/// - `get_env_vars()`: environment overrides for the child only.
/// - `program()`: the executable to start.
///
/// # Example
///
/// ```ignore
/// use eapgen::tools::makensis::MakensisArgs;
///
/// let args = MakensisArgs::new("/usr/bin/makensis", "cat.NSI");
/// let cli = args.to_cli_args(); // ["-INPUTCHARSET", "UTF8", "-V4", "cat.NSI"]
/// ```
pub trait ToolArgs {
    fn to_cli_args(&self) -> Vec<String>;

    fn get_env_vars(&self) -> Vec<(String, String)>;

    fn program(&self) -> &Path;

    /// Short name for logs.
    fn tool_name(&self) -> String {
        self.program()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program().display().to_string())
    }
}
