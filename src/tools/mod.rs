//! Typed invocations of the external packaging tools.
//!
//! Each submodule pairs a `ToolArgs` struct with the pipeline capability that
//! runs it:
//! - `makensis`: the packaging compiler (`PackageCompiler`)
//! - `sign`: an external code-signing command (`InstallerSigner`)

pub mod makensis;
pub mod sign;
