//! External assembler and linker invocation.
//!
//! The emitted file targets `nasm -f elf32` and `ld -m elf_i386` on
//! Unix-likes; on Windows the same pipeline runs through `nasm -f win32`
//! and `link`. Tool failures surface with their captured stderr.

use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Error type for assembler/linker failures.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Tool ran and exited non-zero
    #[error("{tool} failed: {stderr}")]
    ExternalTool { tool: String, stderr: String },

    /// Tool could not be spawned at all
    #[error("required tool '{tool}' not found: {source}")]
    NotFound {
        tool: String,
        source: std::io::Error,
    },
}

/// Result type alias for tool invocation.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Platform-specific tool command lines.
pub struct ToolConfig {
    pub nasm: Vec<String>,
    pub linker: Vec<String>,
    pub object_ext: &'static str,
    pub executable_ext: &'static str,
}

/// Tool configuration for the host platform.
pub fn host_tools() -> ToolConfig {
    if cfg!(target_os = "windows") {
        ToolConfig {
            nasm: vec!["nasm".into(), "-f".into(), "win32".into()],
            linker: vec![
                "link".into(),
                "/subsystem:console".into(),
                "/entry:_start".into(),
            ],
            object_ext: ".obj",
            executable_ext: ".exe",
        }
    } else {
        ToolConfig {
            nasm: vec!["nasm".into(), "-f".into(), "elf32".into()],
            linker: vec!["ld".into(), "-m".into(), "elf_i386".into()],
            object_ext: ".o",
            executable_ext: "",
        }
    }
}

/// Assemble `asm_path` into `object_path`.
pub fn assemble(config: &ToolConfig, asm_path: &Path, object_path: &Path) -> Result<()> {
    let mut command = Command::new(&config.nasm[0]);
    command.args(&config.nasm[1..]);
    command.arg("-o").arg(object_path).arg(asm_path);
    run(command, &config.nasm[0])
}

/// Link `object_path` into `executable_path`.
pub fn link(config: &ToolConfig, object_path: &Path, executable_path: &Path) -> Result<()> {
    let mut command = Command::new(&config.linker[0]);
    command.args(&config.linker[1..]);
    if cfg!(target_os = "windows") {
        command.arg(object_path);
        command.arg(format!("/out:{}", executable_path.display()));
    } else {
        command.arg("-o").arg(executable_path).arg(object_path);
    }
    run(command, &config.linker[0])
}

fn run(mut command: Command, tool: &str) -> Result<()> {
    let output = command.output().map_err(|source| ToolError::NotFound {
        tool: tool.to_string(),
        source,
    })?;
    if !output.status.success() {
        return Err(ToolError::ExternalTool {
            tool: tool.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}
