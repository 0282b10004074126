//! Running external command-line tools (`magick`, `ebook-convert`).

use crate::error::Book2CbzError;
use std::ffi::OsString;
use std::process::{Command, Output};
use tracing::debug;

/// Run `program args...` to completion, capturing output.
///
/// A missing binary maps to [`Book2CbzError::ToolNotFound`] carrying
/// `install_hint`; a non-zero exit maps to [`Book2CbzError::ToolFailed`]
/// with the captured stderr.
pub fn run_tool(program: &str, args: &[OsString], install_hint: &str) -> Result<Output, Book2CbzError> {
    debug!("Running: {} {}", program, display_args(args));

    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Book2CbzError::ToolNotFound {
                tool: program.to_string(),
                hint: install_hint.to_string(),
            }
        } else {
            Book2CbzError::ToolFailed {
                tool: program.to_string(),
                status: "failed to start".to_string(),
                stderr: e.to_string(),
            }
        }
    })?;

    if !output.status.success() {
        return Err(Book2CbzError::ToolFailed {
            tool: program.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output)
}

/// Shell-ish rendering of an argument list for logs.
pub fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| {
            let s = a.to_string_lossy();
            if s.contains(' ') {
                format!("\"{s}\"")
            } else {
                s.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
