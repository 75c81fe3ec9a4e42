//! The typesetting seam: markdown goes in, rendered HTML comes out.
//!
//! All document-to-document conversion is delegated to pandoc. The core only
//! supplies source text, a template path, and an ordered list of `-V`
//! variables; everything about markdown dialects, LaTeX equations, and
//! template syntax is pandoc's business. [`Render`] is a trait so the
//! pipeline can be driven with a fake renderer in tests.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} exited with {status}")]
    CommandFailed {
        command: String,
        status: std::process::ExitStatus,
        stdout: String,
        stderr: String,
    },
}

/// A document-to-document transform: source text plus a template and
/// variables in, rendered bytes out. Failure is fatal for that document;
/// the caller never retries.
pub trait Render {
    fn render(
        &self,
        source: &str,
        is_markdown: bool,
        template: &Path,
        variables: &[(String, Option<String>)],
    ) -> Result<Vec<u8>, RenderError>;
}

/// Expand document variables into pandoc `-V` arguments, preserving order.
/// A variable without a value becomes a bare flag (`-V haslinks`).
pub fn pandoc_variable_args(variables: &[(String, Option<String>)]) -> Vec<String> {
    let mut args = Vec::new();
    for (key, value) in variables {
        args.push("-V".to_string());
        match value {
            Some(value) => args.push(format!("{key}={value}")),
            None => args.push(key.clone()),
        }
    }
    args
}

/// Renders by shelling out to `pandoc`, source on stdin, HTML on stdout.
#[derive(Debug, Default)]
pub struct PandocRenderer;

impl Render for PandocRenderer {
    fn render(
        &self,
        source: &str,
        is_markdown: bool,
        template: &Path,
        variables: &[(String, Option<String>)],
    ) -> Result<Vec<u8>, RenderError> {
        if !is_markdown {
            return Ok(source.as_bytes().to_vec());
        }

        let mut command = Command::new("pandoc");
        command
            .arg("--standalone")
            .arg("--template")
            .arg(template)
            .args(["--from", "markdown", "--to", "html"])
            .args(pandoc_variable_args(variables))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let command_line = format!("pandoc --template {}", template.display());

        let mut child = command.spawn().map_err(|source| RenderError::Spawn {
            command: command_line.clone(),
            source,
        })?;
        // stdin was piped above, so take() cannot fail
        child
            .stdin
            .take()
            .expect("piped stdin")
            .write_all(source.as_bytes())
            .map_err(|source| RenderError::Spawn {
                command: command_line.clone(),
                source,
            })?;
        let output = child
            .wait_with_output()
            .map_err(|source| RenderError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout).to_string();
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            eprintln!("Error in {command_line}");
            eprintln!("***stdout:\n{stdout}");
            eprintln!("***stderr:\n{stderr}");
            return Err(RenderError::CommandFailed {
                command: command_line,
                status: output.status,
                stdout,
                stderr,
            });
        }

        Ok(output.stdout)
    }
}
