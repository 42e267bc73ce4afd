//! Picking and running the user's editor

use crate::error::{Result, SecretError};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Checked in order; the first one set to something non-blank wins
pub const EDITOR_ENV_VARS: [&str; 2] = ["KUBE_EDITOR", "EDITOR"];

/// Use KUBE_EDITOR if set, falling back to EDITOR, then `fallback`
pub fn which_editor(fallback: &str) -> String {
    which_editor_from(|name| std::env::var(name).ok(), fallback)
}

fn which_editor_from<F>(lookup: F, fallback: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    EDITOR_ENV_VARS
        .iter()
        .filter_map(|&name| lookup(name))
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

/// Run `editor` on `path` and wait for it to exit.
///
/// The editor string may carry its own arguments (`code --wait`); it is split
/// on whitespace and `path` is appended last. stdio is inherited. There is no
/// timeout.
pub fn run_editor(editor: &str, path: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts.next().ok_or_else(|| SecretError::Editor {
        editor: editor.to_string(),
        reason: "empty editor command".to_string(),
    })?;

    debug!(editor, path = %path.display(), "launching editor");

    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| SecretError::Editor {
            editor: editor.to_string(),
            reason: e.to_string(),
        })?;

    if !status.success() {
        return Err(SecretError::Editor {
            editor: editor.to_string(),
            reason: format!("editor exited with {}", status),
        });
    }
    Ok(())
}
