//! File-level operations behind the CLI commands
//!
//! Reading and writing the same file is safe: the input is read fully and
//! closed before the output is opened for truncating write.

use crate::config::Config;
use crate::editor;
use crate::error::SecretError;
use crate::munger::Direction;
use crate::store::DocumentStore;
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

/// Result of an `edit` session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditOutcome {
    /// Edited values were re-encoded and written back
    Saved,
    /// The editor left the file as it was; nothing written
    Unchanged,
}

const YAML_EXTENSIONS: [&str; 2] = ["yml", "yaml"];
const TEMP_PREFIX: &str = "ksed";
const TEMP_SUFFIX: &str = ".yml";

/// Crude check for "this argument is a YAML file"; used for the
/// `kube-secret foo.yaml` shorthand.
pub fn is_yaml_file(path: &Path) -> bool {
    let has_yaml_ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| YAML_EXTENSIONS.contains(&ext))
        .unwrap_or(false);

    has_yaml_ext && path.is_file()
}

/// Open and load a Secret manifest
pub fn read_secret_file(path: &Path) -> Result<DocumentStore> {
    let bytes = fs::read(path)
        .map_err(|e| SecretError::io(path, e))
        .with_context(|| format!("Error opening {:?} for reading", path))?;

    let mut store = DocumentStore::new();
    store
        .load(&bytes)
        .with_context(|| format!("Error reading secrets from {:?}", path))?;

    debug!(path = %path.display(), "read secret file");
    Ok(store)
}

/// Overwrite an existing file with the store's contents
pub fn write_secret_file(path: &Path, store: &DocumentStore) -> Result<()> {
    // Render before truncating so a failure leaves the file as it was
    let bytes = store
        .serialize()
        .with_context(|| format!("Error writing secrets to {:?}", path))?;

    let mut file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(path)
        .map_err(|e| SecretError::io(path, e))
        .with_context(|| format!("Error opening {:?} for writing", path))?;

    file.write_all(&bytes)
        .and_then(|()| file.flush())
        .map_err(|e| SecretError::io(path, e))
        .with_context(|| format!("Error writing secrets to {:?}", path))?;

    debug!(path = %path.display(), "wrote secret file");
    Ok(())
}

/// Read `input`, munge it, write the result to `output`.
///
/// `input` and `output` may be the same file. Returns the number of values
/// rewritten.
pub fn read_munge_write(input: &Path, output: &Path, direction: Direction) -> Result<usize> {
    let mut store = read_secret_file(input)?;

    let count = store
        .transform(direction)
        .with_context(|| format!("Error {} secrets from {:?}", direction.gerund(), input))?;

    write_secret_file(output, &store)?;
    info!(count, direction = direction.as_str(), path = %output.display(), "secrets rewritten");
    Ok(count)
}

/// Decode `path` and write the plaintext manifest to `out`. Never touches disk.
pub fn view<W: Write>(path: &Path, out: W) -> Result<()> {
    let mut store = read_secret_file(path)?;

    store
        .decode_secrets()
        .with_context(|| format!("Error decoding secrets from {:?}", path))?;

    store
        .write_to(out)
        .context("Error writing decoded file to STDOUT")?;
    Ok(())
}

/// Decode `path` into a temp file, open `editor` on it, then re-encode the
/// edited temp file back into `path`.
///
/// The temp file is removed when this returns, unless the edit could not be
/// saved and `config.keep_failed_edits` is set; then it is kept and its path
/// is part of the error.
pub fn edit(path: &Path, editor: &str, config: &Config) -> Result<EditOutcome> {
    let mut store = read_secret_file(path)?;
    store
        .decode_secrets()
        .with_context(|| format!("Error decoding secrets from {:?}", path))?;
    let decoded = store.serialize()?;
    drop(store);

    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX).suffix(TEMP_SUFFIX);
    let temp = match &config.temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .context("Error creating temp file")?;
    let temp_path = temp.path().to_path_buf();

    fs::write(&temp_path, &decoded)
        .map_err(|e| SecretError::io(&temp_path, e))
        .context("Error writing decoded secrets to temp file")?;
    debug!(path = %temp_path.display(), "decoded secrets to temp file");

    let saved = editor::run_editor(editor, &temp_path)
        .map_err(anyhow::Error::from)
        .and_then(|()| save_edit(path, &temp_path, &decoded));

    match saved {
        Ok(outcome) => Ok(outcome),
        Err(err) if config.keep_failed_edits => match temp.keep() {
            Ok((_, kept)) => {
                warn!(path = %kept.display(), "edit failed, keeping temp file");
                Err(err.context(format!("Your edits were kept in {:?}", kept)))
            }
            Err(keep_err) => {
                warn!(error = %keep_err, "could not keep temp file");
                Err(err)
            }
        },
        Err(err) => Err(err),
    }
}

fn save_edit(path: &Path, temp_path: &Path, decoded: &[u8]) -> Result<EditOutcome> {
    let edited = fs::read(temp_path)
        .map_err(|e| SecretError::io(temp_path, e))
        .context("Error reading edited temp file")?;

    if edited == decoded {
        info!(path = %path.display(), "no changes made");
        return Ok(EditOutcome::Unchanged);
    }

    let mut store = DocumentStore::new();
    store
        .load(&edited)
        .context("Error reading edited secrets")?;
    store
        .encode_secrets()
        .context("Error encoding edited secrets")?;

    write_secret_file(path, &store)?;
    Ok(EditOutcome::Saved)
}
