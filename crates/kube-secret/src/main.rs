//! kube-secret - Making kube secret files a bit more bearable
//!
//! Commands:
//! - encode <FILE>: base64-encode every value under `data`, in place
//! - decode <FILE>: decode every value under `data` to plaintext, in place
//! - edit <FILE>: decode to a temp file, open $KUBE_EDITOR/$EDITOR, re-encode
//! - view <FILE>: print the decoded manifest without touching the file
//!
//! `kube-secret foo.yaml` is shorthand for `kube-secret edit foo.yaml`.

use anyhow::Result;
use clap::{Parser, Subcommand};
use kube_secret::workflow::{self, EditOutcome};
use kube_secret::{editor, Config, Direction};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "kube-secret")]
#[command(about = "Making kube secret files a bit more bearable")]
#[command(version)]
#[command(after_help = r#"EXAMPLES:
    kube-secret view secret.yaml      Print decoded values, file untouched
    kube-secret decode secret.yaml    Decode values in place
    kube-secret encode secret.yaml    Encode values in place
    kube-secret edit secret.yaml      Edit decoded values, re-encode on save
    kube-secret secret.yaml           Same as `edit`

EDITOR:
    $KUBE_EDITOR, then $EDITOR, then `editor` from the config file (default: vi)

CONFIG:
    --config <path>, $KUBE_SECRET_CONFIG, or ~/.config/kube-secret/config.yaml"#)]
struct Cli {
    /// Enable debugging output
    #[arg(long, global = true)]
    debug: bool,

    /// Path to config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a kube secret file
    Encode {
        /// Secret manifest (.yml/.yaml)
        file: PathBuf,
    },

    /// Decode a kube secret file
    Decode {
        /// Secret manifest (.yml/.yaml)
        file: PathBuf,
    },

    /// Edit a kube secret file with its values decoded
    Edit {
        /// Secret manifest (.yml/.yaml)
        file: PathBuf,
    },

    /// Print a kube secret file with its values decoded
    View {
        /// Secret manifest (.yml/.yaml)
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse_from(with_implied_edit(std::env::args_os().collect()));

    init_logging(cli.debug);

    match cli.command {
        Commands::Encode { file } => cmd_munge(&file, Direction::Encode),
        Commands::Decode { file } => cmd_munge(&file, Direction::Decode),
        Commands::Edit { file } => cmd_edit(&file, cli.config.as_deref()),
        Commands::View { file } => cmd_view(&file),
    }
}

/// Logs go to stderr; `--debug` raises the default level, RUST_LOG wins
fn init_logging(debug: bool) {
    let default_filter = if debug { "kube_secret=debug,warn" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// For compatibility with `kubectl edit`-style usage: if the first argument
/// is a YAML file, run `edit` on it.
fn with_implied_edit(mut args: Vec<OsString>) -> Vec<OsString> {
    if args.len() > 1 && workflow::is_yaml_file(Path::new(&args[1])) {
        args.insert(1, OsString::from("edit"));
    }
    args
}

/// Encode or decode in place
fn cmd_munge(file: &Path, direction: Direction) -> Result<()> {
    workflow::read_munge_write(file, file, direction)?;
    eprintln!("All done!");
    Ok(())
}

fn cmd_edit(file: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;
    let editor = editor::which_editor(&config.editor);
    debug!(editor = %editor, "resolved editor");

    match workflow::edit(file, &editor, &config)? {
        EditOutcome::Saved => eprintln!("All done!"),
        EditOutcome::Unchanged => eprintln!("Edit cancelled, no changes made."),
    }
    Ok(())
}

fn cmd_view(file: &Path) -> Result<()> {
    let stdout = std::io::stdout();
    workflow::view(file, stdout.lock())
}
