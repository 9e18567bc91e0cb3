use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

/// Inspect and edit freedesktop.org desktop entry files.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the recognized keys of an entry with their typed values.
    Show { file: PathBuf },
    /// Print the raw value of one key.
    Get {
        file: PathBuf,
        key: String,
        #[arg(long, default_value = dee_model::DESKTOP_ENTRY_GROUP)]
        group: String,
        /// Resolve a localized value, e.g. `de_DE.UTF-8`. Defaults to $LC_ALL, $LC_MESSAGES or $LANG.
        #[arg(long)]
        locale: Option<String>,
    },
    /// Set a key and save the entry.
    Set {
        file: PathBuf,
        key: String,
        value: String,
        #[arg(long, default_value = dee_model::DESKTOP_ENTRY_GROUP)]
        group: String,
        /// Save to this path instead of overwriting FILE.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Remove a key and save the entry.
    Unset {
        file: PathBuf,
        key: String,
        #[arg(long, default_value = dee_model::DESKTOP_ENTRY_GROUP)]
        group: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Create a new desktop entry file.
    New {
        path: PathBuf,
        #[arg(long, default_value = "Untitled")]
        name: String,
        #[arg(long = "type", default_value = "Application")]
        entry_type: String,
        #[arg(long)]
        exec: Option<String>,
        /// Resolve PATH relative to the first writable applications directory.
        #[arg(long)]
        in_default_dir: bool,
        /// Replace an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Check entries against the Desktop Entry Specification.
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print an entry as it would be saved, optionally with edits applied.
    Preview {
        file: PathBuf,
        /// KEY=VALUE edits applied to `[Desktop Entry]` before rendering.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        edits: Vec<String>,
    },
    /// List the keys defined by the Desktop Entry Specification.
    Keys,
    /// List installed launchers.
    List {
        /// Include read-only launchers regardless of settings.
        #[arg(long)]
        all: bool,
    },
    /// Report how an entry's icon resolves.
    Icon {
        file: PathBuf,
        #[arg(long, default_value_t = 48)]
        size: u32,
    },
}

fn init_tracing() {
    // Default to info unless the user sets RUST_LOG.
    let env = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    match args.command {
        Command::Show { file } => commands::show(&file),
        Command::Get {
            file,
            key,
            group,
            locale,
        } => commands::get(&file, &group, &key, locale.as_deref()),
        Command::Set {
            file,
            key,
            value,
            group,
            output,
        } => commands::set(&file, &group, &key, &value, output.as_deref()),
        Command::Unset {
            file,
            key,
            group,
            output,
        } => commands::unset(&file, &group, &key, output.as_deref()),
        Command::New {
            path,
            name,
            entry_type,
            exec,
            in_default_dir,
            force,
        } => commands::new(commands::NewEntry {
            path,
            name,
            entry_type,
            exec,
            in_default_dir,
            force,
        }),
        Command::Validate { files } => commands::validate(&files),
        Command::Preview { file, edits } => commands::preview(&file, &edits),
        Command::Keys => commands::keys(),
        Command::List { all } => commands::list(all),
        Command::Icon { file, size } => commands::icon(&file, size),
    }
}
