//! Command-line host for the remember-me core.
//!
//! # Responsibility
//! - Expose context/resource/backup operations for local inspection.
//! - Render results as JSON on stdout and errors with their kind on stderr.

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::error;
use remember_core::config::{ENV_BACKUP_DIR, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
use remember_core::{
    init_logging, BackupError, BackupManager, ContextLoader, DbError, ErrorKind, RepoError,
    ResourceKind, ResourceService, ResourceStore, RestoreOptions, StoreConfig,
};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "remember-me", version, about = "Rules, snippets and summaries per context")]
struct CliArgs {
    /// SQLite database file (default: ~/.mcp/me/my.db)
    #[arg(long, env = ENV_DB_PATH)]
    db_path: Option<PathBuf>,

    /// Backup catalog directory (default: ~/.mcp/me/backups)
    #[arg(long, env = ENV_BACKUP_DIR)]
    backup_dir: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, env = ENV_LOG_LEVEL)]
    log_level: Option<String>,

    /// Absolute log directory (default: ~/.mcp/me/logs)
    #[arg(long, env = ENV_LOG_DIR)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merged view of "me" plus the given contexts
    Context {
        extra_contexts: Vec<String>,
        /// Render rules as `POLICY: text` lines only
        #[arg(long)]
        rule_lines: bool,
    },
    /// Known contexts
    Contexts,
    /// Get one resource
    Get(KeyArgs),
    /// List resources of one kind in a context
    List {
        kind: KindArg,
        #[arg(default_value = "me")]
        context: String,
        /// Omit content
        #[arg(long)]
        headers: bool,
    },
    /// Set a rule
    SetRule {
        context: String,
        key: String,
        /// MUST|MUST_NOT|SHOULD|SHOULD_NOT|MAY
        severity: String,
        text: String,
    },
    /// Set a snippet or summary
    Set {
        kind: ContentKindArg,
        context: String,
        key: String,
        content: String,
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Remove one resource
    Remove(KeyArgs),
    /// Backup catalog operations
    #[command(subcommand)]
    Backup(BackupCommand),
}

#[derive(Args, Debug)]
struct KeyArgs {
    kind: KindArg,
    context: String,
    key: String,
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
    Create {
        #[arg(long)]
        label: Option<String>,
    },
    List,
    Restore {
        id: String,
        /// Snapshot the current store before restoring
        #[arg(long)]
        backup_current: bool,
    },
    Remove {
        id: String,
    },
    Clear,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Rule,
    Snippet,
    Summary,
}

impl From<KindArg> for ResourceKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Rule => ResourceKind::Rule,
            KindArg::Snippet => ResourceKind::Snippet,
            KindArg::Summary => ResourceKind::Summary,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ContentKindArg {
    Snippet,
    Summary,
}

type CliResult<T> = Result<T, Box<dyn Error>>;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let config = resolve_config(&args);

    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }

    match run(args.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let kind = error_kind(err.as_ref()).map_or("internal", ErrorKind::as_str);
            error!("event=cli_command module=cli status=error error_kind={kind} error={err}");
            eprintln!("error ({kind}): {err}");
            ExitCode::FAILURE
        }
    }
}

fn resolve_config(args: &CliArgs) -> StoreConfig {
    let mut config = StoreConfig::from_env();
    if let Some(path) = &args.db_path {
        config.db_path = path.clone();
    }
    if let Some(dir) = &args.backup_dir {
        config.backup_dir = dir.clone();
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = dir.clone();
    }
    config
}

fn run(command: Command, config: &StoreConfig) -> CliResult<()> {
    let store = ResourceStore::open(&config.db_path)?;
    let service = ResourceService::new(&store);

    match command {
        Command::Context {
            extra_contexts,
            rule_lines,
        } => {
            let view = ContextLoader::new(&store).load(extra_contexts.as_slice())?;
            if rule_lines {
                print_json(&view.rule_lines())
            } else {
                print_json(&view)
            }
        }
        Command::Contexts => print_json(&store.contexts()?),
        Command::Get(KeyArgs { kind, context, key }) => {
            print_json(&service.get(kind.into(), &context, &key)?)
        }
        Command::List {
            kind,
            context,
            headers,
        } => {
            if headers {
                print_json(&service.list_headers(kind.into(), &context)?)
            } else {
                print_json(&service.list(kind.into(), &context)?)
            }
        }
        Command::SetRule {
            context,
            key,
            severity,
            text,
        } => print_json(&service.set_rule(&context, &key, &severity, &text)?),
        Command::Set {
            kind,
            context,
            key,
            content,
            mime_type,
        } => {
            let saved = match kind {
                ContentKindArg::Snippet => {
                    service.set_snippet(&context, &key, &content, mime_type.as_deref())?
                }
                ContentKindArg::Summary => {
                    service.set_summary(&context, &key, &content, mime_type.as_deref())?
                }
            };
            print_json(&saved)
        }
        Command::Remove(KeyArgs { kind, context, key }) => {
            print_json(&service.remove(kind.into(), &context, &key)?)
        }
        Command::Backup(command) => run_backup(command, &store, config),
    }
}

fn run_backup(command: BackupCommand, store: &ResourceStore, config: &StoreConfig) -> CliResult<()> {
    let manager = BackupManager::new(store, &config.backup_dir)?;
    match command {
        BackupCommand::Create { label } => print_json(&manager.create(label.as_deref())?),
        BackupCommand::List => print_json(&manager.list()?),
        BackupCommand::Restore { id, backup_current } => {
            print_json(&manager.restore_with(&id, RestoreOptions { backup_current })?)
        }
        BackupCommand::Remove { id } => print_json(&manager.remove(&id)?),
        BackupCommand::Clear => print_json(&manager.clear()?),
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn error_kind(err: &(dyn Error + 'static)) -> Option<ErrorKind> {
    err.downcast_ref::<RepoError>()
        .map(RepoError::kind)
        .or_else(|| err.downcast_ref::<BackupError>().map(BackupError::kind))
        .or_else(|| err.downcast_ref::<DbError>().map(DbError::kind))
}
