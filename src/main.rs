mod catalog;
mod commands;
mod config;
mod diagnostics;
mod error;
mod host;
mod pattern;
mod render;
mod resolver;
mod rewriter;
mod session;
mod types;
mod watch;
mod workspace;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::OutputFormat;
use crate::types::Guid;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "GUIDREF_LOG";

#[derive(Parser)]
#[command(name = "guidref", about = "Resolve and repoint GUID references in Unity assets and prefabs")]
struct Cli {
    /// Unity project root holding the `.meta` files
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a resource with every GUID reference resolved to a name
    Show {
        /// `.asset` or `.prefab` file to open
        file: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Resolve GUIDs to resource names (exits 1 if any is unresolved)
    Resolve {
        #[arg(required = true)]
        guids: Vec<Guid>,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List every resource in the project with its GUID
    Resources {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Point one reference to another resource
    #[command(group(clap::ArgGroup::new("target").required(true).args(["at", "matching"])))]
    Repoint {
        /// `.asset` or `.prefab` file to modify
        file: PathBuf,
        /// Byte offset of the reference, as printed by `show`
        #[arg(long)]
        at: Option<usize>,
        /// Verbatim reference text; the first copy in the file is rewritten
        #[arg(long = "match", requires = "to")]
        matching: Option<String>,
        /// New GUID; without it a resource is picked interactively
        #[arg(long)]
        to: Option<Guid>,
        /// GUID the reference must still hold
        #[arg(long)]
        expect: Option<Guid>,
    },
    /// Show a resource and re-render it on every change
    Watch {
        file: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let root = cli.root;

    let result = match cli.command {
        Commands::Show { file, format } => commands::show(&root, &file, format).map(|()| return ExitCode::SUCCESS),
        Commands::Resolve { guids, format } => commands::resolve(&root, &guids, format),
        Commands::Resources { format } => commands::resources(&root, format).map(|()| return ExitCode::SUCCESS),
        Commands::Repoint {
            file,
            at,
            matching,
            to,
            expect,
        } => {
            let target = match (at, matching, to) {
                (Some(at), _, to) => commands::Target::Offset { at, to },
                (None, Some(text), Some(to)) => commands::Target::Match { text, to },
                (None, _, _) => Cli::command()
                    .error(ErrorKind::MissingRequiredArgument, "repoint needs --at, or --match with --to")
                    .exit(),
            };
            commands::repoint(&root, &file, &target, expect.as_ref())
        },
        Commands::Watch { file, format } => watch::run(&root, &file, format),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(exit_code_for(&e))
        },
    };
}

/// Exit 2 when the user can fix the invocation or the file moved under them,
/// 3 for environment and runtime failures.
const fn exit_code_for(e: &error::Error) -> u8 {
    return match e {
        error::Error::GuidMismatch { .. }
        | error::Error::InvalidGuid { .. }
        | error::Error::NoReferenceAtOffset { .. }
        | error::Error::ReferenceNotFound { .. }
        | error::Error::RewriteInProgress { .. }
        | error::Error::UnsupportedResource { .. } => 2,
        _ => 3,
    };
}

/// Log to stderr, filtered by `GUIDREF_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
