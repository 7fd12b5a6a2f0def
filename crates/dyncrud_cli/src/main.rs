//! dyncrud CLI
//!
//! Command-line front end for the dyncrud entity engine.
//!
//! # Commands
//!
//! - `types` - List registered entity types
//! - `create` - Create an object from a JSON field map
//! - `get` - Load an object by id
//! - `list` - List objects of a type, optionally filtered
//! - `update` - Update an object from a JSON field map
//! - `delete` - Delete an object and its dependents
//! - `transaction` - Create a master and its sub-objects atomically

mod commands;
mod error;

use clap::{Parser, Subcommand};
use commands::Context;
use error::CliError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Dynamic entity CRUD over a local store.
#[derive(Parser)]
#[command(name = "dyncrud")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the store file (in-memory if omitted)
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Store every type as a schema-less document
    #[arg(global = true, short, long)]
    documents: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered entity types
    Types,

    /// Create an object
    Create {
        /// Object type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Field map as a JSON object
        #[arg(short, long)]
        fields: String,
    },

    /// Load an object by id
    Get {
        /// Object type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Object id
        #[arg(short, long)]
        id: i64,
    },

    /// List objects of a type
    List {
        /// Object type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Equality filter as KEY=VALUE (repeatable)
        #[arg(short, long = "filter")]
        filters: Vec<String>,
    },

    /// Update an object
    Update {
        /// Object type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Object id
        #[arg(short, long)]
        id: i64,

        /// Field map as a JSON object
        #[arg(short, long)]
        fields: String,
    },

    /// Delete an object and its dependents
    Delete {
        /// Object type name
        #[arg(short = 't', long = "type")]
        type_name: String,

        /// Object id
        #[arg(short, long)]
        id: i64,
    },

    /// Run a transaction request read from a JSON file
    Transaction {
        /// Request file (`-` for stdin)
        #[arg(short = 'F', long)]
        file: PathBuf,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = Context::open(cli.path.as_deref(), cli.documents)?;

    match cli.command {
        Commands::Types => commands::types::run(&ctx),
        Commands::Create { type_name, fields } => commands::create::run(&ctx, &type_name, &fields),
        Commands::Get { type_name, id } => commands::get::run(&ctx, &type_name, id),
        Commands::List { type_name, filters } => commands::list::run(&ctx, &type_name, &filters),
        Commands::Update {
            type_name,
            id,
            fields,
        } => commands::update::run(&ctx, &type_name, id, &fields),
        Commands::Delete { type_name, id } => commands::delete::run(&ctx, &type_name, id),
        Commands::Transaction { file } => commands::transaction::run(&ctx, &file),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error::report(&err);
            ExitCode::FAILURE
        }
    }
}
