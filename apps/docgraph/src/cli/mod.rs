//! # docgraph CLI Module
//!
//! Command-line access to a docgraph store.
//!
//! ## Available Commands
//!
//! - `init` - Open (or create) the store and register the indexes
//! - `status` - Count vertices, edges and labels
//! - `add-vertex` / `add-edge` - Create elements
//! - `set-prop` / `unset-prop` - Edit properties
//! - `show` - Print a stored document
//! - `neighbors` / `edges` - Traverse from a vertex
//! - `remove-vertex` / `remove-edge` - Delete elements
//! - `list` - List vertices, edges or labels
//! - `find` - Look elements up by property value

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use docgraph_core::{Direction, GraphError, Settings, StoreBackend};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub use commands::*;

/// Store used when neither `--config` nor `--database` is given.
pub const DEFAULT_DATABASE: &str = "docgraph.redb";

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// docgraph - a property graph inside a document store
#[derive(Parser, Debug)]
#[command(name = "docgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML settings file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// redb database file; overrides the store section of the settings
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which element a property command targets.
#[derive(clap::Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct Target {
    /// Vertex id
    #[arg(long)]
    pub vertex: Option<String>,

    /// Edge id
    #[arg(long)]
    pub edge: Option<String>,
}

/// What `list` prints.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Vertices,
    Edges,
    Labels,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the store and register the indexes
    Init,

    /// Show graph status
    Status,

    /// Create a vertex
    AddVertex {
        /// Vertex id; generated from the counter when omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// Create a labeled edge between two existing vertices
    AddEdge {
        /// Source vertex id
        #[arg(long)]
        from: String,

        /// Target vertex id
        #[arg(long)]
        to: String,

        /// Edge label
        #[arg(short, long)]
        label: String,

        /// Explicit edge id; the structural id is used when omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// Set a property (the value is parsed as JSON, else taken as a string)
    SetProp {
        #[command(flatten)]
        target: Target,

        /// Property name
        #[arg(short, long)]
        key: String,

        /// Property value
        #[arg(long)]
        value: String,
    },

    /// Remove a property
    UnsetProp {
        #[command(flatten)]
        target: Target,

        /// Property name
        #[arg(short, long)]
        key: String,
    },

    /// Print the stored document of a vertex or edge
    Show {
        #[command(flatten)]
        target: Target,
    },

    /// Vertices adjacent to a vertex
    Neighbors {
        /// Vertex id
        #[arg(long)]
        vertex: String,

        /// out, in or both
        #[arg(short, long, default_value = "both")]
        direction: Direction,

        /// Restrict to these labels (repeatable); all labels when omitted
        #[arg(short, long)]
        label: Vec<String>,
    },

    /// Edges incident to a vertex
    Edges {
        /// Vertex id
        #[arg(long)]
        vertex: String,

        /// out, in or both
        #[arg(short, long, default_value = "both")]
        direction: Direction,

        /// Restrict to these labels (repeatable); all labels when omitted
        #[arg(short, long)]
        label: Vec<String>,
    },

    /// Remove a vertex and all its edges
    RemoveVertex {
        /// Vertex id
        id: String,
    },

    /// Remove an edge
    RemoveEdge {
        /// Edge id
        id: String,
    },

    /// List every vertex, edge or label
    List {
        #[arg(value_enum)]
        what: Listing,
    },

    /// Find elements whose property equals a value
    Find {
        /// Property name
        #[arg(short, long)]
        key: String,

        /// Property value (parsed as JSON, else taken as a string)
        #[arg(long)]
        value: String,

        /// Search edges instead of vertices
        #[arg(long)]
        edges: bool,
    },
}

// =============================================================================
// SETTINGS RESOLUTION
// =============================================================================

impl Cli {
    /// Settings from `--config`, with `--database` switching the store to
    /// that redb file.
    pub fn settings(&self) -> Result<Settings, GraphError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::redb(self.database_or_default()),
        };
        if let Some(path) = &self.database {
            settings.store.backend = StoreBackend::Redb;
            settings.store.path = Some(path.clone());
        }
        Ok(settings)
    }

    fn database_or_default(&self) -> &Path {
        self.database
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_DATABASE))
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments and return the command's report.
pub fn execute(cli: &Cli) -> Result<Value, GraphError> {
    let graph = open_graph(&cli.settings()?)?;

    let report = match &cli.command {
        Some(Commands::Init) => cmd_init(&graph),
        Some(Commands::Status) | None => cmd_status(&graph),
        Some(Commands::AddVertex { id }) => cmd_add_vertex(&graph, id.as_deref()),
        Some(Commands::AddEdge {
            from,
            to,
            label,
            id,
        }) => cmd_add_edge(&graph, from, to, label, id.as_deref()),
        Some(Commands::SetProp { target, key, value }) => {
            cmd_set_prop(&graph, target, key, parse_value(value))
        }
        Some(Commands::UnsetProp { target, key }) => cmd_unset_prop(&graph, target, key),
        Some(Commands::Show { target }) => cmd_show(&graph, target),
        Some(Commands::Neighbors {
            vertex,
            direction,
            label,
        }) => cmd_neighbors(&graph, vertex, *direction, label),
        Some(Commands::Edges {
            vertex,
            direction,
            label,
        }) => cmd_edges(&graph, vertex, *direction, label),
        Some(Commands::RemoveVertex { id }) => cmd_remove_vertex(&graph, id),
        Some(Commands::RemoveEdge { id }) => cmd_remove_edge(&graph, id),
        Some(Commands::List { what }) => cmd_list(&graph, *what),
        Some(Commands::Find { key, value, edges }) => {
            cmd_find(&graph, key, &parse_value(value), *edges)
        }
    };

    graph.shutdown();
    report
}

/// Command-line values are JSON when they parse as JSON, strings otherwise.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
