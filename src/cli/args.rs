//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Browse observation trees lazily and edit observation strategies with cascading steps
#[derive(Parser, Debug)]
#[command(name = "bbstree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output: -d info, -dd debug, -ddd trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Directory searched for .bbstree.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// View and edit strategy documents
    Strategy {
        #[command(subcommand)]
        command: StrategyCommands,
    },

    /// Browse a tree of the observation tree database dump
    Browse {
        /// Tree dump file (default: <data_dir>/otdb.toml)
        #[arg(long, value_hint = ValueHint::FilePath)]
        dump: Option<PathBuf>,
        /// Tree id
        #[arg(short, long)]
        tree_id: i64,
        /// Start node (default: top node of the tree)
        #[arg(short, long)]
        node_id: Option<i64>,
        /// Levels to expand (default: browse.max_expand_depth)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Browse an observation result directory
    Results {
        /// Result directory
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
        /// Levels to expand (default: browse.max_expand_depth)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum StrategyCommands {
    /// Show the step tree
    Show {
        /// Strategy document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Show only the subtree of the first step with this name
        #[arg(long)]
        from: Option<String>,
        /// Levels to expand (default: all)
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Insert a step under every step named PARENT
    Insert {
        /// Strategy document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Parent step name (default: append to the root steps)
        #[arg(short, long)]
        parent: Option<String>,
        /// Name of the new step
        #[arg(short, long)]
        name: String,
        /// Operation name of the new step
        #[arg(short, long)]
        operation: Option<String>,
        /// Attribute as KEY=VALUE (repeatable)
        #[arg(short, long = "attr", value_name = "KEY=VALUE")]
        attributes: Vec<String>,
    },

    /// Delete the child NAME at INDEX under every step named PARENT
    Delete {
        /// Strategy document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Parent step name (default: root steps)
        #[arg(short, long)]
        parent: Option<String>,
        /// Name expected at INDEX
        #[arg(short, long)]
        name: String,
        /// Position of the child
        #[arg(short, long)]
        index: usize,
    },

    /// Move the child NAME from one position to another under every step named PARENT
    Move {
        /// Strategy document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// Parent step name (default: root steps)
        #[arg(short, long)]
        parent: Option<String>,
        /// Name expected at FROM
        #[arg(short, long)]
        name: String,
        /// Current position
        #[arg(long)]
        from: usize,
        /// New position
        #[arg(long)]
        to: usize,
    },

    /// Report branches that drifted apart
    Check {
        /// Strategy document
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Show config paths
    Path,
}
