//! CLI command definitions using clap.
//!
//! Each `source`/`sink` call is one node evaluation; with the JSONL backend
//! the loop state carries over between separate invocations.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// iterloop - run a loop body once per combination of inputs
#[derive(Parser, Debug)]
#[command(name = "iterloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print every combination of the inputs, one JSON array per line
    Combos {
        /// JSON array of inputs; non-array items count as one-element sequences
        inputs: String,
    },

    /// Evaluate the loop source once
    Source {
        /// JSON array of inputs
        #[arg(short, long)]
        inputs: String,

        /// Control payload from a previous resubmission
        #[arg(long, default_value = "{}")]
        control: String,

        /// Identity recorded as the loop's origin
        #[arg(long)]
        origin: Option<String>,
    },

    /// Evaluate the loop sink once
    Sink {
        /// Loop body result as JSON
        #[arg(short, long)]
        result: String,

        /// Context emitted by the source
        #[arg(long)]
        context: String,

        /// This node's id in the host graph
        #[arg(long, default_value = "UNKNOWN")]
        node_id: String,
    },

    /// Drive a whole loop in-process, using each combination as its own result
    Run {
        /// JSON array of inputs
        #[arg(short, long)]
        inputs: String,
    },

    /// Inspect or clear stored loop sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

/// Session maintenance subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SessionCommands {
    /// List loops with stored state
    List,

    /// Release both sessions of one loop
    Clear {
        /// Loop ID to clear
        loop_id: String,
    },

    /// Release loops untouched for a while
    Purge {
        /// Minimum idle time in seconds
        #[arg(long, default_value_t = 3600)]
        older_than_secs: u64,
    },
}
