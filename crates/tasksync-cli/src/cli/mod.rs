pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tasksync_core::{Priority, SortKey, TaskFilter};

#[derive(Parser)]
#[clap(name = "tasksync", about = "Offline-first task tracker")]
#[clap(version, author)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[clap(long, global = true)]
    pub json: bool,

    /// Do not contact the remote store for this invocation
    #[clap(long, global = true)]
    pub offline: bool,

    /// Path to the config file (defaults to $TASKSYNC_CONFIG or the platform config dir)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging on stderr
    #[clap(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a task
    #[clap(name = "add")]
    Add {
        /// Title of the task
        title: String,
        #[clap(short, long)]
        description: Option<String>,
        /// low, medium or high
        #[clap(short, long)]
        priority: Option<Priority>,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[clap(long)]
        due: Option<String>,
    },

    /// List tasks of the signed-in user
    #[clap(name = "ls")]
    List {
        /// all, pending or completed
        #[clap(short, long, default_value = "all")]
        filter: TaskFilter,
        /// created, due, priority or updated
        #[clap(short, long, default_value = "created")]
        sort: SortKey,
    },

    /// Change fields of a task
    #[clap(name = "edit")]
    Edit {
        /// Task id or unique id prefix
        id: String,
        #[clap(short, long)]
        title: Option<String>,
        #[clap(short, long)]
        description: Option<String>,
        #[clap(short, long)]
        priority: Option<Priority>,
        /// New due date (YYYY-MM-DD or RFC 3339)
        #[clap(long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[clap(long)]
        clear_due: bool,
    },

    /// Toggle the completed flag of a task
    #[clap(name = "done")]
    Done {
        /// Task id or unique id prefix
        id: String,
    },

    /// Delete a task
    #[clap(name = "rm")]
    Rm {
        /// Task id or unique id prefix
        id: String,
    },

    /// Push every pending task to the remote store now
    #[clap(name = "sync")]
    Sync,

    /// Show sign-in, connectivity and pending-sync state
    #[clap(name = "status")]
    Status,

    /// Remember the user id to act as
    #[clap(name = "login")]
    Login {
        user_id: String,
    },

    /// Forget the signed-in user
    #[clap(name = "logout")]
    Logout,
}
