use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kandra", version, about = "Autonomous code-migration orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to kandra.toml; defaults to the platform config directory.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Job lifecycle commands.
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Print the event log for a job, optionally only events after a given id.
    Events {
        job_id: String,
        #[arg(long)]
        since: Option<String>,
    },
    /// Replay a job's history then tail its live events until interrupted.
    Watch { job_id: String },
}

#[derive(Subcommand)]
pub enum JobCommands {
    /// Register a new migration job and lay out its workspace.
    Create {
        #[arg(long)]
        repo_url: String,
        #[arg(long)]
        repo_name: String,
        #[arg(long)]
        target_stack: String,
        /// Actually `git clone` the source repository into the workspace.
        #[arg(long)]
        clone: bool,
    },
    /// Move a job from CREATED (or re-plan a FAILED one) into PLANNING.
    Plan { job_id: String },
    /// Supply the (externally produced) plan document and move the job
    /// into AWAITING_APPROVAL.
    CompletePlan {
        job_id: String,
        #[arg(long)]
        plan_file: PathBuf,
    },
    /// Approve the pending plan and run the Executor to completion or failure.
    Approve {
        job_id: String,
        /// A recorded ReAct trace (JSON: `{"actions": [...]}`) standing in
        /// for a live model; see `kandra-executor::llm` for the trait a
        /// real provider implements instead.
        #[arg(long)]
        trace_file: PathBuf,
    },
    /// Reject the pending plan, returning the job to CREATED.
    Reject { job_id: String },
    /// Show one job's current record.
    Status { job_id: String },
    /// List every job known to this process.
    List,
}
