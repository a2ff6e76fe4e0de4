mod cli;
mod orchestrator;
mod scripted_llm;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, JobCommands};
use kandra_config::KandraConfig;
use kandra_core::{EventId, Job, JobId};
use orchestrator::Orchestrator;
use std::str::FromStr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => KandraConfig::load(path)?,
        None => KandraConfig::load_default()?,
    };
    let orchestrator = Orchestrator::new(config);

    match cli.command {
        Commands::Job { command } => run_job_command(&orchestrator, command).await?,
        Commands::Events { job_id, since } => print_events(&orchestrator, &job_id, since.as_deref()).await?,
        Commands::Watch { job_id } => watch(&orchestrator, &job_id).await?,
    }
    Ok(())
}

async fn run_job_command(orch: &Orchestrator, command: JobCommands) -> Result<()> {
    match command {
        JobCommands::Create { repo_url, repo_name, target_stack, clone } => {
            let job = orch.create_job(&repo_url, &repo_name, &target_stack, clone).await?;
            print_job(&job);
        }
        JobCommands::Plan { job_id } => {
            let job = orch.start_planning(parse_job_id(&job_id)?).await?;
            print_job(&job);
        }
        JobCommands::CompletePlan { job_id, plan_file } => {
            let job = orch.complete_planning(parse_job_id(&job_id)?, &plan_file).await?;
            print_job(&job);
        }
        JobCommands::Approve { job_id, trace_file } => {
            let id = parse_job_id(&job_id)?;
            orch.approve(id, &trace_file).await?;
            print_job(&orch.registry.get(id).await?);
        }
        JobCommands::Reject { job_id } => {
            let job = orch.reject(parse_job_id(&job_id)?).await?;
            print_job(&job);
        }
        JobCommands::Status { job_id } => {
            print_job(&orch.registry.get(parse_job_id(&job_id)?).await?);
        }
        JobCommands::List => {
            for job in orch.registry.list().await {
                print_job(&job);
            }
        }
    }
    Ok(())
}

fn parse_job_id(raw: &str) -> Result<JobId> {
    JobId::from_str(raw).with_context(|| format!("'{raw}' is not a valid job id"))
}

fn print_job(job: &Job) {
    println!("{}  {}  {} -> {}", job.id, job.status, job.repo_name, job.target_stack);
    if let Some(err) = &job.error {
        println!("  error: {err}");
    }
}

async fn print_events(orch: &Orchestrator, job_id: &str, since: Option<&str>) -> Result<()> {
    let job_id = parse_job_id(job_id)?;
    let since_id = since.map(EventId::from_str).transpose().context("invalid --since event id")?;
    for event in orch.log.list(job_id, since_id).await {
        println!(
            "{}",
            serde_json::json!({
                "id": event.id.to_string(),
                "kind": event.kind,
                "payload": event.payload,
                "created_at": event.created_at,
            })
        );
    }
    Ok(())
}

/// Replay then tail a job's stream to stdout, exactly as the Stream
/// Endpoint would serve a reconnecting dashboard client — minus the
/// socket transport, since HTTP plumbing is out of scope for this core.
async fn watch(orch: &Orchestrator, job_id: &str) -> Result<()> {
    let job_id = parse_job_id(job_id)?;
    let (out_tx, mut out_rx) = tokio::sync::mpsc::unbounded_channel();
    let (in_tx, in_rx) = tokio::sync::mpsc::unbounded_channel();
    let roster = Arc::new(kandra_stream::ConnectionRegistry::new());

    let session = tokio::spawn(kandra_stream::run_session(job_id, orch.log.clone(), orch.bus.clone(), roster, out_tx, in_rx));

    let printer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            println!("{}", serde_json::to_string(&msg).unwrap_or_default());
        }
    });

    tokio::signal::ctrl_c().await.ok();
    drop(in_tx);
    session.abort();
    printer.abort();
    Ok(())
}
