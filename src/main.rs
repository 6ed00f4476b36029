//! conductor - CLI entry point.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Confirm, Select};
use octocrab::Octocrab;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use conductor::files::LocalFileStore;
use conductor::git::SystemGit;
use conductor::github::{GitHubPlatform, TokioSleeper, get_github_token};
use conductor::ship::deprecation::file_hyperlink;
use conductor::ship::preflight::{check_git_installed, resolve_repository};
use conductor::{ReleaseConfig, ReleaseError, ReleaseKind, ReleaseOrchestrator, ReleasePlan, WorkspaceHandle};

/// Cut a release: bump, branch, gate on CI, merge, publish and back-merge.
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(about = "Drive a library release from version bump to back-merge")]
#[command(version)]
struct Cli {
    /// Release kind: minor (1) or patch (2). Prompts when omitted.
    #[arg(long)]
    kind: Option<ReleaseKind>,

    /// Config file (defaults to conductor.toml in the workspace, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after the deprecation check, before pushing anything
    #[arg(long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Checkout to release from
    #[arg(long, default_value = ".")]
    workspace: PathBuf,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "conductor=debug" } else { "conductor=info" };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| default.into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn choose_release_kind() -> Result<ReleaseKind> {
    let kinds = [ReleaseKind::Minor, ReleaseKind::Patch];
    let labels: Vec<&str> = kinds.iter().map(|k| k.description()).collect();

    let index = Select::new()
        .with_prompt("Choose release option")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(|_| ReleaseError::Cancelled)?;

    Ok(kinds[index])
}

fn print_plan(plan: &ReleasePlan, config: &ReleaseConfig, dry_run: bool) {
    println!("Summary:");
    println!("  Release:   {}", plan.kind.description());
    println!("  Version:   {} -> {}", plan.old_version, plan.new_version);
    println!("  Branch:    {}", plan.branch);
    println!(
        "  PR:        {} into {}",
        plan.pull_request_title(),
        config.branches.stable
    );
    println!("  Tag:       {}", plan.tag);
    if let Some(docs) = &config.docs.repository {
        println!("  Docs:      {}", docs);
    }
    if dry_run {
        println!("  Mode:      dry run (stops before push)");
    }
    println!();
}

fn report_deprecations(version: &str, files: &[PathBuf]) {
    eprintln!();
    eprintln!("Files with @Deprecated annotations scheduled for {}:", version);
    for file in files {
        eprintln!("  {}", file_hyperlink(file));
    }
    eprintln!();
    eprintln!("Remove the deprecated declarations in the files above, commit, and run again.");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    check_git_installed().context("git is required")?;

    let root = cli
        .workspace
        .canonicalize()
        .with_context(|| format!("Workspace {} does not exist", cli.workspace.display()))?;
    let ws = WorkspaceHandle::new(root);

    let config = ReleaseConfig::load(ws.root(), cli.config.as_deref())
        .context("Failed to load configuration")?;

    let kind = match cli.kind {
        Some(kind) => kind,
        None => choose_release_kind()?,
    };

    let repository = resolve_repository(&ws, &config.branches.remote, config.repository.as_ref())
        .context("Could not determine the GitHub repository")?;

    let (hosting, docs_hosting) = match get_github_token() {
        Ok(token) => {
            let hosting = GitHubPlatform::new(&token, repository)?;
            let docs = config
                .docs
                .repository
                .clone()
                .map(|docs| GitHubPlatform::new(&token, docs))
                .transpose()?;
            (hosting, docs)
        }
        // A dry run never reaches GitHub
        Err(_) if cli.dry_run => (GitHubPlatform::with_client(Octocrab::default(), repository), None),
        Err(e) => return Err(e).context("GitHub access is required"),
    };

    let vcs = SystemGit;
    let files = LocalFileStore;
    let sleeper = TokioSleeper;

    let mut orchestrator =
        ReleaseOrchestrator::new(ws, &config, &vcs, &hosting, &files, &sleeper).dry_run(cli.dry_run);
    if let Some(docs) = docs_hosting.as_ref() {
        orchestrator = orchestrator.with_docs_hosting(docs);
    }

    let plan = orchestrator.plan(kind).context("Failed to compute versions")?;
    print_plan(&plan, &config, cli.dry_run);

    if !cli.yes && !cli.dry_run {
        let confirmed = Confirm::new()
            .with_prompt("Proceed?")
            .default(true)
            .interact()
            .map_err(|_| ReleaseError::Cancelled)?;

        if !confirmed {
            return Err(ReleaseError::Cancelled.into());
        }
    }

    let report = match orchestrator.execute(&plan).await {
        Ok(report) => report,
        Err(ReleaseError::DeprecationPresent { version, files }) => {
            report_deprecations(&version, &files);
            return Err(ReleaseError::DeprecationPresent { version, files }.into());
        }
        Err(e) => {
            eprintln!("  [FAIL] {}", e);
            return Err(e).context("Release aborted");
        }
    };

    println!();
    if report.dry_run {
        println!("Dry run complete. Nothing was pushed.");
    } else {
        println!("Release {} shipped!", report.tag.as_deref().unwrap_or("(unpublished)"));
    }

    Ok(())
}
