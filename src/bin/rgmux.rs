use anyhow::{Context, Result};
use clap::Parser;
use rgmux::sample::{self, OnFailure, SamplePlan};
use rgmux::{factory, report, BackendType, Config, Tags};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "rgmux")]
#[command(about = "Create, tag, list, export and delete a resource group and a generic resource")]
#[command(version)]
struct Cli {
    /// Backend to run against (mock, azurerm)
    #[arg(short, long, env = "RGMUX_BACKEND", default_value = "azurerm")]
    backend: BackendType,

    /// Resource group to create
    #[arg(short, long, default_value = sample::DEFAULT_GROUP)]
    group: String,

    /// Region of the group and the resource
    #[arg(short, long, default_value = sample::DEFAULT_LOCATION)]
    location: String,

    /// Tag to apply, as key=value (repeatable; replaces the default tags)
    #[arg(short, long = "tag", value_parser = parse_tag)]
    tags: Vec<(String, String)>,

    /// Directory receiving <group>-template.json
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Fail listings that need more than this many pages
    #[arg(long)]
    max_pages: Option<NonZeroUsize>,

    /// Items per page (mock backend only)
    #[arg(long)]
    page_size: Option<NonZeroUsize>,

    /// Seconds between polls of long-running operations
    #[arg(long, default_value = "5")]
    poll_interval: u64,

    /// Delete the group when a step fails
    #[arg(long)]
    cleanup_on_failure: bool,

    /// Do not wait for enter before deleting
    #[arg(short, long)]
    yes: bool,
}

fn parse_tag(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty tag key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

async fn wait_for_enter() -> rgmux::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Press enter to delete the resources created in this sample...")
        .await?;
    stdout.flush().await?;

    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    rgmux::init();

    let mut config = Config::from_env(cli.backend)?
        .with_poll_interval(Duration::from_secs(cli.poll_interval));
    if let Some(limit) = cli.max_pages {
        config = config.with_max_pages(limit.get());
    }
    if let Some(size) = cli.page_size {
        config = config.with_option("page_size", size.to_string());
    }
    let tenant_id = config.tenant_id.clone().unwrap_or_default();

    let mut plan = SamplePlan::new(tenant_id)
        .with_group(cli.group)
        .with_location(cli.location)
        .with_output_dir(cli.output_dir);
    if !cli.tags.is_empty() {
        plan = plan.with_tags(cli.tags.into_iter().collect::<Tags>());
    }
    if cli.cleanup_on_failure {
        plan = plan.with_on_failure(OnFailure::DeleteGroup);
    }

    let mut backend = factory::new_backend(config)?;
    backend
        .init()
        .await
        .with_context(|| format!("initializing {} backend", backend.name()))?;
    let session = backend.authenticate().await.context("authentication failed")?;

    let skip_prompt = cli.yes;
    let group = plan.group.clone();
    let result = sample::run(&mut *backend, &*session, &plan, |seen| async move {
        print!("{}", report::format_groups(&seen.groups));
        print!("{}", report::format_resources(&group, &seen.resources));
        println!(
            "The resource group template has been saved to {}",
            seen.template_path.display()
        );

        if skip_prompt {
            Ok(())
        } else {
            wait_for_enter().await
        }
    })
    .await;

    if let Err(err) = result {
        tracing::error!(kind = %err.kind(), "sample failed: {}", err);
        backend.close().await.ok();
        return Err(err.into());
    }

    println!("Done!");

    backend.close().await?;
    Ok(())
}
