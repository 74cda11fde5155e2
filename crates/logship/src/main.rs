mod handlers;
mod output;
mod runtime;
mod telemetry;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use logship_cloud::AwsClients;
use logship_cloud::prune::{PruneOptions, prune_log_groups};
use logship_core::config::Config;
use serde_json::Value;
use tokio::io::AsyncReadExt;

use crate::handlers::{Function, Handlers, InvocationContext};
use crate::output::print_prune_human;
use crate::telemetry::{init_cli_tracing, init_function_tracing, shutdown_tracing};

#[derive(Parser, Debug)]
#[command(name = "logship")]
#[command(about = "Ship, structure and manage CloudWatch Logs from Lambda")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run one function locally on an event")]
    Invoke {
        #[arg(value_enum)]
        function: Function,
        #[arg(long, help = "Event JSON file; reads stdin when omitted")]
        event: Option<PathBuf>,
        #[arg(long, help = "ARN reported as the invoked function")]
        function_arn: Option<String>,
    },
    #[command(about = "Serve invocations from the Lambda Runtime API")]
    Serve {
        #[arg(value_enum, help = "Function to serve; defaults to $_HANDLER")]
        function: Option<Function>,
    },
    #[command(about = "Delete Lambda log groups whose CloudFormation stack is gone")]
    DeleteOldLogGroups {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        page_size: Option<i32>,
        #[arg(long, help = "Report old log groups without deleting them")]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Invoke {
            function,
            event,
            function_arn,
        } => {
            init_function_tracing();
            run_invoke(function, event, function_arn).await
        }
        Commands::Serve { function } => {
            init_function_tracing();
            run_serve(function).await
        }
        Commands::DeleteOldLogGroups {
            prefix,
            page_size,
            dry_run,
        } => {
            init_cli_tracing();
            run_delete_old_log_groups(prefix, page_size, dry_run, cli.json).await
        }
    };

    shutdown_tracing();
    result
}

async fn run_invoke(
    function: Function,
    event_path: Option<PathBuf>,
    function_arn: Option<String>,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let raw = match event_path {
        Some(path) => tokio::fs::read(&path)
            .await
            .with_context(|| format!("read event file {}", path.display()))?,
        None => {
            let mut buf = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut buf)
                .await
                .context("read event from stdin")?;
            buf
        }
    };
    let event: Value = serde_json::from_slice(&raw).context("event is not valid json")?;

    let ctx = InvocationContext {
        request_id: uuid::Uuid::new_v4().to_string(),
        invoked_function_arn: function_arn,
    };
    let response = Handlers::new(config).handle(function, event, &ctx).await?;
    if !response.is_null() {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    Ok(())
}

async fn run_serve(function: Option<Function>) -> anyhow::Result<()> {
    let function = match function {
        Some(function) => function,
        None => {
            let handler =
                std::env::var("_HANDLER").context("no function given and _HANDLER is not set")?;
            Function::from_handler(&handler)
                .with_context(|| format!("unknown handler {handler:?}"))?
        }
    };
    let config = Config::load()?;
    anyhow::ensure!(
        std::env::var_os("AWS_LAMBDA_RUNTIME_API").is_some(),
        "AWS_LAMBDA_RUNTIME_API is not set; serve only runs inside Lambda"
    );

    tracing::info!(function = function.name(), "serving lambda invocations");
    runtime::run(Handlers::new(config), function)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}

async fn run_delete_old_log_groups(
    prefix: Option<String>,
    page_size: Option<i32>,
    dry_run: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load()?;
    let mut opts = PruneOptions::from_config(&config);
    if let Some(prefix) = prefix {
        opts.prefix = prefix;
    }
    if let Some(page_size) = page_size {
        anyhow::ensure!(
            (1..=50).contains(&page_size),
            "--page-size must be between 1 and 50"
        );
        opts.page_size = page_size;
    }
    opts.dry_run = dry_run;

    let clients = AwsClients::from_config(&config).await;
    let report = prune_log_groups(&clients, &opts).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_prune_human(&report);
    }
    Ok(())
}
