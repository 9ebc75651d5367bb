use anyhow::{Context, Result};
use relay::cli::commands::{ConvertCommand, RunCommand};
use relay::cli::output::*;
use relay::cli::{Cli, Command};
use relay::core::{RelayConfig, RunState, StepKind};
use relay::execution::{convert_file, ExecutionEngine, ExecutionEvent};
use relay::fetch::{FetcherConfig, HttpFetcher};
use relay::stage::ThrottleStage;
use std::path::Path;
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match cli.command() {
        Command::Run(cmd) => run_relay(&cmd, &cli).await?,
        Command::Convert(cmd) => convert(&cmd).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<RelayConfig> {
    match &cli.config {
        Some(path) => RelayConfig::from_file(path).context("Failed to load relay config"),
        None => Ok(RelayConfig::default()),
    }
}

async fn run_relay(cmd: &RunCommand, cli: &Cli) -> Result<()> {
    let config = cmd.apply(load_config(cli)?);
    config.validate().context("Invalid relay config")?;

    println!("{} Fetching {}", INFO, style(config.url()).bold());

    let fetcher = HttpFetcher::new(
        FetcherConfig::new().with_user_agent(format!("relay/{}", env!("CARGO_PKG_VERSION"))),
    )
    .context("Failed to create HTTP client")?;

    let mut engine = ExecutionEngine::new(fetcher, config);

    // Set up event handler for console output
    let spinner = create_spinner();
    let progress = spinner.clone();
    engine.add_event_handler(move |event| {
        if let ExecutionEvent::StepStarted { step } = &event {
            progress.set_message(format!("{}...", step));
        }
        progress.println(format_execution_event(&event));
    });

    let mut state = RunState::new();
    let result = engine.execute(&mut state).await;
    spinner.finish_and_clear();

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        for step in StepKind::ALL {
            println!("  {:<10} {}", step, format_step_state(state.step(step)));
        }
    }

    match result {
        Ok(()) => {
            println!(
                "\n{} Files compressed and saved as {}",
                CHECK,
                style(engine.config().archive_path().display()).bold()
            );
            Ok(())
        }
        Err(e) => {
            let failed_at = state
                .failed_step()
                .map(|step| step.to_string())
                .unwrap_or_else(|| "unknown step".to_string());
            println!(
                "\n{} Relay run {} at {} ({}/{} steps completed)",
                CROSS,
                style("failed").red(),
                style(failed_at).bold(),
                state.completed_steps(),
                StepKind::ALL.len()
            );
            error!("{}", e);
            std::process::exit(1);
        }
    }
}

async fn convert(cmd: &ConvertCommand) -> Result<()> {
    let input = Path::new(&cmd.input);
    let output = Path::new(&cmd.output);

    let spinner = create_spinner();
    spinner.set_message(format!("converting {}", input.display()));
    let result = convert_file(input, output, ThrottleStage::default()).await;
    spinner.finish_and_clear();

    match result {
        Ok(()) => {
            println!("{} Data saved to {}", CHECK, style(output.display()).bold());
            Ok(())
        }
        Err(e) => {
            println!("{} Conversion {}", CROSS, style("failed").red());
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
