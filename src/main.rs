use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Input};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use toolgen_core::{
    Config, FocusTarget, GenerationClient, GenerationRequest, GenerationSession, InputCollector,
    OrchestratorSettings, ProgressiveRevealer, RequestOrchestrator, ToolDefinition,
};

mod logging;
mod output;

#[derive(Parser)]
#[command(name = "toolgen")]
#[command(about = "Run AI generation tools from the command line")]
struct Cli {
    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the inputs a tool expects
    Inputs {
        /// Tool definition (JSON)
        tool: PathBuf,
    },
    /// Render a tool's prompts without sending anything
    Render {
        /// Tool definition (JSON)
        tool: PathBuf,
        /// Input value as name=value (repeatable)
        #[arg(short = 'i', long = "input", value_parser = parse_key_value)]
        inputs: Vec<(String, String)>,
    },
    /// Fill in a tool's inputs and generate
    Run {
        /// Tool definition (JSON)
        tool: PathBuf,
        /// Input value as name=value (repeatable)
        #[arg(short = 'i', long = "input", value_parser = parse_key_value)]
        inputs: Vec<(String, String)>,
        /// Generation endpoint (overrides config and TOOLGEN_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,
        /// Print the result at once instead of revealing it
        #[arg(long)]
        no_animation: bool,
    },
    /// Show or update the saved configuration
    Config {
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long)]
        max_retries: Option<u32>,
        #[arg(long)]
        reveal_tick_ms: Option<u64>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("missing input name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Inputs { tool } => list_inputs(&tool)?,
        Commands::Render { tool, inputs } => render_prompts(&tool, &inputs)?,
        Commands::Run {
            tool,
            inputs,
            endpoint,
            no_animation,
        } => return run_tool(&tool, &inputs, endpoint, !no_animation, config_path).await,
        Commands::Config {
            endpoint,
            timeout_ms,
            max_retries,
            reveal_tick_ms,
        } => update_config(config_path, endpoint, timeout_ms, max_retries, reveal_tick_ms)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn config_file(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path.to_path_buf()),
        None => Config::get_config_path(),
    }
}

/// A missing file means defaults; a malformed one is an error
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

fn list_inputs(path: &Path) -> Result<()> {
    let tool = ToolDefinition::load(path)?;

    println!("\n{}", tool_heading(&tool).bold().blue());
    if !tool.description.is_empty() {
        println!("{}", tool.description.dimmed());
    }
    println!("{}", "=".repeat(40).dimmed());

    if tool.inputs.is_empty() {
        println!("{}", "This tool takes no inputs".yellow());
    }
    for input in &tool.inputs {
        let marker = if input.required { "*".red().bold() } else { " ".normal() };
        println!("{} {}  {}", marker, input.name.bold().green(), input.description.dimmed());
    }

    println!("\n{} credits per generation", tool.credits_cost.to_string().bold());
    Ok(())
}

fn render_prompts(path: &Path, inputs: &[(String, String)]) -> Result<()> {
    let tool = ToolDefinition::load(path)?;
    let collector = InputCollector::new();
    for (name, value) in inputs {
        collector.set_value(name, value);
    }

    let missing = collector.validate(&tool.inputs);
    if !missing.is_empty() {
        println!("{} {}", "⚠️  Missing required inputs:".yellow(), missing.join(", "));
    }

    let request = GenerationRequest::build(&tool, collector.snapshot());
    for (i, prompt) in request.rendered_prompts().enumerate() {
        println!("\n{}", format!("Prompt {}", i + 1).bold().yellow());
        println!("{}", prompt);
    }
    Ok(())
}

async fn run_tool(
    path: &Path,
    inputs: &[(String, String)],
    endpoint: Option<String>,
    animate: bool,
    config_path: Option<&Path>,
) -> Result<ExitCode> {
    let tool = ToolDefinition::load(path)?;
    let config = load_config(config_path)?;
    let endpoint = endpoint.unwrap_or_else(|| config.endpoint());

    let orchestrator = RequestOrchestrator::new(
        GenerationClient::new(&endpoint),
        OrchestratorSettings::from(&config),
    );
    let mut session =
        GenerationSession::new(orchestrator, ProgressiveRevealer::new(config.reveal_tick()));

    println!("\n{}", tool_heading(&tool).bold().blue());
    session.load_tool(tool);
    for (name, value) in inputs {
        session.set_value(name, value)?;
    }

    if std::io::stdin().is_terminal() {
        prompt_for_inputs(&session)?;
    }

    if let Some(label) = session.submit_label() {
        eprintln!("{}", label.dimmed());
    }
    session.submit()?;

    match output::follow(&session, animate).await? {
        Some(outcome) if outcome.is_success() => Ok(ExitCode::SUCCESS),
        Some(_) => Ok(ExitCode::FAILURE),
        None => Err(anyhow!("Generation ended without a result")),
    }
}

/// Ask for unfilled required inputs in focus order. An empty answer stops
/// prompting; submit then reports what is still missing.
fn prompt_for_inputs(session: &GenerationSession) -> Result<()> {
    let inputs = session
        .tool()
        .map(|tool| tool.inputs.clone())
        .unwrap_or_default();

    // Confirming the last field searches from the first one
    let mut focus = session.confirm(inputs.len().saturating_sub(1))?;

    while let FocusTarget::Input(index) = focus {
        let input = &inputs[index];
        let prompt = if input.description.is_empty() {
            input.name.clone()
        } else {
            format!("{} ({})", input.name, input.description)
        };

        let value: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;

        if value.is_empty() {
            break;
        }
        session.set_value(&input.name, &value)?;
        focus = session.confirm(index)?;
    }

    Ok(())
}

fn update_config(
    config_path: Option<&Path>,
    endpoint: Option<String>,
    timeout_ms: Option<u64>,
    max_retries: Option<u32>,
    reveal_tick_ms: Option<u64>,
) -> Result<()> {
    let config_path = config_file(config_path)?;
    let mut config = Config::load_from(&config_path)?;
    let changed =
        endpoint.is_some() || timeout_ms.is_some() || max_retries.is_some() || reveal_tick_ms.is_some();

    if let Some(endpoint) = endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(timeout_ms) = timeout_ms {
        config.request_timeout_ms = Some(timeout_ms);
    }
    if let Some(max_retries) = max_retries {
        config.max_retries = Some(max_retries);
    }
    if let Some(reveal_tick_ms) = reveal_tick_ms {
        config.reveal_tick_ms = Some(reveal_tick_ms);
    }

    if changed {
        config.save_to(&config_path)?;
        println!("{}", "✓ Configuration saved".green());
    }

    println!("\n{}", "⚙️  Configuration".bold().blue());
    println!("{}", "=".repeat(30).dimmed());
    println!("  endpoint:      {}", config.endpoint().green());
    println!("  timeout:       {} ms", config.request_timeout().as_millis());
    println!("  max retries:   {}", config.max_retries());
    println!("  reveal tick:   {} ms", config.reveal_tick().as_millis());
    println!("  file:          {}", config_path.display().to_string().dimmed());
    Ok(())
}

fn tool_heading(tool: &ToolDefinition) -> String {
    if tool.title.is_empty() {
        format!("🛠  {}", tool.id)
    } else {
        format!("🛠  {}", tool.title)
    }
}
