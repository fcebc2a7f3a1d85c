use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use serde::Deserialize;
use serde_json::{json, Value};
use std::error::Error;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use recipe_extractor::tools::TOOL_NAMES;
use recipe_extractor::{ExtractRecipeArgs, ExtractorConfig, RecipeExtractor, RecipeTools};

#[derive(Parser)]
#[command(name = "recipe-extractor")]
#[command(about = "Compliance-gated recipe extraction", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log at debug level regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    /// Ask the page service for a visible browser window
    #[arg(long, global = true)]
    no_headless: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Extract one recipe and print the outcome as JSON
    Extract {
        url: String,

        /// Skip the nutrition block
        #[arg(long)]
        no_nutrition: bool,

        /// Also read rating and review count
        #[arg(long)]
        reviews: bool,

        /// Navigation timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Check whether a URL is a supported recipe page
    Validate { url: String },
    /// Print server status and today's usage
    Status,
    /// Answer JSON tool requests read line by line from stdin
    Serve,
}

/// One line of `serve` input
#[derive(Deserialize)]
struct ToolRequest {
    tool: String,
    #[serde(default)]
    arguments: Value,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.debug {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let mut config = ExtractorConfig::load()?;
    if cli.no_headless {
        config.rendering.headless = false;
    }
    let tools = RecipeTools::new(Arc::new(RecipeExtractor::new(config)?));

    match cli.command {
        Command::Extract {
            url,
            no_nutrition,
            reviews,
            timeout,
        } => {
            let args = ExtractRecipeArgs {
                url,
                include_nutrition: !no_nutrition,
                include_reviews: reviews,
                timeout,
            };
            let outcome = tools.extract_recipe(&args).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Command::Validate { url } => {
            let validation = tools.validate_url(&url);
            println!("{}", serde_json::to_string_pretty(&validation)?);
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&tools.get_server_status())?);
        }
        Command::Serve => serve(&tools).await?,
    }

    Ok(())
}

async fn serve(tools: &RecipeTools) -> Result<(), Box<dyn Error>> {
    let usage = tools.get_daily_usage();
    info!(
        "Serving {} tools on stdio, daily usage: {}/{}",
        TOOL_NAMES.len(),
        usage.usage_count,
        usage.daily_limit
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => tools.call(&request.tool, request.arguments).await,
            Err(e) => json!({ "error": format!("Invalid request: {e}") }),
        };

        let mut output = serde_json::to_string(&response)?;
        output.push('\n');
        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }

    let usage = tools.get_daily_usage();
    info!(
        "Input closed, final daily usage: {}/{}",
        usage.usage_count, usage.daily_limit
    );
    Ok(())
}
