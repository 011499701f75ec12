//! FoodPreserveBot command-line entry point

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use foodpreserve_bot::{
    BotConfig, Conversation, FoodPreserveBot, Prediction, ShelfLifeEstimator, ShelfLifeOutlook,
    ShelfLifeParams, ShelfLifePredictor, GREETING,
};
use std::io::Write as _;
use std::path::PathBuf;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "foodpreserve-bot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Food preservation assistant with shelf-life estimates", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to config/foodpreserve.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the training dataset path
    #[arg(long, global = true)]
    dataset: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the food categories the model knows
    Categories,
    /// Estimate shelf life for one storage condition
    Predict {
        #[command(flatten)]
        params: StorageArgs,
    },
    /// Ask a single question
    Ask {
        text: String,
        #[command(flatten)]
        params: OptionalStorageArgs,
    },
    /// Interactive chat on stdin
    Chat {
        #[command(flatten)]
        params: OptionalStorageArgs,
    },
}

#[derive(Args, Debug)]
struct StorageArgs {
    /// Storage temperature in °C
    #[arg(long, allow_hyphen_values = true)]
    temperature: f64,
    /// Acidity (pH)
    #[arg(long)]
    ph: f64,
    #[arg(long)]
    category: String,
}

#[derive(Args, Debug)]
struct OptionalStorageArgs {
    /// Storage temperature in °C
    #[arg(long, allow_hyphen_values = true)]
    temperature: Option<f64>,
    /// Acidity (pH)
    #[arg(long)]
    ph: Option<f64>,
    #[arg(long)]
    category: Option<String>,
}

impl From<OptionalStorageArgs> for ShelfLifeParams {
    fn from(args: OptionalStorageArgs) -> Self {
        ShelfLifeParams {
            temperature: args.temperature,
            acidity: args.ph,
            category: args.category,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    info!("Starting FoodPreserveBot v{}", env!("CARGO_PKG_VERSION"));

    let mut config = BotConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(dataset) = cli.dataset {
        config.dataset_path = dataset;
    }

    let result = match cli.command {
        Command::Categories => list_categories(&config),
        Command::Predict { params } => predict(&config, &params),
        Command::Ask { text, params } => ask(&config, &text, params.into()).await,
        Command::Chat { params } => chat(&config, params.into()).await,
    };

    if let Err(e) = &result {
        error!("{:#}", e);
    }
    result
}

fn init_logging() {
    let env = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(env)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn list_categories(config: &BotConfig) -> Result<()> {
    let predictor = ShelfLifePredictor::new(config.predictor_config());
    for category in predictor.list_categories()? {
        println!("{category}");
    }
    Ok(())
}

fn predict(config: &BotConfig, params: &StorageArgs) -> Result<()> {
    let predictor = ShelfLifePredictor::new(config.predictor_config());
    let prediction = predictor.predict(params.temperature, params.ph, &params.category)?;
    print_prediction(&prediction);
    Ok(())
}

fn print_prediction(prediction: &Prediction) {
    let outlook = ShelfLifeOutlook::classify(prediction.days);
    println!("Predicted shelf life: {:.1} days ({outlook})", prediction.days);
    if prediction.fallback {
        println!(
            "Note: unknown category '{}', estimated as '{}'",
            prediction.requested_category, prediction.category_used
        );
    }
    println!("{}", outlook.advice());
}

/// Storage flags are all-or-nothing on the command line
fn ensure_all_or_none(params: &ShelfLifeParams) -> Result<()> {
    if params.is_partial() {
        bail!("--temperature, --ph and --category must be given together");
    }
    Ok(())
}

async fn ask(config: &BotConfig, text: &str, params: ShelfLifeParams) -> Result<()> {
    ensure_all_or_none(&params)?;

    let bot = FoodPreserveBot::new(config)?;
    let reply = bot.get_response(text, &params).await?;
    println!("{reply}");
    Ok(())
}

async fn chat(config: &BotConfig, params: ShelfLifeParams) -> Result<()> {
    ensure_all_or_none(&params)?;

    let bot = FoodPreserveBot::new(config)?;
    let mut conversation = Conversation::new();
    let mut lines = BufReader::new(io::stdin()).lines();

    println!("{GREETING}");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if matches!(text, "exit" | "quit") {
            break;
        }

        match bot.chat(&mut conversation, text, &params).await {
            Ok(response) => {
                if let Some(prediction) = &response.prediction {
                    print_prediction(prediction);
                }
                println!("{}", response.text);
            }
            Err(e) => eprintln!("Error: {e}. Please try again."),
        }
    }

    info!(conversation = %conversation.id, turns = conversation.len(), "Chat ended");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_rejects_partial_storage_flags() {
        let cli = Cli::try_parse_from(["foodpreserve-bot", "ask", "fridge?", "--temperature", "-18"])
            .unwrap();
        let Command::Ask { params, .. } = cli.command else {
            panic!("expected ask");
        };
        assert!(ensure_all_or_none(&params.into()).is_err());
    }

    #[test]
    fn test_chat_accepts_full_or_empty_storage_flags() {
        let cli = Cli::try_parse_from([
            "foodpreserve-bot", "chat", "--temperature", "4", "--ph", "6.0", "--category", "Meat",
        ])
        .unwrap();
        let Command::Chat { params } = cli.command else {
            panic!("expected chat");
        };
        assert!(ensure_all_or_none(&params.into()).is_ok());
        assert!(ensure_all_or_none(&ShelfLifeParams::default()).is_ok());
    }
}
