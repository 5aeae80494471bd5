use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use cypher_pgsql::config;
use cypher_pgsql::cypher::RegularQuery;
use cypher_pgsql::translate;
use serde::Deserialize;

/// cypher-pgsql - Translates openCypher query ASTs into PostgreSQL
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON-encoded query AST, or `-` to read standard input
    #[arg(long)]
    ast: String,

    /// YAML file with the kind table and translator settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Fractional-second precision of clock functions (0-6)
    #[arg(long)]
    timestamp_precision: Option<u8>,

    /// Print the result as a JSON document
    #[arg(long)]
    json: bool,
}

impl From<&Cli> for config::CliConfig {
    fn from(cli: &Cli) -> Self {
        config::CliConfig {
            config_file: cli.config.clone(),
            timestamp_precision: cli.timestamp_precision,
        }
    }
}

/// A single query or a batch of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum Input {
    Batch(Vec<RegularQuery>),
    Single(Box<RegularQuery>),
}

fn read_input(source: &str) -> anyhow::Result<String> {
    if source == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("failed to read the query AST from standard input")?;
        Ok(content)
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read the query AST from {}", source))
    }
}

fn main() -> anyhow::Result<()> {
    // Loads .env before configuration is read from the environment
    dotenvy::dotenv().ok();

    // Initialize logger - defaults to INFO level, can be overridden with RUST_LOG env var
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = config::TranslatorConfig::from_cli((&cli).into())
        .context("configuration error")?;
    log::info!("loaded {} kind mappings", config.kinds.len());

    let content = read_input(&cli.ast)?;
    let queries = match serde_json::from_str::<Input>(&content).context("invalid query AST")? {
        Input::Batch(queries) => queries,
        Input::Single(query) => vec![*query],
    };

    let translated = translate::translate_all(&queries, &config)?;
    let sql = translate::format_batch(&translated)?;

    if cli.json {
        let parameters: Vec<_> = translated
            .iter()
            .map(|statement| &statement.parameters)
            .collect();

        let document = serde_json::json!({
            "sql": sql,
            "parameters": parameters,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        println!("{}", sql);
        for statement in &translated {
            for (name, value) in &statement.parameters {
                println!("-- {} = {}", name, value.to_json_string());
            }
        }
    }

    Ok(())
}
