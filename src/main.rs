// Copyright 2026 Pagelens Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use pagelens::browser::chromium::ChromiumEngine;
use pagelens::events::{EventSink, FetchEvent};
use pagelens::export;
use pagelens::fetch::HttpFetcher;
use pagelens::pipeline::Pipeline;
use pagelens::rest::{self, AppState};
use pagelens::store::HistoryStore;

#[derive(Parser)]
#[command(
    name = "pagelens",
    about = "Fetch a web page with escalating retrieval strategies and keep a local history",
    version
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Path of the history file
    #[arg(long, global = true, default_value = "history.json")]
    history_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "5000")]
        port: u16,
    },
    /// Fetch one URL, print progress to stderr and the record to stdout
    Fetch {
        /// URL to fetch
        url: String,
        /// Print the full record as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Inspect and manage the history file
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List all records, most recent first
    List,
    /// Print one record as JSON
    Show { index: usize },
    /// Delete one record by position
    Delete { index: usize },
    /// Write one record (or one of its tables) to a file in the current directory
    Export {
        index: usize,
        /// Export this table as CSV instead of the whole record as JSON
        #[arg(long)]
        table: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "pagelens=debug"
    } else {
        "pagelens=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let store = Arc::new(HistoryStore::new(&cli.history_file));

    match cli.command {
        Commands::Serve { port } => {
            let pipeline = Arc::new(Pipeline::new(
                Arc::new(HttpFetcher::new()),
                Arc::new(ChromiumEngine::new()),
                Arc::clone(&store),
            ));
            rest::start(port, Arc::new(AppState { pipeline, store })).await
        }
        Commands::Fetch { url, json } => {
            let pipeline = Arc::new(Pipeline::new(
                Arc::new(HttpFetcher::new()),
                Arc::new(ChromiumEngine::new()),
                Arc::clone(&store),
            ));
            run_once(pipeline, &url, json).await
        }
        Commands::History { action } => run_history(store, action).await,
    }
}

/// One-shot pipeline run for the `fetch` subcommand.
async fn run_once(pipeline: Arc<Pipeline>, url: &str, json: bool) -> Result<()> {
    let (sink, mut rx) = EventSink::channel();
    let task = {
        let pipeline = Arc::clone(&pipeline);
        let url = url.to_string();
        tokio::spawn(async move {
            pipeline.run(&url, &sink).await;
        })
    };

    let mut outcome = Ok(());
    while let Some(event) = rx.recv().await {
        match event {
            FetchEvent::Log(msg) => eprintln!("  {msg}"),
            FetchEvent::Result(record) => {
                if json {
                    println!("{}", export::record_to_json(&record)?);
                } else {
                    println!("{}", record.title);
                    println!("  url:        {}", record.url);
                    println!("  retrieved:  {}", record.retrieved_at);
                    println!("  paragraphs: {}", record.paragraphs.len());
                    println!("  links:      {}", record.links.len());
                    println!("  tables:     {}", record.tables.len());
                }
                break;
            }
            FetchEvent::Error(msg) => {
                outcome = Err(anyhow::anyhow!(msg));
                break;
            }
        }
    }

    task.await?;
    outcome
}

async fn run_history(store: Arc<HistoryStore>, action: HistoryAction) -> Result<()> {
    match action {
        HistoryAction::List => {
            let records = store.list().await?;
            if records.is_empty() {
                println!("history is empty");
            }
            for (i, record) in records.iter().enumerate() {
                println!("{i:3}  {}  {}  ({})", record.retrieved_at, record.title, record.url);
            }
        }
        HistoryAction::Show { index } => match store.get(index).await? {
            Some(record) => println!("{}", export::record_to_json(&record)?),
            None => anyhow::bail!("index {index} out of range"),
        },
        HistoryAction::Delete { index } => {
            if store.delete(index).await? {
                println!("deleted record {index}");
            } else {
                anyhow::bail!("index {index} out of range");
            }
        }
        HistoryAction::Export { index, table } => {
            let Some(record) = store.get(index).await? else {
                anyhow::bail!("index {index} out of range");
            };
            let filename = match table {
                Some(t) => {
                    let Some(table) = record.tables.get(t) else {
                        anyhow::bail!("record {index} has no table {t}");
                    };
                    let filename = format!("table_{index}_{t}.csv");
                    std::fs::write(&filename, export::table_to_csv(table))?;
                    filename
                }
                None => {
                    let filename = format!("export_{index}.json");
                    std::fs::write(&filename, export::record_to_json(&record)?)?;
                    filename
                }
            };
            println!("wrote {filename}");
        }
    }
    Ok(())
}
