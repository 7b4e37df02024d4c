use clap::{Parser, Subcommand};
use memories_store::memory::{TextMemory, TodoMemory};
use memories_store::{EncodeError, Record, RecordStore, StoreConfig, StoreError, WriteMode};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the store file (overrides the config file)
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Replace the store file with a temp-file-and-rename on save
    #[arg(long)]
    atomic: bool,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List all memories
    List,
    /// Print one memory as JSON
    Show { name: String },
    /// Add or replace a text memory
    AddText { name: String, text: String },
    /// Add or replace a todo memory
    AddTodo { name: String, items: Vec<String> },
    /// Remove a memory
    Remove { name: String },
    /// Remove every memory
    Clear,
}

fn load_config(cli: &Cli) -> Result<StoreConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::default(),
    };
    if let Some(store) = &cli.store {
        config.path = store.clone();
    }
    if cli.atomic {
        config.write_mode = WriteMode::Atomic;
    }
    Ok(config)
}

fn print_record(key: &str, record: &dyn Record) -> Result<(), StoreError> {
    let value = record.encode().map_err(|source| StoreError::Encode {
        context: "Failed to marshal memory".to_string(),
        source: EncodeError::Record {
            name: record.name().to_string(),
            key: key.to_string(),
            source,
        },
    })?;
    println!("{}", value);
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli)?;
    debug!("config: {:?}", config);

    let mut store = RecordStore::from_config(&config)?;
    info!("store loaded.");

    match &cli.command {
        Command::List => {
            let mut names: Vec<&String> = store.get_all().keys().collect();
            names.sort();
            for name in names {
                let record = store.get(name)?;
                println!("{}\t{}", name, record.kind());
            }
        }
        Command::Show { name } => {
            let record = store.get(name)?;
            print_record(name, record.as_ref())?;
        }
        Command::AddText { name, text } => {
            let memory = TextMemory::new(name.as_str(), text.as_str()).created_now();
            store.add(name.as_str(), Arc::new(memory))?;
        }
        Command::AddTodo { name, items } => {
            let memory = items
                .iter()
                .fold(TodoMemory::new(name.as_str()), |todo, item| {
                    todo.with_item(item.as_str())
                });
            store.add(name.as_str(), Arc::new(memory))?;
        }
        Command::Remove { name } => store.remove(name)?,
        Command::Clear => store.remove_all()?,
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
