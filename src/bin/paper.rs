use clap::{Parser, Subcommand};
use paper::{OutputFormat, PaperConfig};
use tracing::Level;

mod commands;

use commands::config::ConfigArgs;
use commands::tables::TablesArgs;
use commands::test::TestArgs;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Use test directories (./library and ./config) instead of ~/.loc.json
    #[clap(short, long, global = true)]
    test: bool,

    /// Print debug information
    #[clap(long, global = true)]
    debug: bool,

    /// Output format: table, markdown, json, json-pretty
    #[clap(short, long, global = true, default_value = "table")]
    format: OutputFormat,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the database directory and build the database from db-config.json
    Test(TestArgs),

    /// Show the resolved library and config locations
    Config(ConfigArgs),

    /// List the tables of a library database
    Tables(TablesArgs),
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { Level::INFO } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = match PaperConfig::new(cli.test) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {:#}", e);
            std::process::exit(1);
        }
    };
    if config.using_test_values {
        eprintln!("using test values ...");
    }

    let result = match cli.command {
        Commands::Test(args) => commands::test::run(&config, args),
        Commands::Config(args) => commands::config::run(&config, args, cli.format),
        Commands::Tables(args) => commands::tables::run(&config, args, cli.format),
    };

    if let Err(e) = result {
        eprintln!("ERROR: {:#}", e);
        std::process::exit(1);
    }
}
