use anyhow::Result;
use clap::Args;
use paper::{OutputFormat, PaperConfig};
use serde::Serialize;

use super::print_json;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Also list the database files in the library
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo<'a> {
    #[serde(flatten)]
    config: &'a PaperConfig,
    db_dir: String,
    schema_config: String,
    schema_config_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    databases: Option<Vec<String>>,
}

pub fn run(config: &PaperConfig, args: ConfigArgs, output_format: OutputFormat) -> Result<()> {
    let ConfigArgs { verbose } = args;

    let databases = if verbose {
        Some(list_databases(config))
    } else {
        None
    };

    let info = ConfigInfo {
        config,
        db_dir: config.db_dir().display().to_string(),
        schema_config: config.schema_config_path().display().to_string(),
        schema_config_exists: config.schema_config_path().exists(),
        databases,
    };

    if print_json(&info, output_format)? {
        return Ok(());
    }

    println!("{}", config.summary());
    if !info.schema_config_exists {
        println!("\nNo schema config found; create {} first.", info.schema_config);
    }
    if let Some(databases) = &info.databases {
        println!("\nDatabases:");
        if databases.is_empty() {
            println!("  (none)");
        }
        for db in databases {
            println!("  {}", db);
        }
    }
    Ok(())
}

/// File names of the `.db` files in the database directory
fn list_databases(config: &PaperConfig) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(config.db_dir()) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|name| name.ends_with(paper::DB_EXTENSION))
        .collect();
    names.sort();
    names
}
