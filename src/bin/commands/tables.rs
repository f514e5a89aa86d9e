use anyhow::{anyhow, Result};
use clap::Args;
use paper::{OutputFormat, PaperConfig, PaperDatabase, DEFAULT_DB_NAME};
use tabled::settings::Style;
use tabled::Table;

use super::print_json;

/// Arguments for the Tables command
#[derive(Args)]
pub struct TablesArgs {
    /// Database file name inside the library's db directory (".db" is appended)
    #[clap(short, long, default_value = DEFAULT_DB_NAME)]
    pub name: String,
}

pub fn run(config: &PaperConfig, args: TablesArgs, output_format: OutputFormat) -> Result<()> {
    let TablesArgs { name } = args;

    // opening would create an empty file, so refuse unknown databases
    let path = config.db_path(&name);
    if !path.exists() {
        return Err(anyhow!(
            "database '{}' does not exist, run `paper test --name {}` first",
            path.display(),
            name
        ));
    }

    let mut db = PaperDatabase::open(&path)?;
    let summaries = db.table_summaries()?;
    db.close()?;

    if print_json(&summaries, output_format)? {
        return Ok(());
    }

    if summaries.is_empty() {
        println!("no tables in {}", path.display());
        return Ok(());
    }

    match output_format {
        OutputFormat::Markdown => println!("{}", Table::new(&summaries).with(Style::markdown())),
        _ => println!("{}", Table::new(&summaries).with(Style::rounded())),
    }
    Ok(())
}
