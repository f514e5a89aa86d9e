use anyhow::{anyhow, Context, Result};
use config::{Config, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::database::SCHEMA_CONFIG_FILE;

/// Application name, appended to the library and config roots
pub const APP_NAME: &str = "paper";

/// Location file name, looked up in the home directory
pub const LOCATION_FILE: &str = ".loc.json";

/// Database file extension, appended to file names that lack it
pub const DB_EXTENSION: &str = ".db";

/// Contents of `~/.loc.json`
#[derive(Debug, Deserialize)]
struct Locations {
    library: String,
    config: String,
}

/// Resolved directories for one run of paper
///
/// Built once at startup and passed to whoever needs a path; nothing here
/// changes afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct PaperConfig {
    /// Directories were redirected by `--test`
    pub test_mode: bool,

    /// No location file was used; library and config live under `cwd`
    pub using_test_values: bool,

    pub home_dir: PathBuf,
    pub cwd: PathBuf,

    /// Path of the location file, whether or not it exists
    pub loc_file: PathBuf,

    /// Root of the paper library (databases live under `db/`)
    pub library_dir: PathBuf,

    /// Directory holding `db-config.json`
    pub config_dir: PathBuf,
}

impl PaperConfig {
    /// Resolve directories from the user's home and the current directory
    pub fn new(test_mode: bool) -> Result<PaperConfig> {
        let home_dir = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        let cwd = std::env::current_dir().context("Could not determine current directory")?;
        Self::resolve(home_dir, cwd, test_mode)
    }

    /// Resolve directories against explicit home and working directories
    ///
    /// Without `test_mode` and with a location file present, library and
    /// config roots come from that file (`PAPER_LIBRARY` / `PAPER_CONFIG`
    /// environment variables take precedence). Otherwise the test values
    /// `<cwd>/library` and `<cwd>/config` are used.
    pub fn resolve(home_dir: PathBuf, cwd: PathBuf, test_mode: bool) -> Result<PaperConfig> {
        let loc_file = home_dir.join(LOCATION_FILE);

        let (library_dir, config_dir, using_test_values) = if loc_file.exists() && !test_mode {
            let locations = read_locations(&loc_file)?;
            (
                PathBuf::from(locations.library).join(APP_NAME),
                PathBuf::from(locations.config).join(APP_NAME),
                false,
            )
        } else {
            (cwd.join("library"), cwd.join("config"), true)
        };

        Ok(PaperConfig {
            test_mode,
            using_test_values,
            home_dir,
            cwd,
            loc_file,
            library_dir,
            config_dir,
        })
    }

    /// Directory holding the database files
    pub fn db_dir(&self) -> PathBuf {
        self.library_dir.join("db")
    }

    /// Full path of the database called `filename`
    pub fn db_path(&self, filename: &str) -> PathBuf {
        self.db_dir().join(db_file_name(filename))
    }

    /// Path of the schema description file
    pub fn schema_config_path(&self) -> PathBuf {
        self.config_dir.join(SCHEMA_CONFIG_FILE)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = [
            format!("Home Directory:     {}", self.home_dir.display()),
            format!("Working Directory:  {}", self.cwd.display()),
            format!(
                "Location File:      {}{}",
                self.loc_file.display(),
                if self.loc_file.exists() { "" } else { " (missing)" }
            ),
            format!("Library Directory:  {}", self.library_dir.display()),
            format!("Config Directory:   {}", self.config_dir.display()),
            format!("Database Directory: {}", self.db_dir().display()),
            format!("Schema Config:      {}", self.schema_config_path().display()),
            format!("Test Values:        {}", self.using_test_values),
        ];
        lines.join("\n")
    }
}

/// Append the database extension unless already present
pub fn db_file_name(filename: &str) -> String {
    if filename.ends_with(DB_EXTENSION) {
        filename.to_string()
    } else {
        format!("{}{}", filename, DB_EXTENSION)
    }
}

fn read_locations(path: &Path) -> Result<Locations> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("Could not convert path to string"))?;

    // E.g., `PAPER_LIBRARY=/mnt/papers paper test` overrides the library root
    let settings = Config::builder()
        .add_source(config::File::new(path_str, FileFormat::Json))
        .add_source(config::Environment::with_prefix("PAPER"))
        .build()
        .with_context(|| format!("Failed to read location file '{}'", path.display()))?;

    settings
        .try_deserialize::<Locations>()
        .with_context(|| format!("Malformed location file '{}'", path.display()))
}
