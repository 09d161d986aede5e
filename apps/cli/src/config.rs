//! Command-line and environment configuration.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sleepscope_core::import::{ColumnOverrides, ImportOptions};
use sleepscope_core::schema_guard::{ColumnDataType, ColumnRegistration};

pub const DEFAULT_DB_PATH: &str = "./db/sleepscope.db";

#[derive(Parser, Debug)]
#[command(name = "sleepscope")]
#[command(about = "Import wearable activity exports into a local sleep analysis database")]
#[command(version)]
pub struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "SLEEPSCOPE_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Log output format
    #[arg(long, global = true, env = "SLEEPSCOPE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Extra queryable column as `name=storage_column` (repeatable)
    #[arg(long = "column-alias", global = true, value_parser = parse_column_alias)]
    pub column_aliases: Vec<ColumnRegistration>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Import a single activity file
    Import {
        path: PathBuf,
        #[command(flatten)]
        options: ImportArgs,
    },
    /// Import every supported file in a directory
    ImportDir {
        path: PathBuf,
        #[command(flatten)]
        options: ImportArgs,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
    /// List imported files
    Files {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the dates covered by an imported file
    Dates { filename: String },
    /// Delete an imported file and everything derived from it
    Delete { filename: String },
    /// Export sleep metrics enriched with diary and nonwear data as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Flags mirroring [`ImportOptions`].
#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    /// Metadata lines before the header row
    #[arg(long)]
    pub skip_rows: Option<usize>,
    /// Rows per insert batch
    #[arg(long)]
    pub batch_size: Option<usize>,
    /// Largest accepted file, in bytes
    #[arg(long)]
    pub max_file_size: Option<u64>,
    /// Field delimiter; detected when omitted
    #[arg(long)]
    pub delimiter: Option<char>,
    /// Expected sampling interval in seconds
    #[arg(long)]
    pub epoch_seconds: Option<i64>,
    /// Import even when the file is unchanged
    #[arg(short, long)]
    pub force: bool,
    #[arg(long)]
    pub date_column: Option<String>,
    #[arg(long)]
    pub time_column: Option<String>,
    #[arg(long)]
    pub datetime_column: Option<String>,
    #[arg(long)]
    pub activity_column: Option<String>,
    #[arg(long)]
    pub axis_x_column: Option<String>,
    #[arg(long)]
    pub axis_y_column: Option<String>,
    #[arg(long)]
    pub axis_z_column: Option<String>,
    #[arg(long)]
    pub vector_magnitude_column: Option<String>,
}

impl ImportArgs {
    pub fn to_options(&self, recursive: bool) -> ImportOptions {
        let defaults = ImportOptions::default();
        ImportOptions {
            skip_rows: self.skip_rows.unwrap_or(defaults.skip_rows),
            batch_size: self.batch_size.unwrap_or(defaults.batch_size),
            max_file_size: self.max_file_size.unwrap_or(defaults.max_file_size),
            delimiter: self.delimiter,
            epoch_seconds: self.epoch_seconds.unwrap_or(defaults.epoch_seconds),
            column_overrides: ColumnOverrides {
                date: self.date_column.clone(),
                time: self.time_column.clone(),
                datetime: self.datetime_column.clone(),
                activity: self.activity_column.clone(),
                axis_x: self.axis_x_column.clone(),
                axis_y: self.axis_y_column.clone(),
                axis_z: self.axis_z_column.clone(),
                vector_magnitude: self.vector_magnitude_column.clone(),
            },
            force_reimport: self.force,
            recursive,
        }
    }
}

fn parse_column_alias(value: &str) -> Result<ColumnRegistration, String> {
    let (name, storage_column) = value
        .split_once('=')
        .ok_or_else(|| format!("expected name=storage_column, got '{}'", value))?;
    if name.trim().is_empty() || storage_column.trim().is_empty() {
        return Err(format!("empty side in column alias '{}'", value));
    }
    Ok(ColumnRegistration {
        name: name.trim().to_string(),
        storage_column: storage_column.trim().to_string(),
        data_type: ColumnDataType::Real,
    })
}
