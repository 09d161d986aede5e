mod commands;
mod config;
mod main_lib;

use clap::Parser;
use config::{Cli, Command};
use main_lib::{build_state, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let state = build_state(&cli.db_path, &cli.column_aliases)?;

    match cli.command {
        Command::Import { path, options } => {
            commands::import_file(&state, path, options.to_options(false)).await
        }
        Command::ImportDir {
            path,
            options,
            recursive,
        } => commands::import_directory(&state, path, options.to_options(recursive)).await,
        Command::Files { json } => commands::list_files(&state, json),
        Command::Dates { filename } => commands::list_dates(&state, &filename),
        Command::Delete { filename } => commands::delete_file(&state, &filename),
        Command::Export { output } => commands::export(&state, output.as_deref()),
    }
}
