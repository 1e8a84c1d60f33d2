mod aggregate;
mod catalog;
mod cli;
mod error;
mod fmt;
mod ingest;
mod labels;
mod models;
mod reports;
mod resolver;
mod session;
mod settings;
mod table;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::drill::SelectorArgs;
use cli::{Cli, Commands};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();
    let data_dir = cli.data_dir.as_deref();

    let result = match cli.command {
        None | Some(Commands::Status) => cli::status::run(data_dir),
        Some(Commands::Init) => cli::init::run(data_dir),
        Some(Commands::Days { year, month }) => cli::days::run(data_dir, year, month),
        Some(Commands::Resolve { date, category }) => cli::resolve::run(data_dir, &date, category.as_deref()),
        Some(Commands::Show { date, category }) => cli::show::run(data_dir, &date, &category),
        Some(Commands::Drill {
            date,
            column,
            value,
            null,
            contains,
            starts_with,
            regex,
            category,
            output,
        }) => cli::drill::run(
            data_dir,
            &date,
            &category,
            &column,
            SelectorArgs {
                value,
                null,
                contains,
                starts_with,
                regex,
            },
            output.as_deref(),
        ),
        Some(Commands::Lookup {
            date,
            ids,
            file,
            category,
            output,
        }) => cli::lookup::run(data_dir, &date, &category, &ids, file.as_deref(), output.as_deref()),
        Some(Commands::Report {
            date,
            category,
            json,
            output,
            export_dir,
        }) => cli::report::run(data_dir, &date, &category, json, output.as_deref(), export_dir.as_deref()),
        Some(Commands::Completions { shell }) => cli::completions::run(shell),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
