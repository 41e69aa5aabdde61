//! ontoql command-line compiler
//!
//! Compiles list, count, lookup and mutation requests against an ontology
//! and prints the resulting SQL with its parameters.

mod commands;
mod config;
mod formatter;

use anyhow::{bail, Context};
use clap::Parser;
use commands::{OntologySource, Output};
use config::{Args, Command};
use ontoql_core::catalog::Catalog;
use ontoql_core::CompilerConfig;
use tracing::debug;

fn main() {
    // Logs go to stderr so statements can be piped.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "ontoql_cli=info"
                    .parse()
                    .unwrap_or_else(|_| tracing::level_filters::LevelFilter::INFO.into()),
            ),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let formatter = formatter::create_formatter(args.format);
    let config = CompilerConfig::from(&args);
    debug!(?config, format = %args.format, "Starting ontoql");

    let output = match &args.command {
        Command::Import { file } => {
            let Some(dir) = &args.catalog else {
                bail!("import needs --catalog (or ONTOQL_CATALOG)");
            };
            let catalog = Catalog::open_path(dir)
                .with_context(|| format!("opening catalog {}", dir.display()))?;
            commands::import(&catalog, file)?
        }
        command => {
            let source = open_source(&args)?;
            commands::execute(command, &source, config)?
        }
    };

    let rendered = match &output {
        Output::Statement(result) => formatter.format_statement(result),
        Output::Entities(names) => formatter.format_entities(names),
        Output::Message(message) => formatter.format_message(message),
    };
    println!("{}", rendered);
    Ok(())
}

fn open_source(args: &Args) -> anyhow::Result<OntologySource> {
    match (&args.catalog, &args.ontology) {
        (Some(dir), _) => OntologySource::from_catalog(dir),
        (None, Some(file)) => OntologySource::from_file(file),
        (None, None) => bail!("no ontology given; pass --ontology or --catalog"),
    }
}
