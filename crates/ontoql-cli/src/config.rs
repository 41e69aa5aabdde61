//! Command-line arguments.

use crate::formatter::OutputFormat;
use clap::{Parser, Subcommand};
use ontoql_core::query::{
    CompilerConfig, DEFAULT_ALIAS_PREFIX, DEFAULT_MAX_PATH_STEPS, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use ontoql_proto::FieldValue;
use std::path::PathBuf;

/// Compile ontology queries into parameterized SQL.
#[derive(Debug, Parser)]
#[command(name = "ontoql")]
#[command(version, about = "Compile ontology queries into parameterized SQL")]
pub struct Args {
    /// Ontology JSON file.
    #[arg(long, env = "ONTOQL_ONTOLOGY", global = true)]
    pub ontology: Option<PathBuf>,

    /// Directory of a versioned ontology catalog; takes precedence over `--ontology`.
    #[arg(long, env = "ONTOQL_CATALOG", global = true)]
    pub catalog: Option<PathBuf>,

    /// Output format.
    #[arg(long, default_value = "json", value_enum, global = true)]
    pub format: OutputFormat,

    /// Prefix of generated table aliases.
    #[arg(long, default_value = DEFAULT_ALIAS_PREFIX, global = true)]
    pub alias_prefix: String,

    /// Page size used when a list request does not set one.
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, global = true)]
    pub default_page_size: u32,

    /// Largest page size a list request may use.
    #[arg(long, default_value_t = MAX_PAGE_SIZE, global = true)]
    pub max_page_size: u32,

    /// Resolution step ceiling for one field path.
    #[arg(long, default_value_t = DEFAULT_MAX_PATH_STEPS, global = true)]
    pub max_path_steps: usize,

    #[command(subcommand)]
    pub command: Command,
}

/// What to compile.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Paginated list query.
    List {
        entity: String,
        /// Field paths to select (comma separated); all bound fields when omitted.
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        /// Filter tree as JSON, or `@path` to read it from a file.
        #[arg(long)]
        filter: Option<String>,
        /// Zero-based page number.
        #[arg(long, default_value_t = 0)]
        page: u32,
        /// Page size; 0 uses the default.
        #[arg(long, default_value_t = 0)]
        page_size: u32,
        /// Field path to sort by.
        #[arg(long)]
        sort: Option<String>,
        /// Sort direction (`asc` or `desc`).
        #[arg(long, default_value = "asc")]
        direction: String,
    },
    /// Count matching rows.
    Count {
        entity: String,
        #[arg(long)]
        filter: Option<String>,
    },
    /// First row matching field equalities.
    Single {
        entity: String,
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        /// Equality filter `field=value`; repeatable.
        #[arg(long = "where", value_parser = parse_field_value)]
        conditions: Vec<FieldValue>,
    },
    /// Primary keys of at most two matching rows.
    FindId {
        entity: String,
        #[arg(long)]
        filter: Option<String>,
    },
    /// Insert one row.
    Insert {
        entity: String,
        /// Value `field=value`; repeatable. `field=null` binds NULL.
        #[arg(long = "set", value_parser = parse_field_value)]
        values: Vec<FieldValue>,
    },
    /// Update one row.
    Update {
        entity: String,
        #[arg(long = "set", value_parser = parse_field_value, required = true)]
        values: Vec<FieldValue>,
        /// Field identifying the row.
        #[arg(long, default_value = "id")]
        id_field: String,
        /// Row id to bind; left unbound when omitted.
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete one row.
    Delete {
        entity: String,
        #[arg(long, default_value = "id")]
        id_field: String,
        #[arg(long)]
        id: Option<String>,
    },
    /// Store an ontology JSON file as the next catalog version.
    Import { file: PathBuf },
    /// List entities of the ontology.
    Entities,
}

impl From<&Args> for CompilerConfig {
    fn from(args: &Args) -> Self {
        CompilerConfig::new()
            .alias_prefix(args.alias_prefix.clone())
            .default_page_size(args.default_page_size)
            .max_page_size(args.max_page_size)
            .max_path_steps(args.max_path_steps)
    }
}

/// Parse `field=value`.
pub fn parse_field_value(raw: &str) -> Result<FieldValue, String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{}'", raw))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    Ok(FieldValue::new(field, value))
}
