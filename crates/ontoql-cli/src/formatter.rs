//! Output formatters for compiled statements.

use clap::ValueEnum;
use ontoql_proto::{QueryResult, Value};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The whole compiled statement as JSON
    Json,
    /// SQL text followed by parameter comments
    Sql,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Sql => write!(f, "sql"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter: Send + Sync {
    /// Format a compiled statement.
    fn format_statement(&self, result: &QueryResult) -> String;

    /// Format a list of entity names.
    fn format_entities(&self, entities: &[String]) -> String;

    /// Format a simple message.
    fn format_message(&self, message: &str) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Sql => Box::new(SqlFormatter),
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_statement(&self, result: &QueryResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    fn format_entities(&self, entities: &[String]) -> String {
        serde_json::json!({ "entities": entities }).to_string()
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({ "message": message }).to_string()
    }
}

/// Plain SQL formatter.
pub struct SqlFormatter;

impl Formatter for SqlFormatter {
    fn format_statement(&self, result: &QueryResult) -> String {
        let mut output = format!("{};", result.sql);
        for (name, value) in result.params.iter() {
            output.push_str(&format!("\n-- :{} = {}", name, render_value(value)));
        }
        output
    }

    fn format_entities(&self, entities: &[String]) -> String {
        if entities.is_empty() {
            "No entities".to_string()
        } else {
            entities.join("\n")
        }
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null | Value::TypedNull(_) => "NULL".to_string(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => serde_json::to_string(other)
            .map(|s| s.trim_matches('"').to_string())
            .unwrap_or_else(|_| other.type_name().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ontoql_proto::Parameters;
    use pretty_assertions::assert_eq;

    fn statement() -> QueryResult {
        let mut params = Parameters::new();
        params.insert("param_inn_1", Value::from("%7'7%"));
        params.insert("param_active_2", Value::Bool(true));
        params.insert("param_note_3", Value::Null);
        QueryResult::new(
            "SELECT t0.id AS id FROM customers t0 WHERE (CAST(t0.inn AS TEXT) ILIKE :param_inn_1 \
             AND t0.active = :param_active_2 AND t0.note = :param_note_3)",
            params,
            Vec::new(),
        )
    }

    #[test]
    fn test_sql_formatter() {
        let output = SqlFormatter.format_statement(&statement());

        assert_eq!(
            output,
            "SELECT t0.id AS id FROM customers t0 WHERE (CAST(t0.inn AS TEXT) ILIKE :param_inn_1 \
             AND t0.active = :param_active_2 AND t0.note = :param_note_3);\n\
             -- :param_inn_1 = '%7''7%'\n\
             -- :param_active_2 = true\n\
             -- :param_note_3 = NULL"
        );
    }

    #[test]
    fn test_json_formatter() {
        let output = JsonFormatter.format_statement(&statement());
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(parsed["params"]["param_active_2"], serde_json::json!(true));
        assert_eq!(parsed["params"]["param_note_3"], serde_json::Value::Null);
        assert_eq!(parsed["fields"], serde_json::json!([]));

        assert_eq!(
            JsonFormatter.format_entities(&["Customer".to_string()]),
            r#"{"entities":["Customer"]}"#
        );
    }
}
