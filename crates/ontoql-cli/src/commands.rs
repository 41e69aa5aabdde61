//! Command execution.

use crate::config::Command;
use anyhow::{bail, Context};
use ontoql_core::catalog::{Catalog, EntitySchema, OntologyAccessor, SchemaBundle};
use ontoql_core::query::{convert, CompilerConfig, QueryBuilder, ID_PARAM};
use ontoql_core::Error;
use ontoql_proto::{ListRequest, QueryNode, QueryResult, SortSpec};
use std::path::Path;
use tracing::info;

/// Where entity schemas come from.
pub enum OntologySource {
    /// An ontology loaded from a JSON file.
    File(SchemaBundle),
    /// A versioned sled catalog.
    Catalog(Catalog),
}

impl OntologySource {
    /// Load an ontology JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading ontology {}", path.display()))?;
        let bundle = SchemaBundle::from_json(&json)
            .with_context(|| format!("loading ontology {}", path.display()))?;
        Ok(OntologySource::File(bundle))
    }

    /// Open a catalog directory.
    pub fn from_catalog(path: &Path) -> anyhow::Result<Self> {
        let catalog = Catalog::open_path(path)
            .with_context(|| format!("opening catalog {}", path.display()))?;
        Ok(OntologySource::Catalog(catalog))
    }

    fn entity_names(&self) -> Vec<String> {
        match self {
            OntologySource::File(bundle) => {
                bundle.entity_names().into_iter().map(String::from).collect()
            }
            OntologySource::Catalog(catalog) => catalog.list_entities(),
        }
    }
}

impl OntologyAccessor for OntologySource {
    fn entity_schema(&self, name: &str) -> Result<EntitySchema, Error> {
        match self {
            OntologySource::File(bundle) => bundle.entity_schema(name),
            OntologySource::Catalog(catalog) => catalog.entity_schema(name),
        }
    }
}

/// Result of a command.
#[derive(Debug)]
pub enum Output {
    /// A compiled statement.
    Statement(QueryResult),
    /// Entity names.
    Entities(Vec<String>),
    /// A status message.
    Message(String),
}

/// Run a command against an ontology source.
pub fn execute(
    command: &Command,
    source: &OntologySource,
    config: CompilerConfig,
) -> anyhow::Result<Output> {
    let builder = QueryBuilder::with_config(source, config);

    let result = match command {
        Command::List {
            entity,
            fields,
            filter,
            page,
            page_size,
            sort,
            direction,
        } => {
            let mut request = ListRequest::new()
                .with_fields(fields.iter().cloned())
                .with_filter(parse_filter(filter.as_deref())?)
                .with_page(*page, *page_size);
            if let Some(field) = sort {
                request = request.with_sort(SortSpec {
                    field: field.clone(),
                    direction: direction.parse().map_err(Error::from)?,
                });
            }
            builder.build_list(entity, &request)?
        }
        Command::Count { entity, filter } => {
            builder.build_count(entity, &parse_filter(filter.as_deref())?)?
        }
        Command::Single {
            entity,
            fields,
            conditions,
        } => builder.build_single(entity, fields, conditions)?,
        Command::FindId { entity, filter } => {
            builder.build_find_single_id(entity, &parse_filter(filter.as_deref())?)?
        }
        Command::Insert { entity, values } => builder.build_insert(entity, values)?,
        Command::Update {
            entity,
            values,
            id_field,
            id,
        } => {
            let result = builder.build_update(entity, values, id_field)?;
            bind_id(source, result, entity, id_field, id.as_deref())?
        }
        Command::Delete {
            entity,
            id_field,
            id,
        } => {
            let result = builder.build_delete(entity, id_field)?;
            bind_id(source, result, entity, id_field, id.as_deref())?
        }
        Command::Entities => return Ok(Output::Entities(source.entity_names())),
        Command::Import { .. } => bail!("import needs a catalog; pass --catalog"),
    };

    Ok(Output::Statement(result))
}

/// Store an ontology file as the next version of a catalog.
pub fn import(catalog: &Catalog, file: &Path) -> anyhow::Result<Output> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("reading ontology {}", file.display()))?;
    let bundle = SchemaBundle::from_json(&json)?;
    let version = catalog.apply_schema(bundle)?;
    catalog.flush()?;

    info!(version, file = %file.display(), "Imported ontology");
    Ok(Output::Message(format!(
        "Imported {} as version {}",
        file.display(),
        version
    )))
}

/// Parse a filter argument: inline JSON or `@path`.
fn parse_filter(raw: Option<&str>) -> anyhow::Result<QueryNode> {
    let Some(raw) = raw else {
        return Ok(QueryNode::and());
    };

    let json = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading filter {}", path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&json).context("parsing filter JSON")
}

/// Bind the row id, typed like the id field.
fn bind_id(
    source: &OntologySource,
    result: QueryResult,
    entity: &str,
    id_field: &str,
    id: Option<&str>,
) -> anyhow::Result<QueryResult> {
    let Some(id) = id else {
        return Ok(result);
    };

    let schema = source.entity_schema(entity)?;
    let field = schema
        .get_field(id_field)
        .with_context(|| format!("entity '{}' has no field '{}'", entity, id_field))?;
    let value = convert(Some(id), &field.logical_type).map_err(|e| e.for_field(id_field))?;
    Ok(result.bind(ID_PARAM, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_field_value;
    use ontoql_proto::Value;
    use pretty_assertions::assert_eq;

    const SALES_ONTOLOGY: &str = include_str!("../../../demos/sales_ontology.json");

    fn source() -> OntologySource {
        OntologySource::File(SchemaBundle::from_json(SALES_ONTOLOGY).unwrap())
    }

    fn statement(output: Output) -> QueryResult {
        match output {
            Output::Statement(result) => result,
            other => panic!("expected a statement, got {:?}", other),
        }
    }

    #[test]
    fn test_list_with_inline_filter() {
        let command = Command::List {
            entity: "Order".into(),
            fields: vec!["number".into()],
            filter: Some(
                r#"{"conditions": [{"field": "status", "operator": "equals", "value": "new"}]}"#
                    .into(),
            ),
            page: 0,
            page_size: 0,
            sort: Some("placed_at".into()),
            direction: "DESC".into(),
        };

        let result = statement(execute(&command, &source(), CompilerConfig::default()).unwrap());

        assert_eq!(
            result.sql,
            "SELECT t0.number AS number FROM sales.orders t0 WHERE (t0.status = :param_status_1) \
             ORDER BY t0.placed_at DESC LIMIT 20 OFFSET 0"
        );
    }

    #[test]
    fn test_bad_direction_is_rejected() {
        let command = Command::List {
            entity: "Order".into(),
            fields: Vec::new(),
            filter: None,
            page: 0,
            page_size: 0,
            sort: Some("number".into()),
            direction: "sideways".into(),
        };

        assert!(execute(&command, &source(), CompilerConfig::default()).is_err());
    }

    #[test]
    fn test_update_binds_typed_id() {
        let command = Command::Update {
            entity: "Order".into(),
            values: vec![parse_field_value("status=shipped").unwrap()],
            id_field: "id".into(),
            id: Some("42".into()),
        };

        let result = statement(execute(&command, &source(), CompilerConfig::default()).unwrap());

        assert_eq!(result.params.get(ID_PARAM), Some(&Value::Int64(42)));
    }

    #[test]
    fn test_delete_with_invalid_id() {
        let command = Command::Delete {
            entity: "Customer".into(),
            id_field: "id".into(),
            id: Some("not-a-uuid".into()),
        };

        assert!(execute(&command, &source(), CompilerConfig::default()).is_err());
    }

    #[test]
    fn test_import_and_list_entities() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("sales.json");
        std::fs::write(&file, SALES_ONTOLOGY).unwrap();

        let catalog = Catalog::open_path(dir.path().join("catalog")).unwrap();
        match import(&catalog, &file).unwrap() {
            Output::Message(message) => assert!(message.ends_with("as version 1"), "{}", message),
            other => panic!("unexpected output {:?}", other),
        }

        let source = OntologySource::Catalog(catalog);
        match execute(&Command::Entities, &source, CompilerConfig::default()).unwrap() {
            Output::Entities(names) => {
                assert_eq!(names, vec!["Customer", "Order", "OrderLine", "Region"])
            }
            other => panic!("unexpected output {:?}", other),
        }
    }
}
