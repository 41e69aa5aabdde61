//! Entry point of the query compiler.

use super::assembler::SqlAssembler;
use super::conditions::ConditionCompiler;
use super::config::CompilerConfig;
use super::context::QueryContext;
use super::resolver::PathResolver;
use super::typing::convert;
use crate::catalog::{EntitySchema, FieldKind, FieldSchema, OntologyAccessor};
use crate::error::Error;
use ontoql_proto::{Condition, FieldValue, ListRequest, QueryNode, QueryResult, SortSpec};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Name of the parameter holding the row id in updates and deletes.
///
/// The compiler never binds it; callers do, through [`QueryResult::bind`].
pub const ID_PARAM: &str = "id_param";

/// Compiles requests against an ontology into parameterized SQL.
///
/// Each call builds its own [`QueryContext`], so a builder can be shared and
/// used from several threads at once.
pub struct QueryBuilder<'a, A: OntologyAccessor + ?Sized> {
    accessor: &'a A,
    config: CompilerConfig,
}

impl<'a, A: OntologyAccessor + ?Sized> QueryBuilder<'a, A> {
    /// Create a builder with the default configuration.
    pub fn new(accessor: &'a A) -> Self {
        Self::with_config(accessor, CompilerConfig::default())
    }

    /// Create a builder with a custom configuration.
    pub fn with_config(accessor: &'a A, config: CompilerConfig) -> Self {
        Self { accessor, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Paginated, optionally sorted list query.
    ///
    /// Fields are resolved first, then the filter, then the sort, so aliases
    /// are numbered in that order.
    pub fn build_list(&self, entity: &str, request: &ListRequest) -> Result<QueryResult, Error> {
        let mut ctx = self.context(entity)?;

        self.project(&request.fields, &mut ctx)?;
        let filter = ConditionCompiler::new(self.accessor).compile(&request.filter, &mut ctx)?;
        ctx.push_where(filter);

        let order_by = match &request.sort {
            Some(sort) => Some(format!(
                "{} {}",
                self.sort_column(sort, &mut ctx)?,
                sort.direction.as_sql()
            )),
            None => None,
        };

        let limit = self.config.page_size(request.page_size);
        let offset = self.config.offset(request.page, limit);
        let sql = SqlAssembler::new(&ctx).list(order_by.as_deref(), limit, offset);

        Ok(self.finish(entity, "list", ctx, sql, true))
    }

    /// Number of root rows matching `filter`.
    pub fn build_count(&self, entity: &str, filter: &QueryNode) -> Result<QueryResult, Error> {
        let mut ctx = self.context(entity)?;

        let clause = ConditionCompiler::new(self.accessor).compile(filter, &mut ctx)?;
        ctx.push_where(clause);

        // Joins can multiply root rows.
        let distinct = if ctx.has_joins() {
            Some(primary_key_column(ctx.root())?)
        } else {
            None
        };
        let sql = SqlAssembler::new(&ctx).count(distinct.as_deref());

        Ok(self.finish(entity, "count", ctx, sql, false))
    }

    /// First row whose root fields equal the given values.
    ///
    /// A pair without a value matches NULL.
    pub fn build_single(
        &self,
        entity: &str,
        fields: &[String],
        equality_filters: &[FieldValue],
    ) -> Result<QueryResult, Error> {
        let mut ctx = self.context(entity)?;
        check_unique(ctx.root(), equality_filters)?;

        self.project(fields, &mut ctx)?;

        let node = equality_filters
            .iter()
            .fold(QueryNode::and(), |node, fv| {
                let condition = match &fv.value {
                    Some(value) => Condition::equals(fv.field.clone(), value.clone()),
                    None => Condition::new(fv.field.clone(), "is_null", None::<String>),
                };
                node.with_condition(condition)
            });
        let clause = ConditionCompiler::new(self.accessor).compile(&node, &mut ctx)?;
        ctx.push_where(clause);

        let sql = SqlAssembler::new(&ctx).single();
        Ok(self.finish(entity, "single", ctx, sql, true))
    }

    /// Primary keys of at most two rows matching `filter`.
    pub fn build_find_single_id(
        &self,
        entity: &str,
        filter: &QueryNode,
    ) -> Result<QueryResult, Error> {
        let mut ctx = self.context(entity)?;
        let pk = primary_key_column(ctx.root())?;

        let clause = ConditionCompiler::new(self.accessor).compile(filter, &mut ctx)?;
        ctx.push_where(clause);

        let sql = SqlAssembler::new(&ctx).find_single_id(&pk);
        Ok(self.finish(entity, "find_single_id", ctx, sql, false))
    }

    /// Insert one row into the entity's primary table.
    pub fn build_insert(&self, entity: &str, values: &[FieldValue]) -> Result<QueryResult, Error> {
        let mut ctx = self.context(entity)?;
        let root = Arc::clone(ctx.root());
        check_unique(&root, values)?;

        let columns = bind_columns(&root, values, &mut ctx)?;
        let sql = SqlAssembler::insert(&root.table, &columns);

        Ok(self.finish(entity, "insert", ctx, sql, false))
    }

    /// Update one row identified by `id_field`; the id is bound as [`ID_PARAM`].
    pub fn build_update(
        &self,
        entity: &str,
        values: &[FieldValue],
        id_field: &str,
    ) -> Result<QueryResult, Error> {
        let mut ctx = self.context(entity)?;
        let root = Arc::clone(ctx.root());

        if values.is_empty() {
            return Err(Error::NoUpdatableFieldsSupplied(root.name.clone()));
        }
        check_unique(&root, values)?;
        if let Some(pk) = values
            .iter()
            .filter_map(|fv| root.get_field(&fv.field))
            .find(|f| f.is_primary_key())
        {
            return Err(Error::PrimaryKeyImmutable {
                entity: root.name.clone(),
                field: pk.name.clone(),
            });
        }

        let (_, id_column) = own_column(&root, id_field)?;
        let columns = bind_columns(&root, values, &mut ctx)?;
        let sql = SqlAssembler::update(&root.table, &columns, id_column, ID_PARAM);

        Ok(self.finish(entity, "update", ctx, sql, false))
    }

    /// Delete one row identified by `id_field`; the id is bound as [`ID_PARAM`].
    pub fn build_delete(&self, entity: &str, id_field: &str) -> Result<QueryResult, Error> {
        let ctx = self.context(entity)?;
        let root = Arc::clone(ctx.root());

        let (_, id_column) = own_column(&root, id_field)?;
        let sql = SqlAssembler::delete(&root.table, id_column, ID_PARAM);

        Ok(self.finish(entity, "delete", ctx, sql, false))
    }

    fn context(&self, entity: &str) -> Result<QueryContext, Error> {
        let schema = self.accessor.entity_schema(entity)?;
        Ok(QueryContext::new(schema, &self.config))
    }

    /// Resolve the projection; no requested fields means every bound root field.
    fn project(&self, fields: &[String], ctx: &mut QueryContext) -> Result<(), Error> {
        let resolver = PathResolver::new(self.accessor);

        let paths: Vec<String> = if fields.is_empty() {
            ctx.root().bound_fields().map(|f| f.name.clone()).collect()
        } else {
            fields.to_vec()
        };
        if paths.is_empty() {
            return Err(Error::unresolvable(
                ctx.root().name.clone(),
                "",
                "entity has no bound fields to select",
            ));
        }

        for path in &paths {
            let resolved = resolver.resolve(path, ctx)?;
            ctx.add_field(resolved.info);
        }
        Ok(())
    }

    /// Sort column: the resolved path, or else a plain column of the root's
    /// primary table with that field name.
    fn sort_column(&self, sort: &SortSpec, ctx: &mut QueryContext) -> Result<String, Error> {
        let err = match PathResolver::new(self.accessor).resolve(&sort.field, ctx) {
            Ok(resolved) => return Ok(resolved.info.qualified_column()),
            Err(err) => err,
        };

        let root = ctx.root();
        let column = root
            .get_field(&sort.field)
            .filter(|f| root.owns_column(f))
            .and_then(|f| match f.kind() {
                FieldKind::Column(binding) => Some(binding.column.as_str()),
                _ => None,
            });
        match column {
            Some(column) => Ok(format!("{}.{}", ctx.root_alias(), column)),
            None => Err(Error::SortFieldUnresolvable {
                path: sort.field.clone(),
                reason: err.to_string(),
            }),
        }
    }

    fn finish(
        &self,
        entity: &str,
        kind: &'static str,
        ctx: QueryContext,
        sql: String,
        with_fields: bool,
    ) -> QueryResult {
        debug!(
            entity,
            kind,
            joins = ctx.joins().len(),
            params = ctx.params().len(),
            "Compiled statement"
        );
        ctx.finish(sql, with_fields)
    }
}

/// Column of the root's single primary-key field.
fn primary_key_column(root: &EntitySchema) -> Result<String, Error> {
    let pk = root.primary_key_field()?;
    pk.column()
        .map(str::to_string)
        .ok_or_else(|| Error::NoPrimaryKeyDefined {
            entity: root.name.clone(),
            found: 0,
        })
}

/// Look up a field stored in the root's primary table, with its column.
fn own_column<'s>(root: &'s EntitySchema, name: &str) -> Result<(&'s FieldSchema, &'s str), Error> {
    let field = root.get_field(name).ok_or_else(|| {
        Error::unresolvable(
            name,
            name,
            format!("entity '{}' has no field of that name", root.name),
        )
    })?;
    let binding = field
        .db
        .as_ref()
        .ok_or_else(|| Error::unresolvable(name, name, "field has no database binding"))?;

    if binding.relation_name.is_some() || !root.owns_column(field) {
        return Err(Error::ForeignTableFieldRejected {
            entity: root.name.clone(),
            field: field.name.clone(),
            table: binding.table.clone(),
        });
    }
    Ok((field, binding.column.as_str()))
}

/// Type and bind each value; returns `(column, parameter)` pairs in input order.
fn bind_columns(
    root: &EntitySchema,
    values: &[FieldValue],
    ctx: &mut QueryContext,
) -> Result<Vec<(String, String)>, Error> {
    let mut columns = Vec::with_capacity(values.len());
    for fv in values {
        let (field, column) = own_column(root, &fv.field)?;
        let value = convert(fv.value.as_deref(), &field.logical_type)
            .map_err(|e| e.for_field(&fv.field))?;

        let param = ctx.next_param_name(&field.name);
        ctx.bind(param.clone(), value);
        columns.push((column.to_string(), param));
    }
    Ok(columns)
}

fn check_unique(root: &EntitySchema, values: &[FieldValue]) -> Result<(), Error> {
    let mut seen = HashSet::new();
    for fv in values {
        if !seen.insert(fv.field.as_str()) {
            return Err(Error::DuplicateField {
                entity: root.name.clone(),
                field: fv.field.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{LogicalType, RelationSchema, SchemaBundle};
    use ontoql_proto::{SortSpec, Value};
    use pretty_assertions::assert_eq;

    fn sample_schema() -> SchemaBundle {
        let customer = EntitySchema::new("Customer", "customers")
            .with_field(
                FieldSchema::new("id", LogicalType::Uuid)
                    .with_column("customers", "id")
                    .primary_key(),
            )
            .with_field(
                FieldSchema::new("name", LogicalType::String)
                    .with_column("customers", "name"),
            );

        let order = EntitySchema::new("Order", "orders")
            .with_field(
                FieldSchema::new("id", LogicalType::Long)
                    .with_column("orders", "id")
                    .primary_key(),
            )
            .with_field(
                FieldSchema::new("status", LogicalType::String)
                    .with_column("orders", "status"),
            )
            .with_field(
                FieldSchema::new("customer_name", LogicalType::String)
                    .with_column("customers", "name")
                    .via_relation("customer"),
            )
            .with_relation(RelationSchema::new(
                "customer",
                "Customer",
                ("orders", "customer_id"),
                ("customers", "id"),
            ));

        SchemaBundle::new(1).with_entity(customer).with_entity(order)
    }

    #[test]
    fn test_list_defaults_to_bound_root_fields() {
        let schema = sample_schema();
        let result = QueryBuilder::new(&schema)
            .build_list("Order", &ListRequest::new())
            .unwrap();

        assert_eq!(
            result.sql,
            "SELECT t0.id AS id, t0.status AS status, t1.name AS customer_name FROM orders t0 \
             LEFT JOIN customers t1 ON t0.customer_id = t1.id LIMIT 20 OFFSET 0"
        );
        assert_eq!(result.fields.len(), 3);
        assert!(result.params.is_empty());
    }

    #[test]
    fn test_sort_falls_back_to_root_field() {
        let schema = sample_schema();
        let builder = QueryBuilder::new(&schema);

        let request = ListRequest::new()
            .with_fields(["status"])
            .with_sort(SortSpec::desc("status"));
        let result = builder.build_list("Order", &request).unwrap();
        assert!(result.sql.contains("ORDER BY t0.status DESC"), "{}", result.sql);

        let request = ListRequest::new()
            .with_fields(["status"])
            .with_sort(SortSpec::asc("missing"));
        assert!(matches!(
            builder.build_list("Order", &request),
            Err(Error::SortFieldUnresolvable { path, .. }) if path == "missing"
        ));
    }

    #[test]
    fn test_sort_fallback_skips_proxy_fields() {
        let mut schema = sample_schema();
        let order = schema.entities.remove("Order").unwrap().with_field(
            FieldSchema::new("customer_code", LogicalType::String)
                .with_column("customers", "code")
                .via_relation("customer"),
        );
        schema = schema.with_entity(order);

        let request = ListRequest::new()
            .with_fields(["status"])
            .with_sort(SortSpec::asc("customer_code"));
        assert!(matches!(
            QueryBuilder::new(&schema).build_list("Order", &request),
            Err(Error::SortFieldUnresolvable { path, .. }) if path == "customer_code"
        ));
    }

    #[test]
    fn test_single_with_null_equality() {
        let schema = sample_schema();
        let result = QueryBuilder::new(&schema)
            .build_single(
                "Order",
                &["id".to_string()],
                &[FieldValue::new("status", "new"), FieldValue::null("customer_name")],
            )
            .unwrap();

        assert_eq!(
            result.sql,
            "SELECT t0.id AS id FROM orders t0 LEFT JOIN customers t1 ON t0.customer_id = t1.id \
             WHERE (t0.status = :param_status_1 AND t1.name IS NULL) LIMIT 1"
        );
        assert_eq!(result.params.get("param_status_1"), Some(&Value::from("new")));
    }

    #[test]
    fn test_delete_binds_nothing() {
        let schema = sample_schema();
        let result = QueryBuilder::new(&schema).build_delete("Order", "id").unwrap();

        assert_eq!(result.sql, "DELETE FROM orders WHERE id = :id_param");
        assert!(result.params.is_empty());

        let bound = result.bind(ID_PARAM, 7i64);
        assert_eq!(bound.params.get(ID_PARAM), Some(&Value::Int64(7)));
    }

    #[test]
    fn test_unknown_entity() {
        let schema = sample_schema();
        assert!(matches!(
            QueryBuilder::new(&schema).build_count("Invoice", &QueryNode::and()),
            Err(Error::EntityNotFound(name)) if name == "Invoice"
        ));
    }
}
