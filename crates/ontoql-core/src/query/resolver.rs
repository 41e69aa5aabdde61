//! Field path resolution.
//!
//! A path such as `order.customer.name` is walked segment by segment from the
//! root entity. Fields are looked up before relations; every relation crossed
//! registers (or reuses) one LEFT JOIN keyed by the relation names traversed
//! so far. Relation-proxy fields are rewritten into `relation.target_field`
//! and resolved like any other path.

use super::context::QueryContext;
use crate::catalog::{
    EntitySchema, FieldKind, FieldSchema, LogicalType, OntologyAccessor, RelationSchema,
};
use crate::error::Error;
use ontoql_proto::FieldInfo;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// A resolved path: where the column lives and how to type its values.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    /// Projection descriptor of the leaf column.
    pub info: FieldInfo,
    /// Logical type of the leaf field.
    pub logical_type: LogicalType,
}

/// What one segment does to the walk.
#[derive(Debug)]
enum Step {
    /// A bound column of the current entity.
    Leaf {
        field: String,
        column: String,
        logical_type: LogicalType,
    },
    /// Replace the segment with `relation` followed by `target_field`.
    Splice {
        relation: String,
        target_field: String,
    },
    /// Cross into the relation's target entity.
    Traverse(RelationSchema),
}

/// Resolves dotted field paths against the ontology.
pub struct PathResolver<'a, A: OntologyAccessor + ?Sized> {
    accessor: &'a A,
}

impl<'a, A: OntologyAccessor + ?Sized> PathResolver<'a, A> {
    /// Create a resolver reading schemas from `accessor`.
    pub fn new(accessor: &'a A) -> Self {
        Self { accessor }
    }

    /// Resolve `full_path` from the root of `ctx`, registering any joins it needs.
    pub fn resolve(&self, full_path: &str, ctx: &mut QueryContext) -> Result<Resolved, Error> {
        if full_path.trim().is_empty() {
            return Err(Error::unresolvable(full_path, "", "empty field path"));
        }

        let mut pending: VecDeque<String> = full_path.split('.').map(str::to_string).collect();
        if pending.iter().any(|s| s.is_empty()) {
            return Err(Error::unresolvable(full_path, "", "empty path segment"));
        }

        let mut schema = Arc::clone(ctx.root());
        let mut alias = ctx.root_alias().to_string();
        let mut path_key = String::new();
        let mut last_segment = String::new();
        let mut steps = 0usize;

        while let Some(segment) = pending.pop_front() {
            steps += 1;
            if steps > ctx.max_path_steps() {
                return Err(Error::unresolvable(
                    full_path,
                    segment,
                    format!("exceeded {} resolution steps", ctx.max_path_steps()),
                ));
            }

            match self.classify(&schema, &segment, full_path)? {
                Step::Leaf {
                    field,
                    column,
                    logical_type,
                } => {
                    if !pending.is_empty() {
                        return Err(Error::unresolvable(
                            full_path,
                            segment,
                            "scalar field cannot have nested segments",
                        ));
                    }
                    let info = FieldInfo {
                        entity: schema.display_name().to_string(),
                        field,
                        full_path: full_path.to_string(),
                        table_alias: alias,
                        column,
                        column_alias: full_path.replace('.', "_"),
                    };
                    return Ok(Resolved { info, logical_type });
                }
                Step::Splice {
                    relation,
                    target_field,
                } => {
                    trace!(
                        path = full_path,
                        %segment,
                        %relation,
                        %target_field,
                        "Spliced relation-proxy field"
                    );
                    pending.push_front(target_field);
                    pending.push_front(relation);
                }
                Step::Traverse(relation) => {
                    if !path_key.is_empty() {
                        path_key.push('.');
                    }
                    path_key.push_str(&relation.name);

                    let next_alias = match ctx.join_alias(&path_key) {
                        Some(existing) => {
                            trace!(path_key = %path_key, alias = existing, "Reused join");
                            existing.to_string()
                        }
                        None => {
                            let next = ctx.next_alias();
                            let sql = join_sql(&relation, &alias, &next);
                            trace!(path_key = %path_key, alias = %next, "Registered join");
                            ctx.register_join(path_key.clone(), next.clone(), sql);
                            next
                        }
                    };

                    schema = Arc::new(self.target_schema(&relation, full_path)?);
                    alias = next_alias;
                    last_segment = segment;
                }
            }
        }

        Err(Error::unresolvable(
            full_path,
            last_segment,
            "path ends on a relation, not a field",
        ))
    }

    fn classify(
        &self,
        schema: &EntitySchema,
        segment: &str,
        full_path: &str,
    ) -> Result<Step, Error> {
        if let Some(field) = schema.get_field(segment) {
            return match field.kind() {
                FieldKind::Unbound => Err(Error::unresolvable(
                    full_path,
                    segment,
                    "field has no database binding",
                )),
                FieldKind::Column(binding) => Ok(Step::Leaf {
                    field: field.name.clone(),
                    column: binding.column.clone(),
                    logical_type: field.logical_type.clone(),
                }),
                FieldKind::RelationProxy { binding, relation } => {
                    let rel = schema
                        .get_relation(relation)
                        .ok_or_else(|| Error::RelationNotFound {
                            entity: schema.name.clone(),
                            relation: relation.to_string(),
                            path: full_path.to_string(),
                        })?;
                    let target = self.target_schema(rel, full_path)?;

                    let bound_to_column =
                        |f: &&FieldSchema| f.column() == Some(binding.column.as_str());
                    let target_field = target
                        .fields
                        .iter()
                        .filter(bound_to_column)
                        .find(|f| matches!(f.kind(), FieldKind::Column(_)))
                        .or_else(|| target.fields.iter().find(bound_to_column))
                        .ok_or_else(|| {
                            Error::unresolvable(
                                full_path,
                                segment,
                                format!(
                                    "no field of entity '{}' is bound to column '{}'",
                                    target.name, binding.column
                                ),
                            )
                        })?;

                    Ok(Step::Splice {
                        relation: rel.name.clone(),
                        target_field: target_field.name.clone(),
                    })
                }
            };
        }

        match schema.get_relation(segment) {
            Some(relation) => Ok(Step::Traverse(relation.clone())),
            None => Err(Error::unresolvable(
                full_path,
                segment,
                format!("entity '{}' has no field or relation of that name", schema.name),
            )),
        }
    }

    /// Schema of a relation's target entity; a missing target is reported
    /// against the path being resolved.
    fn target_schema(
        &self,
        relation: &RelationSchema,
        full_path: &str,
    ) -> Result<EntitySchema, Error> {
        self.accessor
            .entity_schema(&relation.target_entity)
            .map_err(|e| match e {
                Error::EntityNotFound(target) => Error::unresolvable(
                    full_path,
                    relation.name.as_str(),
                    format!("target entity '{}' of the relation does not exist", target),
                ),
                other => other,
            })
    }
}

fn join_sql(relation: &RelationSchema, from_alias: &str, alias: &str) -> String {
    let mut sql = format!(
        "LEFT JOIN {} {} ON {}.{} = {}.{}",
        relation.target_table,
        alias,
        from_alias,
        relation.source_column,
        alias,
        relation.target_column
    );
    if let Some(extra) = relation.join_condition_for(alias) {
        sql.push_str(" AND ");
        sql.push_str(&extra);
    }
    sql
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaBundle;
    use crate::query::CompilerConfig;
    use pretty_assertions::assert_eq;

    fn sample_schema() -> SchemaBundle {
        let customer = EntitySchema::new("Customer", "customers")
            .with_display_name("Customers")
            .with_field(
                FieldSchema::new("id", LogicalType::Uuid)
                    .with_column("customers", "id")
                    .primary_key(),
            )
            .with_field(
                FieldSchema::new("name", LogicalType::String)
                    .with_column("customers", "name"),
            )
            .with_field(
                FieldSchema::new("inn", LogicalType::String)
                    .with_column("customers", "inn"),
            )
            .with_relation(RelationSchema::new(
                "region",
                "Region",
                ("customers", "region_id"),
                ("regions", "id"),
            ));

        let region = EntitySchema::new("Region", "regions")
            .with_field(
                FieldSchema::new("id", LogicalType::Long)
                    .with_column("regions", "id")
                    .primary_key(),
            )
            .with_field(
                FieldSchema::new("title", LogicalType::String)
                    .with_column("regions", "title"),
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
            .with_field(FieldSchema::new("note", LogicalType::Text))
            .with_relation(
                RelationSchema::new(
                    "customer",
                    "Customer",
                    ("orders", "customer_id"),
                    ("customers", "id"),
                )
                .with_join_condition("{alias}.deleted = false"),
            );

        SchemaBundle::new(1)
            .with_entity(customer)
            .with_entity(region)
            .with_entity(order)
    }

    fn context(schema: &SchemaBundle, entity: &str) -> QueryContext {
        QueryContext::new(
            schema.entity_schema(entity).unwrap(),
            &CompilerConfig::default(),
        )
    }

    #[test]
    fn test_simple_path_uses_root_alias() {
        let schema = sample_schema();
        let mut ctx = context(&schema, "Order");

        let resolved = PathResolver::new(&schema).resolve("status", &mut ctx).unwrap();

        assert_eq!(resolved.info.table_alias, "t0");
        assert_eq!(resolved.info.column, "status");
        assert_eq!(resolved.info.column_alias, "status");
        assert_eq!(resolved.logical_type, LogicalType::String);
        assert!(!ctx.has_joins());
    }

    #[test]
    fn test_relation_path_registers_join_once() {
        let schema = sample_schema();
        let mut ctx = context(&schema, "Order");
        let resolver = PathResolver::new(&schema);

        let name = resolver.resolve("customer.name", &mut ctx).unwrap();
        let inn = resolver.resolve("customer.inn", &mut ctx).unwrap();

        assert_eq!(name.info.table_alias, "t1");
        assert_eq!(inn.info.table_alias, "t1");
        assert_eq!(name.info.entity, "Customers");
        assert_eq!(name.info.column_alias, "customer_name");
        assert_eq!(ctx.joins().len(), 1);
        assert_eq!(
            ctx.joins()[0].sql,
            "LEFT JOIN customers t1 ON t0.customer_id = t1.id AND t1.deleted = false"
        );
    }

    #[test]
    fn test_nested_relations() {
        let schema = sample_schema();
        let mut ctx = context(&schema, "Order");

        let resolved = PathResolver::new(&schema)
            .resolve("customer.region.title", &mut ctx)
            .unwrap();

        assert_eq!(resolved.info.table_alias, "t2");
        let keys: Vec<&str> = ctx.joins().iter().map(|j| j.path_key.as_str()).collect();
        assert_eq!(keys, vec!["customer", "customer.region"]);
        assert_eq!(ctx.joins()[1].sql, "LEFT JOIN regions t2 ON t1.region_id = t2.id");
    }

    #[test]
    fn test_relation_proxy_shares_join() {
        let schema = sample_schema();
        let mut ctx = context(&schema, "Order");
        let resolver = PathResolver::new(&schema);

        let proxy = resolver.resolve("customer_name", &mut ctx).unwrap();
        let direct = resolver.resolve("customer.name", &mut ctx).unwrap();

        assert_eq!(proxy.info.table_alias, "t1");
        assert_eq!(proxy.info.column, "name");
        assert_eq!(proxy.info.field, "name");
        assert_eq!(proxy.info.full_path, "customer_name");
        assert_eq!(direct.info.table_alias, "t1");
        assert_eq!(ctx.joins().len(), 1);
    }

    #[test]
    fn test_unresolvable_paths() {
        let schema = sample_schema();
        let mut ctx = context(&schema, "Order");
        let resolver = PathResolver::new(&schema);

        for path in ["missing", "status.length", "customer", "note", "", "customer..name"] {
            assert!(
                matches!(
                    resolver.resolve(path, &mut ctx),
                    Err(Error::FieldPathUnresolvable { .. })
                ),
                "path {:?} should not resolve",
                path
            );
        }
    }

    #[test]
    fn test_proxy_with_missing_relation() {
        let schema = SchemaBundle::new(1).with_entity(
            EntitySchema::new("Order", "orders").with_field(
                FieldSchema::new("customer_name", LogicalType::String)
                    .with_column("customers", "name")
                    .via_relation("customer"),
            ),
        );
        let mut ctx = context(&schema, "Order");

        assert!(matches!(
            PathResolver::new(&schema).resolve("customer_name", &mut ctx),
            Err(Error::RelationNotFound { relation, .. }) if relation == "customer"
        ));
    }

    #[test]
    fn test_missing_relation_target_names_the_path() {
        let schema = SchemaBundle::new(1).with_entity(
            EntitySchema::new("Order", "orders")
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
                )),
        );
        let resolver = PathResolver::new(&schema);

        for path in ["customer.name", "customer_name"] {
            let mut ctx = context(&schema, "Order");
            match resolver.resolve(path, &mut ctx) {
                Err(Error::FieldPathUnresolvable {
                    path: reported,
                    segment,
                    reason,
                }) => {
                    assert_eq!(reported, path);
                    assert_eq!(segment, "customer");
                    assert!(reason.contains("'Customer'"), "{}", reason);
                }
                other => panic!("expected unresolvable path, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_cyclic_proxies_hit_step_ceiling() {
        let a = EntitySchema::new("A", "a")
            .with_field(
                FieldSchema::new("x", LogicalType::String)
                    .with_column("b", "x")
                    .via_relation("b"),
            )
            .with_relation(RelationSchema::new("b", "B", ("a", "b_id"), ("b", "id")));
        let b = EntitySchema::new("B", "b")
            .with_field(
                FieldSchema::new("x", LogicalType::String)
                    .with_column("a", "x")
                    .via_relation("a"),
            )
            .with_relation(RelationSchema::new("a", "A", ("b", "a_id"), ("a", "id")));
        let schema = SchemaBundle::new(1).with_entity(a).with_entity(b);
        let mut ctx = context(&schema, "A");

        let err = PathResolver::new(&schema).resolve("x", &mut ctx).unwrap_err();
        assert!(err.to_string().contains("resolution steps"), "{}", err);
    }
}
