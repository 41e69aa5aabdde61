//! Integration tests for query compilation against a stored ontology.

use ontoql_core::catalog::{
    Catalog, EntitySchema, FieldSchema, LogicalType, RelationSchema, SchemaBundle,
};
use ontoql_core::query::{CompilerConfig, QueryBuilder, ID_PARAM};
use ontoql_core::Error;
use ontoql_proto::{Condition, FieldValue, ListRequest, QueryNode, SortSpec, Value, ValueKind};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;

const SALES_ONTOLOGY: &str = include_str!("../../../demos/sales_ontology.json");

struct TestContext {
    catalog: Catalog,
    _catalog_db: sled::Db,
}

impl TestContext {
    fn new() -> Self {
        let catalog_db = sled::Config::new().temporary(true).open().unwrap();
        let catalog = Catalog::open(&catalog_db).unwrap();
        catalog
            .apply_schema(SchemaBundle::from_json(SALES_ONTOLOGY).unwrap())
            .unwrap();

        Self {
            catalog,
            _catalog_db: catalog_db,
        }
    }

    fn builder(&self) -> QueryBuilder<'_, Catalog> {
        QueryBuilder::new(&self.catalog)
    }
}

#[test]
fn test_simple_list_has_no_joins() {
    let ctx = TestContext::new();
    let request = ListRequest::new().with_fields(["number", "status"]);

    let result = ctx.builder().build_list("Order", &request).unwrap();

    assert_eq!(
        result.sql,
        "SELECT t0.number AS number, t0.status AS status FROM sales.orders t0 LIMIT 20 OFFSET 0"
    );
    let aliases: Vec<&str> = result.fields.iter().map(|f| f.table_alias.as_str()).collect();
    assert_eq!(aliases, vec!["t0", "t0"]);
    assert_eq!(result.fields[0].entity, "Orders");
}

#[test]
fn test_relation_reused_across_fields_and_filter() {
    let ctx = TestContext::new();
    let request = ListRequest::new()
        .with_fields(["number", "customer.name", "customer.inn"])
        .with_filter(QueryNode::and().with_condition(Condition::contains("customer.inn", "77")));

    let result = ctx.builder().build_list("Order", &request).unwrap();

    assert_eq!(
        result.sql,
        "SELECT t0.number AS number, t1.name AS customer_name, t1.inn AS customer_inn \
         FROM sales.orders t0 LEFT JOIN sales.customers t1 ON t0.customer_id = t1.id \
         WHERE (CAST(t1.inn AS TEXT) ILIKE :param_customer_inn_1) LIMIT 20 OFFSET 0"
    );
    assert_eq!(
        result.params.get("param_customer_inn_1"),
        Some(&Value::String("%77%".into()))
    );
}

#[test]
fn test_nested_path_with_join_condition() {
    let ctx = TestContext::new();
    let request = ListRequest::new()
        .with_fields(["number", "lines.product", "customer.region.title"])
        .with_sort(SortSpec::desc("lines.amount"))
        .with_page(2, 5000);

    let result = ctx.builder().build_list("Order", &request).unwrap();

    assert_eq!(
        result.sql,
        "SELECT t0.number AS number, t1.product AS lines_product, t3.title AS customer_region_title \
         FROM sales.orders t0 \
         LEFT JOIN sales.order_lines t1 ON t0.id = t1.order_id AND t1.deleted = false \
         LEFT JOIN sales.customers t2 ON t0.customer_id = t2.id \
         LEFT JOIN sales.regions t3 ON t2.region_id = t3.id \
         ORDER BY t1.amount DESC LIMIT 1000 OFFSET 2000"
    );
    assert_eq!(result.fields[2].entity, "Regions");
}

#[test]
fn test_relation_proxy_field() {
    let ctx = TestContext::new();
    let request = ListRequest::new()
        .with_fields(["number", "customer_name"])
        .with_filter(QueryNode::and().with_condition(Condition::equals("customer.name", "ACME")));

    let result = ctx.builder().build_list("Order", &request).unwrap();

    assert_eq!(
        result.sql,
        "SELECT t0.number AS number, t1.name AS customer_name \
         FROM sales.orders t0 LEFT JOIN sales.customers t1 ON t0.customer_id = t1.id \
         WHERE (t1.name = :param_customer_name_1) LIMIT 20 OFFSET 0"
    );
    assert_eq!(result.fields[1].field, "name");
    assert_eq!(result.fields[1].entity, "Customers");
}

#[test]
fn test_or_groups_and_typed_params() {
    let ctx = TestContext::new();
    let filter = QueryNode::and()
        .with_condition(Condition::greater_than("total", "100.50"))
        .with_group(
            QueryNode::or()
                .with_condition(Condition::equals("status", "new"))
                .with_condition(Condition::new(
                    "placed_at",
                    "greater_than_or_equal",
                    Some("2024-01-01"),
                )),
        )
        .with_group(QueryNode::or());

    let result = ctx.builder().build_count("Order", &filter).unwrap();

    assert_eq!(
        result.sql,
        "SELECT COUNT(*) FROM sales.orders t0 WHERE (t0.total > :param_total_1 AND \
         (t0.status = :param_status_2 OR t0.placed_at >= :param_placed_at_3))"
    );
    assert_eq!(
        result.params.get("param_total_1"),
        Some(&Value::Decimal(Decimal::new(10050, 2)))
    );
    assert!(matches!(result.params.get("param_placed_at_3"), Some(Value::Date(_))));
    assert!(result.fields.is_empty());
}

#[test]
fn test_count_distinct_with_joins() {
    let ctx = TestContext::new();
    let filter = QueryNode::and().with_condition(Condition::equals("lines.product", "widget"));

    let result = ctx.builder().build_count("Order", &filter).unwrap();

    assert_eq!(
        result.sql,
        "SELECT COUNT(DISTINCT t0.id) FROM sales.orders t0 \
         LEFT JOIN sales.order_lines t1 ON t0.id = t1.order_id AND t1.deleted = false \
         WHERE (t1.product = :param_lines_product_1)"
    );
}

#[test]
fn test_count_with_joins_requires_primary_key() {
    let bundle = SchemaBundle::new(1)
        .with_entity(
            EntitySchema::new("Visit", "visits")
                .with_field(
                    FieldSchema::new("page", LogicalType::String)
                        .with_column("visits", "page"),
                )
                .with_relation(RelationSchema::new(
                    "site",
                    "Site",
                    ("visits", "site_id"),
                    ("sites", "id"),
                )),
        )
        .with_entity(
            EntitySchema::new("Site", "sites")
                .with_field(
                    FieldSchema::new("host", LogicalType::String)
                        .with_column("sites", "host"),
                ),
        );
    let builder = QueryBuilder::new(&bundle);

    assert_eq!(
        builder.build_count("Visit", &QueryNode::and()).unwrap().sql,
        "SELECT COUNT(*) FROM visits t0"
    );

    let filter = QueryNode::and().with_condition(Condition::equals("site.host", "example.org"));
    assert!(matches!(
        builder.build_count("Visit", &filter),
        Err(Error::NoPrimaryKeyDefined { found: 0, .. })
    ));
}

#[test]
fn test_find_single_id_limits_to_two() {
    let ctx = TestContext::new();
    let filter = QueryNode::and().with_condition(Condition::equals("inn", "7701234567"));

    let result = ctx.builder().build_find_single_id("Customer", &filter).unwrap();

    assert_eq!(
        result.sql,
        "SELECT t0.id FROM sales.customers t0 WHERE (t0.inn = :param_inn_1) LIMIT 2"
    );
}

#[test]
fn test_single_by_equality() {
    let ctx = TestContext::new();
    let result = ctx
        .builder()
        .build_single(
            "Customer",
            &["name".to_string(), "region_title".to_string()],
            &[FieldValue::new("inn", "7701234567"), FieldValue::new("active", "true")],
        )
        .unwrap();

    assert_eq!(
        result.sql,
        "SELECT t0.name AS name, t1.title AS region_title FROM sales.customers t0 \
         LEFT JOIN sales.regions t1 ON t0.region_id = t1.id \
         WHERE (t0.inn = :param_inn_1 AND t0.active = :param_active_2) LIMIT 1"
    );
    assert_eq!(result.params.get("param_active_2"), Some(&Value::Bool(true)));
}

#[test]
fn test_insert() {
    let ctx = TestContext::new();
    let result = ctx
        .builder()
        .build_insert(
            "Order",
            &[
                FieldValue::new("number", "SO-1"),
                FieldValue::new("quantity", "3"),
                FieldValue::null("total"),
            ],
        )
        .unwrap();

    assert_eq!(
        result.sql,
        "INSERT INTO sales.orders (number, quantity, total) \
         VALUES (:param_number_1, :param_quantity_2, :param_total_3)"
    );
    assert_eq!(result.params.get("param_quantity_2"), Some(&Value::Int32(3)));
    assert_eq!(
        result.params.get("param_total_3"),
        Some(&Value::TypedNull(ValueKind::Decimal))
    );

    let empty = ctx.builder().build_insert("Order", &[]).unwrap();
    assert_eq!(empty.sql, "INSERT INTO sales.orders DEFAULT VALUES");
}

#[test]
fn test_insert_rejections() {
    let ctx = TestContext::new();
    let builder = ctx.builder();

    assert!(matches!(
        builder.build_insert("Order", &[FieldValue::new("customer_name", "ACME")]),
        Err(Error::ForeignTableFieldRejected { field, table, .. })
            if field == "customer_name" && table == "sales.customers"
    ));
    assert!(matches!(
        builder.build_insert("Order", &[FieldValue::new("quantity", "many")]),
        Err(Error::InvalidValueForType { field: Some(f), .. }) if f == "quantity"
    ));
    assert!(matches!(
        builder.build_insert(
            "Order",
            &[FieldValue::new("status", "a"), FieldValue::new("status", "b")]
        ),
        Err(Error::DuplicateField { .. })
    ));
    assert!(matches!(
        builder.build_insert("Customer", &[FieldValue::new("rating", "5")]),
        Err(Error::FieldPathUnresolvable { .. })
    ));
}

#[test]
fn test_update() {
    let ctx = TestContext::new();
    let result = ctx
        .builder()
        .build_update(
            "Order",
            &[FieldValue::new("status", "shipped"), FieldValue::new("total", "12.5")],
            "id",
        )
        .unwrap()
        .bind(ID_PARAM, 42i64);

    assert_eq!(
        result.sql,
        "UPDATE sales.orders SET status = :param_status_1, total = :param_total_2 WHERE id = :id_param"
    );
    let (sql, values) = result.to_positional().unwrap();
    assert_eq!(
        sql,
        "UPDATE sales.orders SET status = $1, total = $2 WHERE id = $3"
    );
    assert_eq!(values[2], Value::Int64(42));
}

#[test]
fn test_update_rejections() {
    let ctx = TestContext::new();
    let builder = ctx.builder();

    assert!(matches!(
        builder.build_update("Order", &[FieldValue::new("id", "7")], "id"),
        Err(Error::PrimaryKeyImmutable { field, .. }) if field == "id"
    ));
    assert!(matches!(
        builder.build_update("Order", &[FieldValue::new("customer_name", "x")], "id"),
        Err(Error::ForeignTableFieldRejected { .. })
    ));
    assert!(matches!(
        builder.build_update("Order", &[], "id"),
        Err(Error::NoUpdatableFieldsSupplied(entity)) if entity == "Order"
    ));
}

#[test]
fn test_delete() {
    let ctx = TestContext::new();
    let result = ctx.builder().build_delete("OrderLine", "id").unwrap();

    assert_eq!(result.sql, "DELETE FROM sales.order_lines WHERE id = :id_param");
    assert!(result.params.is_empty());
}

#[test]
fn test_errors_abort_compilation() {
    let ctx = TestContext::new();
    let builder = ctx.builder();

    let request = ListRequest::new().with_fields(["customer.missing"]);
    assert!(matches!(
        builder.build_list("Order", &request),
        Err(Error::FieldPathUnresolvable { segment, .. }) if segment == "missing"
    ));

    let request = ListRequest::new().with_fields(["rating"]);
    assert!(builder.build_list("Customer", &request).is_err());

    let filter = QueryNode::and().with_condition(Condition::new("status", "between", Some("a")));
    let err = builder.build_count("Order", &filter).unwrap_err();
    assert!(err.is_client_error());
    assert!(matches!(err, Error::UnsupportedOperator { .. }));
}

#[test]
fn test_custom_config() {
    let ctx = TestContext::new();
    let config = CompilerConfig::new().alias_prefix("x").default_page_size(5);
    let builder = QueryBuilder::with_config(&ctx.catalog, config);

    let request = ListRequest::new().with_fields(["customer.name"]);
    let result = builder.build_list("Order", &request).unwrap();

    assert_eq!(
        result.sql,
        "SELECT x1.name AS customer_name FROM sales.orders x0 \
         LEFT JOIN sales.customers x1 ON x0.customer_id = x1.id LIMIT 5 OFFSET 0"
    );
}

#[test]
fn test_request_from_json() {
    let ctx = TestContext::new();
    let request: ListRequest = serde_json::from_str(
        r#"{
            "fields": ["number"],
            "filter": {
                "operator": "or",
                "conditions": [
                    {"field": "quantity", "operator": "less_than", "value": 3},
                    {"field": "status", "operator": "is_null"}
                ]
            },
            "page": 1,
            "page_size": 10,
            "sort": {"field": "number", "direction": "desc"}
        }"#,
    )
    .unwrap();

    let result = ctx.builder().build_list("Order", &request).unwrap();

    assert_eq!(
        result.sql,
        "SELECT t0.number AS number FROM sales.orders t0 \
         WHERE (t0.quantity < :param_quantity_1 OR t0.status IS NULL) \
         ORDER BY t0.number DESC LIMIT 10 OFFSET 10"
    );
    assert_eq!(result.params.get("param_quantity_1"), Some(&Value::Int32(3)));
}
