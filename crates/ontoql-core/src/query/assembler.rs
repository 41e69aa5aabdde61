//! SQL text assembly from a finished [`QueryContext`].

use super::context::QueryContext;

/// Renders statements from the state accumulated in a context.
pub struct SqlAssembler<'c> {
    ctx: &'c QueryContext,
}

impl<'c> SqlAssembler<'c> {
    /// Create an assembler over `ctx`.
    pub fn new(ctx: &'c QueryContext) -> Self {
        Self { ctx }
    }

    /// `SELECT <fields> FROM ... [WHERE] [ORDER BY] LIMIT n OFFSET m`.
    pub fn list(&self, order_by: Option<&str>, limit: u32, offset: u64) -> String {
        let mut sql = format!("SELECT {}", self.select_list());
        self.push_from_where(&mut sql);
        if let Some(order_by) = order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));
        sql
    }

    /// `SELECT COUNT(*)`, or `COUNT(DISTINCT <root>.<pk>)` when a key column
    /// is given.
    pub fn count(&self, distinct_column: Option<&str>) -> String {
        let mut sql = match distinct_column {
            Some(column) => format!(
                "SELECT COUNT(DISTINCT {}.{})",
                self.ctx.root_alias(),
                column
            ),
            None => "SELECT COUNT(*)".to_string(),
        };
        self.push_from_where(&mut sql);
        sql
    }

    /// `SELECT <fields> FROM ... [WHERE] LIMIT 1`.
    pub fn single(&self) -> String {
        let mut sql = format!("SELECT {}", self.select_list());
        self.push_from_where(&mut sql);
        sql.push_str(" LIMIT 1");
        sql
    }

    /// `SELECT <root>.<pk> FROM ... [WHERE] LIMIT 2`.
    ///
    /// Two rows are enough for the caller to tell a unique match from an
    /// ambiguous one.
    pub fn find_single_id(&self, pk_column: &str) -> String {
        let mut sql = format!("SELECT {}.{}", self.ctx.root_alias(), pk_column);
        self.push_from_where(&mut sql);
        sql.push_str(" LIMIT 2");
        sql
    }

    /// `INSERT INTO <table> (<cols>) VALUES (:p, ...)`, or `DEFAULT VALUES`
    /// when there is nothing to insert.
    pub fn insert(table: &str, columns: &[(String, String)]) -> String {
        if columns.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES", table);
        }
        let names: Vec<&str> = columns.iter().map(|(c, _)| c.as_str()).collect();
        let params: Vec<String> = columns.iter().map(|(_, p)| format!(":{}", p)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            names.join(", "),
            params.join(", ")
        )
    }

    /// `UPDATE <table> SET c = :p, ... WHERE <id> = :<id_param>`.
    pub fn update(
        table: &str,
        columns: &[(String, String)],
        id_column: &str,
        id_param: &str,
    ) -> String {
        let assignments: Vec<String> = columns
            .iter()
            .map(|(c, p)| format!("{} = :{}", c, p))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = :{}",
            table,
            assignments.join(", "),
            id_column,
            id_param
        )
    }

    /// `DELETE FROM <table> WHERE <id> = :<id_param>`.
    pub fn delete(table: &str, id_column: &str, id_param: &str) -> String {
        format!("DELETE FROM {} WHERE {} = :{}", table, id_column, id_param)
    }

    fn select_list(&self) -> String {
        self.ctx
            .fields()
            .iter()
            .map(|f| format!("{} AS {}", f.qualified_column(), f.column_alias))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn push_from_where(&self, sql: &mut String) {
        sql.push_str(&format!(
            " FROM {} {}",
            self.ctx.root().table,
            self.ctx.root_alias()
        ));
        for join in self.ctx.joins() {
            sql.push(' ');
            sql.push_str(&join.sql);
        }
        let clauses = self.ctx.where_clauses();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
    }
}
