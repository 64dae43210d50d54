//! Query Builder - Read and load statements for the store
//!
//! Structural SQL is assembled from validated identifiers; values never appear
//! in statement text. Scalar parameters travel through the store's
//! `{name:Type}` placeholder mechanism and insert payloads travel as a
//! JSONEachRow body, so value escaping is delegated to the driver and to
//! serde_json rather than done by string surgery. Join conditions are opaque
//! operator-supplied text; a malformed condition surfaces as a query error at
//! execution time, not at build time.

use crate::error::{IngestError, Result};
use crate::query::join::JoinSpec;
use crate::record::Projection;
use itertools::Itertools;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// A statement plus its bound scalar parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub sql: String,
    /// `(name, value)` pairs bound to `{name:String}` placeholders.
    pub params: Vec<(String, String)>,
}

impl Query {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn bind(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }
}

/// What a select statement reads from: one table or a ready join.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SelectSource {
    Table(String),
    Join(JoinSpec),
}

/// Reject any identifier outside the allow-listed character set. Qualified
/// identifiers are validated one dot-separated part at a time.
pub fn validate_identifier(identifier: &str) -> Result<()> {
    let parts: Vec<&str> = identifier.split('.').collect();
    if parts.is_empty() || parts.len() > 2 {
        return Err(IngestError::Validation(format!(
            "Invalid identifier: {}",
            identifier
        )));
    }
    for part in parts {
        if !IDENTIFIER.is_match(part) {
            return Err(IngestError::Validation(format!(
                "Invalid identifier: {}",
                identifier
            )));
        }
    }
    Ok(())
}

/// Destination column lists (CREATE, INSERT) take bare names only; a
/// qualified identifier would land in the statement verbatim and produce
/// invalid DDL.
pub fn validate_bare_identifier(identifier: &str) -> Result<()> {
    if identifier.contains('.') {
        return Err(IngestError::Validation(format!(
            "Qualified identifier not allowed in a destination column list: {}",
            identifier
        )));
    }
    validate_identifier(identifier)
}

/// Render one projected column. Qualified identifiers get an explicit alias so
/// result rows key on the identifier the operator selected.
fn select_expr(identifier: &str) -> String {
    if identifier.contains('.') {
        format!("{} AS `{}`", identifier, identifier)
    } else {
        identifier.to_string()
    }
}

/// `SELECT <projection> FROM <table-or-join> [LIMIT <limit>]`.
pub fn build_select(
    source: &SelectSource,
    projection: &Projection,
    limit: Option<u64>,
) -> Result<Query> {
    for column in projection.columns() {
        validate_identifier(column)?;
    }
    let select_list = projection.columns().iter().map(|c| select_expr(c)).join(", ");

    let from_clause = match source {
        SelectSource::Table(table) => {
            validate_identifier(table)?;
            table.clone()
        }
        SelectSource::Join(spec) => {
            if !spec.is_ready() {
                return Err(IngestError::IncompleteJoin(
                    "Every non-anchor table needs a join condition before a query can be built"
                        .to_string(),
                ));
            }
            for table in spec.tables() {
                validate_identifier(table)?;
            }
            let mut clause = spec.anchor().to_string();
            for (table, condition) in spec.tables()[1..].iter().zip(spec.conditions()) {
                clause.push_str(&format!(" JOIN {} ON {}", table, condition));
            }
            clause
        }
    };

    let mut sql = format!("SELECT {} FROM {}", select_list, from_clause);
    if let Some(limit) = limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }
    Ok(Query::new(sql))
}

/// Create-if-absent DDL for a destination table. Every column is text-typed
/// and the engine is append-friendly with no sort key, so loads do not depend
/// on any physical ordering. `IF NOT EXISTS` keeps concurrent creation safe.
pub fn build_create_if_absent(table: &str, columns: &[String]) -> Result<Query> {
    validate_identifier(table)?;
    for column in columns {
        validate_bare_identifier(column)?;
    }
    let column_list = columns.iter().map(|c| format!("{} String", c)).join(", ");
    Ok(Query::new(format!(
        "CREATE TABLE IF NOT EXISTS {} ({}) ENGINE = MergeTree() ORDER BY tuple()",
        table, column_list
    )))
}

/// Insert statement head; row values follow as a JSONEachRow body.
pub fn build_insert_head(table: &str, columns: &[String]) -> Result<String> {
    validate_identifier(table)?;
    for column in columns {
        validate_bare_identifier(column)?;
    }
    Ok(format!(
        "INSERT INTO {} ({}) FORMAT JSONEachRow",
        table,
        columns.iter().join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn projection(columns: &[&str]) -> Projection {
        Projection::new(columns.iter().map(|c| c.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_select_single_table() {
        let query = build_select(
            &SelectSource::Table("users".to_string()),
            &projection(&["id", "name"]),
            None,
        )
        .unwrap();
        assert_eq!(query.sql, "SELECT id, name FROM users");
    }

    #[test]
    fn test_select_with_limit() {
        let query = build_select(
            &SelectSource::Table("users".to_string()),
            &projection(&["id"]),
            Some(100),
        )
        .unwrap();
        assert_eq!(query.sql, "SELECT id FROM users LIMIT 100");
    }

    #[test]
    fn test_select_join_in_spec_order() {
        let mut spec = JoinSpec::new("orders");
        spec.join("customers", "orders.customer_id = customers.id")
            .unwrap();

        let query = build_select(
            &SelectSource::Join(spec),
            &projection(&["orders.id", "customers.name"]),
            Some(100),
        )
        .unwrap();
        assert_eq!(
            query.sql,
            "SELECT orders.id AS `orders.id`, customers.name AS `customers.name` \
             FROM orders JOIN customers ON orders.customer_id = customers.id LIMIT 100"
        );
    }

    #[test]
    fn test_select_refuses_incomplete_join() {
        let mut spec = JoinSpec::new("orders");
        spec.add_table("customers").unwrap();

        let result = build_select(&SelectSource::Join(spec), &projection(&["orders.id"]), None);
        assert!(matches!(result, Err(IngestError::IncompleteJoin(_))));
    }

    #[test]
    fn test_create_if_absent_text_columns() {
        let query = build_create_if_absent(
            "target",
            &["id".to_string(), "name".to_string()],
        )
        .unwrap();
        assert_eq!(
            query.sql,
            "CREATE TABLE IF NOT EXISTS target (id String, name String) \
             ENGINE = MergeTree() ORDER BY tuple()"
        );
    }

    #[test]
    fn test_insert_head() {
        let head = build_insert_head("target", &["id".to_string(), "name".to_string()]).unwrap();
        assert_eq!(head, "INSERT INTO target (id, name) FORMAT JSONEachRow");
    }

    #[test]
    fn test_identifier_allow_list() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("orders.customer_id").is_ok());
        assert!(validate_identifier("_private").is_ok());

        assert!(validate_identifier("users; DROP TABLE users").is_err());
        assert!(validate_identifier("users'").is_err());
        assert!(validate_identifier("a.b.c").is_err());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1starts_with_digit").is_err());
    }

    #[test]
    fn test_destination_columns_must_be_bare() {
        // A qualified name is a valid projection identifier but can never
        // name a destination column.
        assert!(validate_identifier("orders.id").is_ok());
        assert!(validate_bare_identifier("orders.id").is_err());
        assert!(build_create_if_absent("t", &["orders.id".to_string()]).is_err());
        assert!(build_insert_head("t", &["orders.id".to_string()]).is_err());
    }

    #[test]
    fn test_select_rejects_bad_projection_identifier() {
        let result = build_select(
            &SelectSource::Table("users".to_string()),
            &projection(&["id, name FROM other --"]),
            None,
        );
        assert!(result.is_err());
    }
}
