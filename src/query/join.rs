//! Join Specification Builder - Ordered tables plus pairwise join conditions
//!
//! The first table added is the anchor and can never be removed. Every
//! non-anchor table carries exactly one join condition, kept at
//! `conditions[index - 1]`, so `conditions.len() == tables.len() - 1` holds
//! after every mutation.

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinSpec {
    tables: Vec<String>,
    conditions: Vec<String>,
}

impl JoinSpec {
    pub fn new(anchor: impl Into<String>) -> Self {
        Self {
            tables: vec![anchor.into()],
            conditions: Vec::new(),
        }
    }

    pub fn anchor(&self) -> &str {
        &self.tables[0]
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn conditions(&self) -> &[String] {
        &self.conditions
    }

    /// Append a table with an empty condition slot. The spec is not ready for
    /// query building until the condition is supplied via [`set_condition`]
    /// (or use [`join`] to do both at once).
    ///
    /// [`set_condition`]: JoinSpec::set_condition
    /// [`join`]: JoinSpec::join
    pub fn add_table(&mut self, table: impl Into<String>) -> Result<()> {
        let table = table.into();
        if self.tables.contains(&table) {
            return Err(IngestError::Validation(format!(
                "Table already present in join: {}",
                table
            )));
        }
        self.tables.push(table);
        self.conditions.push(String::new());
        Ok(())
    }

    /// Append a table together with its join condition.
    pub fn join(&mut self, table: impl Into<String>, condition: impl Into<String>) -> Result<()> {
        self.add_table(table)?;
        let last = self.conditions.len() - 1;
        self.conditions[last] = condition.into();
        Ok(())
    }

    /// Attach the join condition for the non-anchor table at `table_index`.
    pub fn set_condition(&mut self, table_index: usize, condition: impl Into<String>) -> Result<()> {
        if table_index == 0 {
            return Err(IngestError::Validation(
                "The anchor table has no join condition".to_string(),
            ));
        }
        if table_index >= self.tables.len() {
            return Err(IngestError::Validation(format!(
                "No table at index {} in join", table_index
            )));
        }
        self.conditions[table_index - 1] = condition.into();
        Ok(())
    }

    /// Remove the table at `index` and its condition. The anchor (index 0)
    /// can never be removed.
    pub fn remove_table(&mut self, index: usize) -> Result<()> {
        if index == 0 {
            return Err(IngestError::Validation(
                "The anchor table cannot be removed from a join".to_string(),
            ));
        }
        if index >= self.tables.len() {
            return Err(IngestError::Validation(format!(
                "No table at index {} in join", index
            )));
        }
        self.tables.remove(index);
        self.conditions.remove(index - 1);
        Ok(())
    }

    /// True once every non-anchor table has a non-empty join condition.
    pub fn is_ready(&self) -> bool {
        self.conditions.iter().all(|c| !c.trim().is_empty())
    }

    /// Candidate column identifiers for the operator to select from: for each
    /// table in spec order, each of its columns qualified as `table.column`.
    /// Qualification makes identifiers unique across tables, so no collision
    /// handling is needed.
    pub fn merged_columns(&self, per_table: &HashMap<String, Vec<String>>) -> Vec<String> {
        let mut merged = Vec::new();
        for table in &self.tables {
            if let Some(columns) = per_table.get(table) {
                for column in columns {
                    merged.push(format!("{}.{}", table, column));
                }
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_cannot_be_removed() {
        let mut spec = JoinSpec::new("orders");
        spec.join("customers", "orders.customer_id = customers.id")
            .unwrap();
        assert!(spec.remove_table(0).is_err());
        assert_eq!(spec.anchor(), "orders");
    }

    #[test]
    fn test_condition_invariant_after_mutations() {
        let mut spec = JoinSpec::new("a");
        assert_eq!(spec.conditions().len(), spec.tables().len() - 1);

        spec.join("b", "a.id = b.id").unwrap();
        assert_eq!(spec.conditions().len(), spec.tables().len() - 1);

        spec.join("c", "b.id = c.id").unwrap();
        assert_eq!(spec.conditions().len(), spec.tables().len() - 1);

        spec.remove_table(1).unwrap();
        assert_eq!(spec.conditions().len(), spec.tables().len() - 1);
        assert_eq!(spec.tables(), &["a".to_string(), "c".to_string()]);
        assert_eq!(spec.conditions(), &["b.id = c.id".to_string()]);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let mut spec = JoinSpec::new("a");
        assert!(spec.add_table("a").is_err());
        spec.add_table("b").unwrap();
        assert!(spec.add_table("b").is_err());
    }

    #[test]
    fn test_readiness_requires_all_conditions() {
        let mut spec = JoinSpec::new("a");
        assert!(spec.is_ready());

        spec.add_table("b").unwrap();
        assert!(!spec.is_ready());

        spec.set_condition(1, "a.id = b.id").unwrap();
        assert!(spec.is_ready());
    }

    #[test]
    fn test_merged_columns_qualified_and_unique() {
        let mut spec = JoinSpec::new("a");
        spec.join("b", "a.id = b.id").unwrap();

        let mut per_table = HashMap::new();
        per_table.insert("a".to_string(), vec!["id".to_string(), "name".to_string()]);
        per_table.insert("b".to_string(), vec!["id".to_string(), "total".to_string()]);

        let merged = spec.merged_columns(&per_table);
        assert_eq!(merged, vec!["a.id", "a.name", "b.id", "b.total"]);

        let unique: std::collections::HashSet<_> = merged.iter().collect();
        assert_eq!(unique.len(), merged.len());
        assert!(merged.iter().all(|c| c.contains('.')));
    }
}
