// Row Grouper - partitions a Dataset into duplicate groups sharing
// (subject_id, due_date, installment_number).

use crate::error::{ReconError, ReconResult};
use crate::table::Dataset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Columns that must exist before any group work starts.
pub const REQUIRED_COLUMNS: [&str; 4] = [
    "subject_id",
    "due_date",
    "installment_number",
    "installment_code",
];

pub const PAYMENT_COLUMN: &str = "payment_date";
pub const AGREEMENT_COLUMN: &str = "agreement_code";

/// Resolved column indices for one dataset. The optional columns switch
/// rule branches on and off in the evaluator.
#[derive(Debug, Clone, Copy)]
pub struct KeyColumns {
    pub subject_id: usize,
    pub due_date: usize,
    pub installment_number: usize,
    pub installment_code: usize,
    pub payment_date: Option<usize>,
    pub agreement_code: Option<usize>,
}

impl KeyColumns {
    /// Locate all required columns, reporting every missing one at once.
    /// A missing required column is a configuration error, not a per-row
    /// failure.
    pub fn locate(dataset: &Dataset) -> ReconResult<KeyColumns> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| dataset.column(name).is_none())
            .map(|name| name.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(ReconError::MissingColumns(missing));
        }

        Ok(KeyColumns {
            subject_id: dataset.column(REQUIRED_COLUMNS[0]).unwrap(),
            due_date: dataset.column(REQUIRED_COLUMNS[1]).unwrap(),
            installment_number: dataset.column(REQUIRED_COLUMNS[2]).unwrap(),
            installment_code: dataset.column(REQUIRED_COLUMNS[3]).unwrap(),
            payment_date: dataset.column(PAYMENT_COLUMN),
            agreement_code: dataset.column(AGREEMENT_COLUMN),
        })
    }
}

/// The composite key shared by every row of a group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub subject_id: String,
    pub due_date: String,
    pub installment_number: String,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subject_id={}, due_date={}, installment_number={}",
            self.subject_id, self.due_date, self.installment_number
        )
    }
}

/// A set of rows sharing one composite key. `rows` holds indices into
/// `Dataset::rows`, in original order.
#[derive(Debug, Clone)]
pub struct Group {
    pub key: GroupKey,
    pub rows: Vec<usize>,
}

/// Partition the dataset and keep only groups of size >= 2 (singletons
/// are not duplicates, nothing to resolve). Groups come back in order of
/// first appearance, so downstream output is deterministic.
pub fn group_duplicates(dataset: &Dataset, columns: &KeyColumns) -> Vec<Group> {
    let mut by_key: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for row in &dataset.rows {
        let key = GroupKey {
            subject_id: row.cell(columns.subject_id).to_string(),
            due_date: row.cell(columns.due_date).to_string(),
            installment_number: row.cell(columns.installment_number).to_string(),
        };

        match by_key.get(&key) {
            Some(&slot) => groups[slot].rows.push(row.index),
            None => {
                by_key.insert(key.clone(), groups.len());
                groups.push(Group {
                    key,
                    rows: vec![row.index],
                });
            }
        }
    }

    groups.retain(|g| g.rows.len() > 1);
    groups
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn dataset_with_rows(rows: Vec<Vec<&str>>) -> Dataset {
        let mut dataset = Dataset::new(vec![
            "subject_id".to_string(),
            "due_date".to_string(),
            "installment_number".to_string(),
            "installment_code".to_string(),
        ]);
        for row in rows {
            dataset.push_row(
                row.into_iter()
                    .map(Field::from_csv_cell)
                    .collect(),
            );
        }
        dataset
    }

    #[test]
    fn test_missing_columns_reported_together() {
        let dataset = Dataset::new(vec!["subject_id".to_string(), "due_date".to_string()]);
        let err = KeyColumns::locate(&dataset).unwrap_err();

        match err {
            ReconError::MissingColumns(cols) => {
                assert_eq!(cols, vec!["installment_number", "installment_code"]);
            }
            other => panic!("expected MissingColumns, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_columns_detected() {
        let mut dataset = dataset_with_rows(vec![]);
        assert!(KeyColumns::locate(&dataset).unwrap().payment_date.is_none());

        dataset.headers.push("payment_date".to_string());
        dataset.headers.push("agreement_code".to_string());
        let columns = KeyColumns::locate(&dataset).unwrap();
        assert_eq!(columns.payment_date, Some(4));
        assert_eq!(columns.agreement_code, Some(5));
    }

    #[test]
    fn test_singletons_excluded() {
        let dataset = dataset_with_rows(vec![
            vec!["111", "2024-01-10", "1", "10"],
            vec!["111", "2024-01-10", "1", "20"],
            vec!["222", "2024-01-10", "1", "30"],
        ]);
        let columns = KeyColumns::locate(&dataset).unwrap();
        let groups = group_duplicates(&dataset, &columns);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows, vec![0, 1]);
        assert_eq!(groups[0].key.subject_id, "111");
    }

    #[test]
    fn test_groups_in_first_appearance_order() {
        let dataset = dataset_with_rows(vec![
            vec!["b", "2024-01-10", "1", "10"],
            vec!["a", "2024-01-10", "1", "10"],
            vec!["b", "2024-01-10", "1", "20"],
            vec!["a", "2024-01-10", "1", "20"],
        ]);
        let columns = KeyColumns::locate(&dataset).unwrap();
        let groups = group_duplicates(&dataset, &columns);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.subject_id, "b");
        assert_eq!(groups[1].key.subject_id, "a");
    }

    #[test]
    fn test_numeric_and_text_keys_match_by_display_form() {
        let mut dataset = Dataset::new(vec![
            "subject_id".to_string(),
            "due_date".to_string(),
            "installment_number".to_string(),
            "installment_code".to_string(),
        ]);
        // XLSX loads installment_number as a float, CSV as text.
        dataset.push_row(vec![
            Field::Text("111".to_string()),
            Field::Text("2024-01-10".to_string()),
            Field::Float(1.0),
            Field::Int(10),
        ]);
        dataset.push_row(vec![
            Field::Text("111".to_string()),
            Field::Text("2024-01-10".to_string()),
            Field::Text("1".to_string()),
            Field::Int(20),
        ]);

        let columns = KeyColumns::locate(&dataset).unwrap();
        let groups = group_duplicates(&dataset, &columns);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].rows.len(), 2);
    }
}
