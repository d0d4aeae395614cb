// Wide tables and the long to wide pivot.

use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

use crate::config::*;

/// Header of the option id column.
pub const ID_COLUMN: &str = "id_respuesta";
/// Header of the option label column.
pub const LABEL_COLUMN: &str = "Respuesta";

pub const TOTAL_LABEL: &str = "Total";
pub const AVERAGE_LABEL: &str = "Promedio";

/// The identity of a table row.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum RowKey {
    Option(OptionId),
    Total,
    Average,
}

impl Display for RowKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowKey::Option(id) => write!(f, "{}", id),
            RowKey::Total => write!(f, "{}", TOTAL_LABEL),
            RowKey::Average => write!(f, "{}", AVERAGE_LABEL),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct TableRow {
    pub key: RowKey,
    pub label: String,
    /// One value per value column of the table.
    pub values: Vec<f64>,
}

/// A pivot table: two fixed columns (id and label) followed by the value columns.
///
/// Only the value column headers are stored in `columns`. Every row carries exactly one value
/// per value column.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn empty() -> Table {
        Table::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All the headers, the fixed ones first.
    pub fn header(&self) -> Vec<String> {
        let mut h = vec![ID_COLUMN.to_string(), LABEL_COLUMN.to_string()];
        h.extend(self.columns.iter().cloned());
        h
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row(&self, key: &RowKey) -> Option<&TableRow> {
        self.rows.iter().find(|r| &r.key == key)
    }

    pub fn cell(&self, key: &RowKey, column: &str) -> Option<f64> {
        let idx = self.column_index(column)?;
        self.row(key).map(|r| r.values[idx])
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }
}

/// Spreads the group labels of long rows into columns.
///
/// Rows are keyed by (option id, option label) and sorted by that key. Duplicate
/// (option, group) pairs are summed and missing ones are 0. Columns keep the order in which
/// groups are first seen. Long rows without an id, a label or a group are dropped; a missing
/// value counts as 0.
pub fn pivot(long_rows: &[LongRow]) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut column_pos: HashMap<String, usize> = HashMap::new();
    let mut cells: BTreeMap<(OptionId, String), HashMap<usize, f64>> = BTreeMap::new();
    let mut dropped = 0;

    for lr in long_rows.iter() {
        let (id, label, group) = match (&lr.option_id, &lr.label, &lr.group) {
            (Some(id), Some(label), Some(group)) => (id, label, group),
            _ => {
                dropped += 1;
                continue;
            }
        };
        let col = match column_pos.get(group) {
            Some(c) => *c,
            None => {
                columns.push(group.clone());
                column_pos.insert(group.clone(), columns.len() - 1);
                columns.len() - 1
            }
        };
        let row = cells.entry((id.clone(), label.clone())).or_default();
        *row.entry(col).or_insert(0.0) += lr.value.unwrap_or(0.0);
    }

    if dropped > 0 {
        debug!("pivot: dropped {} long rows without id, label or group", dropped);
    }

    let rows: Vec<TableRow> = cells
        .into_iter()
        .map(|((id, label), row_cells)| TableRow {
            key: RowKey::Option(id),
            label,
            values: (0..columns.len())
                .map(|c| row_cells.get(&c).cloned().unwrap_or(0.0))
                .collect(),
        })
        .collect();

    Table { columns, rows }
}

/// Keeps exactly the columns of `order` that the table has, in the order of `order`.
pub fn reorder_columns(table: &Table, order: &[&str]) -> Table {
    let picked: Vec<usize> = order
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();
    if picked.len() < table.columns.len() {
        let dropped: Vec<&String> = table
            .columns
            .iter()
            .filter(|c| !order.contains(&c.as_str()))
            .collect();
        debug!("reorder_columns: dropping non-canonical columns {:?}", dropped);
    }
    Table {
        columns: picked.iter().map(|i| table.columns[*i].clone()).collect(),
        rows: table
            .rows
            .iter()
            .map(|r| TableRow {
                key: r.key.clone(),
                label: r.label.clone(),
                values: picked.iter().map(|i| r.values[*i]).collect(),
            })
            .collect(),
    }
}
