// Derived rows, columns and tables.
//
// Each operation builds a new table from its input. All of them return an empty table
// unchanged.

use log::debug;

use crate::config::*;
use crate::metadata::is_sentinel;
use crate::pivot::*;

fn is_data_row(r: &TableRow) -> bool {
    matches!(r.key, RowKey::Option(_))
}

/// Appends a "Total" row with the sum of every value column over the option rows.
pub fn add_total_row(table: &Table) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let mut totals = vec![0.0; table.columns.len()];
    for r in table.rows.iter().filter(|r| is_data_row(r)) {
        for (t, v) in totals.iter_mut().zip(r.values.iter()) {
            *t += v;
        }
    }
    let mut res = table.clone();
    res.rows.push(TableRow {
        key: RowKey::Total,
        label: TOTAL_LABEL.to_string(),
        values: totals,
    });
    res
}

/// Appends a "Total" column with the sum of the value columns of each row.
///
/// If the table already has a "Total" column, it is replaced in place by the row sum, which
/// includes its previous value.
pub fn add_total_column(table: &Table) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let mut res = table.clone();
    let existing = table.column_index(TOTAL_LABEL);
    if existing.is_none() {
        res.columns.push(TOTAL_LABEL.to_string());
    }
    for r in res.rows.iter_mut() {
        let sum: f64 = r.values.iter().sum();
        match existing {
            Some(idx) => r.values[idx] = sum,
            None => r.values.push(sum),
        }
    }
    res
}

/// The numeric value of an option, read from its label.
fn answer_value(r: &TableRow) -> Option<f64> {
    r.label.trim().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Appends a "Promedio" row for numeric questions.
///
/// For each value column, the average of the answer values of the option rows, weighted by the
/// column values. Rows whose answer is not numeric, or whose answer or weight is a sentinel
/// code, are left out. The average is 0 when the remaining weights sum to 0.
pub fn add_weighted_average_row(table: &Table) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let data: Vec<(f64, &TableRow)> = table
        .rows
        .iter()
        .filter(|r| is_data_row(r))
        .filter_map(|r| answer_value(r).map(|v| (v, r)))
        .filter(|(v, _)| !is_sentinel(*v))
        .collect();

    let averages: Vec<f64> = (0..table.columns.len())
        .map(|idx| {
            let mut num = 0.0;
            let mut den = 0.0;
            for (v, r) in data.iter() {
                let w = r.values[idx];
                if is_sentinel(w) {
                    continue;
                }
                num += v * w;
                den += w;
            }
            if den == 0.0 {
                0.0
            } else {
                num / den
            }
        })
        .collect();

    let mut res = table.clone();
    res.rows.push(TableRow {
        key: RowKey::Average,
        label: AVERAGE_LABEL.to_string(),
        values: averages,
    });
    res
}

/// Divides each value column by its value in the "Total" row.
///
/// The "Promedio" row is removed first. A column whose total is 0 becomes all zeros. A
/// non-empty table without a "Total" row is an error.
pub fn relative_table(table: &Table) -> ReportResult<Table> {
    let mut res = table.clone();
    res.rows.retain(|r| r.key != RowKey::Average);
    if res.is_empty() {
        return Ok(res);
    }
    let divisors = match res.row(&RowKey::Total) {
        Some(r) => r.values.clone(),
        None => return MissingTotalRowSnafu {}.fail(),
    };
    for r in res.rows.iter_mut() {
        for (v, d) in r.values.iter_mut().zip(divisors.iter()) {
            *v = if *d == 0.0 { 0.0 } else { *v / d };
        }
    }
    Ok(res)
}

/// Which extension steps apply to a disaggregation table.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Extension {
    pub total_column: bool,
    pub weighted_average: bool,
}

/// Runs the extension steps in order and derives the relative table.
///
/// Returns (absolute, relative).
pub fn extend_table(table: &Table, ext: Extension) -> ReportResult<(Table, Table)> {
    let mut absolute = add_total_row(table);
    if ext.total_column {
        absolute = add_total_column(&absolute);
    }
    if ext.weighted_average {
        absolute = add_weighted_average_row(&absolute);
    }
    let relative = relative_table(&absolute)?;
    debug!(
        "extend_table: {:?}: {} rows x {} columns",
        ext,
        absolute.rows.len(),
        absolute.columns.len()
    );
    Ok((absolute, relative))
}
