use crate::survey::*;

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::collections::HashSet;

/// Characters that Excel does not accept in a sheet name.
const INVALID_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];

/// Turns an identifier into a sheet name that is valid and not used yet in the workbook.
///
/// Sheet names are compared without case, as Excel does.
pub fn sheet_name(raw: &str, used: &mut HashSet<String>) -> String {
    let mut clean: String = raw
        .chars()
        .map(|c| if INVALID_SHEET_CHARS.contains(&c) { '_' } else { c })
        .collect();
    if clean.starts_with('\'') || clean.ends_with('\'') {
        clean = clean.trim_matches('\'').to_string();
    }
    if clean.trim().is_empty() {
        clean = "Hoja".to_string();
    }
    // Reserved by Excel.
    if clean.eq_ignore_ascii_case("history") {
        clean.push('_');
    }
    let base = truncate_identifier(&clean);
    let mut name = base.clone();
    let mut n = 1;
    while used.contains(&name.to_lowercase()) {
        n += 1;
        let suffix = format!("~{}", n);
        let keep = MAX_IDENTIFIER_LEN - suffix.chars().count();
        name = format!("{}{}", base.chars().take(keep).collect::<String>(), suffix);
    }
    used.insert(name.to_lowercase());
    name
}

struct Formats {
    bold: Format,
    header: Format,
    percent: Format,
}

impl Formats {
    fn new() -> Formats {
        Formats {
            bold: Format::new().set_bold(),
            header: Format::new().set_bold().set_border_bottom(rust_xlsxwriter::FormatBorder::Thin),
            percent: Format::new().set_num_format("0.00%"),
        }
    }
}

/// Writes a line of text and moves two rows down.
fn write_text(
    ws: &mut Worksheet,
    row: &mut u32,
    text: &str,
    format: Option<&Format>,
) -> Result<(), XlsxError> {
    match format {
        Some(f) => ws.write_string_with_format(*row, 0, text, f)?,
        None => ws.write_string(*row, 0, text)?,
    };
    *row += 2;
    Ok(())
}

/// Writes a table with its header and moves past it, leaving two blank rows.
fn write_table(
    ws: &mut Worksheet,
    row: &mut u32,
    table: &Table,
    formats: &Formats,
    values_format: Option<&Format>,
) -> Result<(), XlsxError> {
    for (col, h) in table.header().iter().enumerate() {
        ws.write_string_with_format(*row, col as u16, h, &formats.header)?;
    }
    for (i, r) in table.rows.iter().enumerate() {
        let rr = *row + 1 + i as u32;
        match &r.key {
            RowKey::Option(OptionId::Code(c)) => ws.write_number(rr, 0, *c as f64)?,
            other => ws.write_string(rr, 0, other.to_string())?,
        };
        ws.write_string(rr, 1, &r.label)?;
        for (j, v) in r.values.iter().enumerate() {
            let col = (j + 2) as u16;
            match values_format {
                Some(f) => ws.write_number_with_format(rr, col, *v, f)?,
                None => ws.write_number(rr, col, *v)?,
            };
        }
    }
    *row += table.rows.len() as u32 + 3;
    Ok(())
}

/// The block of one question: notes, title, then each titled pair of tables.
fn write_question(
    ws: &mut Worksheet,
    row: &mut u32,
    q: &QuestionReport,
    formats: &Formats,
) -> Result<(), XlsxError> {
    if let Some(notes) = &q.notes {
        write_text(ws, row, notes, None)?;
    }
    write_text(ws, row, &q.title, Some(&formats.bold))?;
    for t in q.tables.iter() {
        write_text(ws, row, &t.title, Some(&formats.bold))?;
        write_table(ws, row, &t.absolute, formats, None)?;
        write_table(ws, row, &t.relative, formats, Some(&formats.percent))?;
    }
    Ok(())
}

/// One workbook for a unit, one sheet per question.
pub fn write_unit_workbook(path: &Path, unit: &ReportUnit) -> SurveyResult<()> {
    let p = path.display().to_string();
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let mut used: HashSet<String> = HashSet::new();
    for q in unit.questions.iter() {
        let ws = workbook.add_worksheet();
        ws.set_name(sheet_name(&q.sheet_name, &mut used))
            .context(WritingWorkbookSnafu { path: p.clone() })?;
        let mut row: u32 = 0;
        write_question(ws, &mut row, q, &formats).context(WritingWorkbookSnafu { path: p.clone() })?;
    }
    workbook
        .save(path)
        .context(WritingWorkbookSnafu { path: p.clone() })?;
    info!("Wrote {} ({} sheets)", p, unit.questions.len());
    Ok(())
}

/// One workbook for all the units, one sheet per unit with its questions stacked.
pub fn write_single_workbook(path: &Path, units: &[ReportUnit]) -> SurveyResult<()> {
    let p = path.display().to_string();
    let formats = Formats::new();
    let mut workbook = Workbook::new();
    let mut used: HashSet<String> = HashSet::new();
    for unit in units.iter() {
        let ws = workbook.add_worksheet();
        ws.set_name(sheet_name(&unit.name, &mut used))
            .context(WritingWorkbookSnafu { path: p.clone() })?;
        let mut row: u32 = 0;
        for q in unit.questions.iter() {
            write_question(ws, &mut row, q, &formats)
                .context(WritingWorkbookSnafu { path: p.clone() })?;
        }
    }
    if units.is_empty() {
        warn!("No report to write in {}", p);
    }
    workbook
        .save(path)
        .context(WritingWorkbookSnafu { path: p.clone() })?;
    info!("Wrote {} ({} sheets)", p, units.len());
    Ok(())
}
