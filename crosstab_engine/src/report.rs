// Report tables and question reports.

use log::{debug, info};

use crate::catalog::*;
use crate::config::*;
use crate::extend::*;
use crate::pivot::*;
use crate::query::QuerySpec;

/// The longest identifier the rendering layer accepts for a sheet.
pub const MAX_IDENTIFIER_LEN: usize = 31;

/// Suffix of the output unit holding the unweighted twin of control panel reports.
pub const SIN_FACTOR_SUFFIX: &str = "_sin_factor";

/// The source of survey data.
///
/// Failures of the store are reported as `ReportError::Store`.
pub trait AttributeStore {
    /// The question sections, in reporting order.
    fn sections(&self) -> ReportResult<Vec<String>>;

    fn questions_by_section(&self, section: &str) -> ReportResult<Vec<Question>>;

    /// Runs one statement with named parameters and returns its long-form rows.
    fn fetch(&self, sql: &str, params: &[(String, String)]) -> ReportResult<Vec<LongRow>>;
}

fn fetch_all(store: &dyn AttributeStore, spec: &QuerySpec) -> ReportResult<Vec<LongRow>> {
    let mut rows = Vec::new();
    for sql in spec.statements.iter() {
        let mut r = store.fetch(sql, &spec.params)?;
        debug!("fetch_all: {} rows", r.len());
        rows.append(&mut r);
    }
    Ok(rows)
}

/// The pivot table of one question broken down by one disaggregation.
///
/// An empty result gives an empty table.
pub fn build_disaggregation_report(
    store: &dyn AttributeStore,
    catalog: &Catalog,
    question_id: &str,
    disaggregation: &str,
    mode: FilterMode,
) -> ReportResult<Table> {
    let d = catalog.get(disaggregation)?;
    let spec = d.build_query(question_id, mode)?;
    let long_rows = fetch_all(store, &spec)?;
    if long_rows.is_empty() {
        debug!(
            "build_disaggregation_report: {} / {}: no rows",
            question_id, disaggregation
        );
        return Ok(Table::empty());
    }
    let table = pivot(&long_rows);
    let res = match d.domain() {
        Some(domain) => reorder_columns(&table, domain.canonical_order()),
        None => table,
    };
    Ok(res)
}

/// A titled pair of absolute and relative tables.
#[derive(PartialEq, Debug, Clone)]
pub struct ReportTable {
    pub disaggregation: String,
    pub title: String,
    pub absolute: Table,
    pub relative: Table,
}

/// Everything the renderer needs to lay out one question.
#[derive(PartialEq, Debug, Clone)]
pub struct QuestionReport {
    pub question_id: String,
    pub sheet_name: String,
    pub notes: Option<String>,
    pub title: String,
    pub tables: Vec<ReportTable>,
}

/// Builds the tables of a question for each of its configured disaggregations, in order.
pub fn build_question_report(
    store: &dyn AttributeStore,
    catalog: &Catalog,
    question: &Question,
    disaggregations: &[String],
    mode: FilterMode,
) -> ReportResult<QuestionReport> {
    let mut tables = Vec::new();
    for name in disaggregations.iter() {
        let d = catalog.get(name)?;
        let table = build_disaggregation_report(store, catalog, &question.id, name, mode)?;
        let ext = Extension {
            total_column: !d.is_geographic(),
            weighted_average: question.is_numeric(),
        };
        let (absolute, relative) = extend_table(&table, ext)?;
        tables.push(ReportTable {
            disaggregation: name.clone(),
            title: format!("Respuesta por {}", name),
            absolute,
            relative,
        });
    }
    let notes = question
        .notes
        .as_ref()
        .filter(|n| !n.is_empty())
        .cloned();
    Ok(QuestionReport {
        question_id: question.id.clone(),
        sheet_name: truncate_identifier(&question.id),
        notes,
        title: format!("{} - {}", question.id, question.text),
        tables,
    })
}

/// A filter mode and the output unit it writes to.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct ReportMode {
    pub mode: FilterMode,
    pub unit_suffix: &'static str,
}

impl ReportMode {
    pub fn unit_name(&self, section: &str) -> String {
        format!("{}{}", section, self.unit_suffix)
    }
}

/// The modes a question is reported in.
///
/// Control panel questions get a second, unweighted report over all respondents.
pub fn report_modes(question: &Question) -> Vec<ReportMode> {
    let mut res = vec![ReportMode {
        mode: FilterMode::WEIGHTED_INITIAL,
        unit_suffix: "",
    }];
    if question.is_control_panel() {
        res.push(ReportMode {
            mode: FilterMode::UNWEIGHTED_ALL,
            unit_suffix: SIN_FACTOR_SUFFIX,
        });
    }
    res
}

/// Cuts an identifier to the longest length a sheet name may have.
pub fn truncate_identifier(s: &str) -> String {
    s.chars().take(MAX_IDENTIFIER_LEN).collect()
}

fn leading_number(s: &str) -> (Option<u64>, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    (s[..end].parse::<u64>().ok(), &s[end..])
}

/// Sort key of question ids: `cp` ids, then `p` ids, then anything else, each by main number
/// and sub number.
///
/// `p3` < `p3_2` < `p3a10` < `p12`. The id itself breaks ties.
pub fn question_sort_key(id: &str) -> (u8, u64, u64, String) {
    let (family, rest) = if let Some(rest) = id.strip_prefix("cp") {
        (0, rest)
    } else if let Some(rest) = id.strip_prefix('p') {
        (1, rest)
    } else {
        (2, id)
    };
    let (main, rest) = leading_number(rest);
    let rest = rest.trim_start_matches(|c: char| !c.is_ascii_digit());
    let (sub, _) = leading_number(rest);
    (
        family,
        main.unwrap_or(u64::MAX),
        sub.unwrap_or(0),
        id.to_string(),
    )
}

pub fn sort_questions(questions: &mut [Question]) {
    questions.sort_by_cached_key(|q| question_sort_key(&q.id));
}

/// The question reports of one output unit.
#[derive(PartialEq, Debug, Clone)]
pub struct ReportUnit {
    pub name: String,
    pub questions: Vec<QuestionReport>,
}

/// Builds the reports of every question of a section, grouped by output unit.
///
/// `disaggregations_of` gives the configured disaggregations of a question id. A question
/// whose report fails is passed to `on_error` and left out; the error handler may abort the
/// whole section by returning the error.
pub fn build_section_units<F, E>(
    store: &dyn AttributeStore,
    catalog: &Catalog,
    section: &str,
    sort: bool,
    disaggregations_of: F,
    mut on_error: E,
) -> ReportResult<Vec<ReportUnit>>
where
    F: Fn(&str) -> Vec<String>,
    E: FnMut(&Question, ReportMode, ReportError) -> ReportResult<()>,
{
    let mut questions = store.questions_by_section(section)?;
    if sort {
        sort_questions(&mut questions);
    }
    info!(
        "build_section_units: section {}: {} questions",
        section,
        questions.len()
    );
    let mut units: Vec<ReportUnit> = Vec::new();
    for q in questions.iter() {
        let names = disaggregations_of(&q.id);
        for rm in report_modes(q) {
            let unit = rm.unit_name(section);
            match build_question_report(store, catalog, q, &names, rm.mode) {
                Ok(qr) => match units.iter_mut().find(|u| u.name == unit) {
                    Some(u) => u.questions.push(qr),
                    None => units.push(ReportUnit {
                        name: unit,
                        questions: vec![qr],
                    }),
                },
                Err(e) => on_error(q, rm, e)?,
            }
        }
    }
    Ok(units)
}
