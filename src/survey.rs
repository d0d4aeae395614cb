use log::{debug, error, info, warn};

use crosstab_engine::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::survey::config_reader::*;
use crate::survey::io_xlsx::*;
use crate::survey::store_sqlite::*;
use crate::survey::summary::*;

pub mod config_reader;
mod io_xlsx;
mod store_sqlite;
mod summary;

#[derive(Debug, Snafu)]
pub enum SurveyError {
    #[snafu(display("Error opening database {path}"))]
    OpeningDatabase {
        source: rusqlite::Error,
        path: String,
    },
    #[snafu(display("Error reading file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error creating directory {path}"))]
    CreatingDirectory {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing workbook {path}"))]
    WritingWorkbook {
        source: rust_xlsxwriter::XlsxError,
        path: String,
    },
    #[snafu(display("Error serializing the summary"))]
    SerializingSummary { source: serde_json::Error },
    #[snafu(display("Error writing summary {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(
        "Missing setting '{name}': pass it on the command line or in the configuration file"
    ))]
    MissingSetting { name: String },
    #[snafu(display("Unknown layout '{layout}': expected 'per-section' or 'single'"))]
    InvalidLayout { layout: String },
    #[snafu(display("Error building the reports of section {section}"))]
    Section {
        source: ReportError,
        section: String,
    },
    #[snafu(display("Error reading the sections of the survey"))]
    ReadingSections { source: ReportError },
    #[snafu(display("{count} question report(s) failed, see the log for details"))]
    FailedQuestions { count: usize },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SurveyResult<T> = Result<T, SurveyError>;

/// Builds the report units of every section, in store order.
///
/// Returns the units and the number of question reports that failed. In strict mode the first
/// failure stops everything.
pub fn build_units(
    store: &dyn AttributeStore,
    catalog: &Catalog,
    plan: &DisaggregationPlan,
    sort_questions: bool,
    strict: bool,
) -> SurveyResult<(Vec<ReportUnit>, usize)> {
    let sections = store.sections().context(ReadingSectionsSnafu {})?;
    info!("{} sections: {:?}", sections.len(), sections);
    let mut units: Vec<ReportUnit> = Vec::new();
    let mut failures: usize = 0;
    for section in sections.iter() {
        let mut section_units = build_section_units(
            store,
            catalog,
            section,
            sort_questions,
            |qid| plan.names_for(qid),
            |q, rm, e| {
                if strict {
                    error!("Question {} ({}) failed: {}", q.id, rm.unit_name(section), e);
                    Err(e)
                } else {
                    warn!("Skipping question {} ({}): {}", q.id, rm.unit_name(section), e);
                    failures += 1;
                    Ok(())
                }
            },
        )
        .context(SectionSnafu {
            section: section.clone(),
        })?;
        info!(
            "Report generated for {} section: {} unit(s)",
            section,
            section_units.len()
        );
        units.append(&mut section_units);
    }
    Ok((units, failures))
}

fn write_units(units: &[ReportUnit], settings: &Settings) -> SurveyResult<()> {
    let dir = settings.output_directory.as_path();
    fs::create_dir_all(dir).context(CreatingDirectorySnafu {
        path: dir.display().to_string(),
    })?;
    match settings.layout {
        Layout::PerSection => {
            for unit in units.iter() {
                let p = dir.join(format!("{}.xlsx", unit.name));
                write_unit_workbook(&p, unit)?;
            }
        }
        Layout::Single => {
            let p = dir.join(format!("{}.xlsx", settings.workbook_name));
            write_single_workbook(&p, units)?;
        }
    }
    Ok(())
}

/// Runs the whole program: reads the configuration, builds every report and writes the outputs.
pub fn run(args: &Args) -> SurveyResult<()> {
    let settings = resolve_settings(args)?;
    info!("settings: {:?}", settings);

    let plan = read_disaggregation_plan(&settings.disaggregations)?;
    let catalog = Catalog::standard();
    plan.check(&catalog);

    let (units, failures) = {
        let store = SqliteStore::open(&settings.database)?;
        build_units(
            &store,
            &catalog,
            &plan,
            settings.sort_questions,
            settings.strict,
        )?
    };

    write_units(&units, &settings)?;

    if settings.summary.is_some() || settings.reference.is_some() {
        let pretty_js_stats = pretty_summary(&units)?;
        if let Some(out) = &settings.summary {
            write_summary(out, &pretty_js_stats)?;
        }
        if let Some(reference) = &settings.reference {
            check_reference(reference, &pretty_js_stats)?;
        }
    }

    if failures > 0 {
        return FailedQuestionsSnafu { count: failures }.fail();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::survey::store_sqlite::fixture;
    use clap::Parser;

    fn plan() -> DisaggregationPlan {
        DisaggregationPlan::from_json(json!({
            "p1": [{"type": "sexo"}],
            "p20": [{"type": "color_favorito"}]
        }))
        .unwrap()
    }

    #[test]
    fn failing_questions_are_skipped() {
        let (units, failures) =
            build_units(&fixture::store(), &Catalog::standard(), &plan(), false, false).unwrap();
        assert_eq!(failures, 1);
        let ids: Vec<&str> = units[0]
            .questions
            .iter()
            .map(|q| q.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["p1"]);
    }

    #[test]
    fn strict_stops_at_first_failure() {
        let err = build_units(&fixture::store(), &Catalog::standard(), &plan(), false, true)
            .unwrap_err();
        match err {
            SurveyError::Section { section, source } => {
                assert_eq!(section, "movilidad");
                assert!(matches!(source, ReportError::UnsupportedDisaggregation { .. }));
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn run_writes_workbooks() {
        let dir = std::env::temp_dir().join(format!("crosstab_run_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let db = dir.join("survey.db");
        fixture::write_db(&db);
        let plan_path = dir.join("d.json");
        fs::write(&plan_path, r#"{"cp1": [{"type": "totales"}]}"#).unwrap();
        let out = dir.join("out");
        let args = Args::parse_from(vec![
            "crosstab".to_string(),
            "--database".to_string(),
            db.display().to_string(),
            "--disaggregations".to_string(),
            plan_path.display().to_string(),
            "--out-dir".to_string(),
            out.display().to_string(),
        ]);
        run(&args).unwrap();
        for unit in ["movilidad", "salud", "salud_sin_factor"] {
            assert!(out.join(format!("{}.xlsx", unit)).exists());
        }
        fs::remove_dir_all(dir).unwrap();
    }
}
