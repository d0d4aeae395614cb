use crate::survey::*;

use std::collections::HashMap;

/// The run configuration file. Every key is optional.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    pub database: Option<String>,
    pub disaggregations: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    pub layout: Option<String>,
    #[serde(rename = "workbookName")]
    pub workbook_name: Option<String>,
    #[serde(rename = "sortQuestions")]
    pub sort_questions: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Layout {
    /// One workbook per output unit, one sheet per question.
    PerSection,
    /// One workbook, one sheet per output unit.
    Single,
}

impl Layout {
    pub fn parse(s: &str) -> SurveyResult<Layout> {
        match s {
            "per-section" => Ok(Layout::PerSection),
            "single" => Ok(Layout::Single),
            x => InvalidLayoutSnafu { layout: x }.fail(),
        }
    }
}

pub const DEFAULT_OUTPUT_DIRECTORY: &str = "output";
pub const DEFAULT_WORKBOOK_NAME: &str = "reporte";

/// The settings of a run, once the command line and the configuration file are merged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub database: PathBuf,
    pub disaggregations: PathBuf,
    pub output_directory: PathBuf,
    pub layout: Layout,
    pub workbook_name: String,
    pub sort_questions: bool,
    pub summary: Option<String>,
    pub reference: Option<String>,
    pub strict: bool,
}

fn read_json_file(path: &Path) -> SurveyResult<JSValue> {
    let p = path.display().to_string();
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path: p.clone() })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path: p })?;
    Ok(js)
}

pub fn read_run_config(path: &Path) -> SurveyResult<RunConfig> {
    let js = read_json_file(path)?;
    let config: RunConfig = serde_json::from_value(js).context(ParsingJsonSnafu {
        path: path.display().to_string(),
    })?;
    Ok(config)
}

/// Paths of the configuration file are relative to the directory of that file.
fn config_relative(config_dir: &Path, p: &str) -> PathBuf {
    let pb = PathBuf::from(p);
    if pb.is_absolute() {
        pb
    } else {
        config_dir.join(pb)
    }
}

/// Merges the command line with the optional configuration file. The command line wins.
pub fn resolve_settings(args: &Args) -> SurveyResult<Settings> {
    let (config, config_dir) = match &args.config {
        Some(cp) => {
            let p = Path::new(cp.as_str());
            let config = read_run_config(p)?;
            let dir = p.parent().map(|d| d.to_path_buf()).unwrap_or_default();
            (config, dir)
        }
        None => (RunConfig::default(), PathBuf::new()),
    };
    debug!("resolve_settings: config: {:?}", config);

    let pick = |cli: &Option<String>, file: &Option<String>| -> Option<PathBuf> {
        match (cli, file) {
            (Some(x), _) => Some(PathBuf::from(x)),
            (None, Some(x)) => Some(config_relative(&config_dir, x)),
            (None, None) => None,
        }
    };

    let database = pick(&args.database, &config.database).context(MissingSettingSnafu {
        name: "database",
    })?;
    let disaggregations = pick(&args.disaggregations, &config.disaggregations).context(
        MissingSettingSnafu {
            name: "disaggregations",
        },
    )?;
    let output_directory = pick(&args.out_dir, &config.output_directory)
        .unwrap_or_else(|| config_relative(&config_dir, DEFAULT_OUTPUT_DIRECTORY));
    let layout = match args.layout.as_ref().or(config.layout.as_ref()) {
        Some(l) => Layout::parse(l)?,
        None => Layout::PerSection,
    };
    let workbook_name = args
        .workbook_name
        .clone()
        .or_else(|| config.workbook_name.clone())
        .unwrap_or_else(|| DEFAULT_WORKBOOK_NAME.to_string());

    Ok(Settings {
        database,
        disaggregations,
        output_directory,
        layout,
        workbook_name,
        sort_questions: args.sort_questions || config.sort_questions.unwrap_or(false),
        summary: args.summary.clone().filter(|s| !s.is_empty()),
        reference: args.reference.clone(),
        strict: args.strict,
    })
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DisaggregationEntry {
    #[serde(rename = "type")]
    pub name: String,
}

/// The disaggregations configured for each question.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct DisaggregationPlan {
    by_question: HashMap<String, Vec<DisaggregationEntry>>,
}

impl DisaggregationPlan {
    pub fn from_json(js: JSValue) -> serde_json::Result<DisaggregationPlan> {
        let by_question: HashMap<String, Vec<DisaggregationEntry>> = serde_json::from_value(js)?;
        Ok(DisaggregationPlan { by_question })
    }

    /// The disaggregation names of a question, in configuration order. Unknown questions have
    /// none.
    pub fn names_for(&self, question_id: &str) -> Vec<String> {
        match self.by_question.get(question_id) {
            Some(entries) => entries.iter().map(|e| e.name.clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Warns about the names that the catalog does not know. Their questions will fail.
    pub fn check(&self, catalog: &Catalog) -> Vec<String> {
        let mut unknown: Vec<String> = self
            .by_question
            .values()
            .flatten()
            .map(|e| e.name.clone())
            .filter(|n| catalog.get(n).is_err())
            .collect();
        unknown.sort();
        unknown.dedup();
        if !unknown.is_empty() {
            warn!("Unsupported disaggregations in the configuration: {:?}", unknown);
        }
        unknown
    }
}

pub fn read_disaggregation_plan(path: &Path) -> SurveyResult<DisaggregationPlan> {
    let js = read_json_file(path)?;
    let plan = DisaggregationPlan::from_json(js).context(ParsingJsonSnafu {
        path: path.display().to_string(),
    })?;
    info!(
        "Read disaggregations for {} questions from {}",
        plan.by_question.len(),
        path.display()
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(cli: &[&str]) -> Args {
        let mut v = vec!["crosstab"];
        v.extend_from_slice(cli);
        Args::parse_from(v)
    }

    fn temp_dir(name: &str) -> PathBuf {
        let d = std::env::temp_dir().join(format!("crosstab_config_{}_{}", name, std::process::id()));
        fs::create_dir_all(&d).unwrap();
        d
    }

    #[test]
    fn plan_parsing() {
        let plan = DisaggregationPlan::from_json(json!({
            "p1": [{"type": "sexo"}, {"type": "municipio"}],
            "cp2": [{"type": "color_favorito"}]
        }))
        .unwrap();
        assert_eq!(plan.names_for("p1"), vec!["sexo", "municipio"]);
        assert!(plan.names_for("p9").is_empty());
        assert_eq!(plan.check(&Catalog::standard()), vec!["color_favorito"]);
    }

    #[test]
    fn plan_rejects_bad_shape() {
        assert!(DisaggregationPlan::from_json(json!({"p1": "sexo"})).is_err());
    }

    #[test]
    fn layouts() {
        assert_eq!(Layout::parse("single").unwrap(), Layout::Single);
        let err = Layout::parse("book").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown layout 'book': expected 'per-section' or 'single'"
        );
    }

    #[test]
    fn command_line_only() {
        let s = resolve_settings(&args(&[
            "--database",
            "survey.db",
            "--disaggregations",
            "d.json",
            "--sort-questions",
        ]))
        .unwrap();
        assert_eq!(s.database, PathBuf::from("survey.db"));
        assert_eq!(s.output_directory, PathBuf::from("output"));
        assert_eq!(s.layout, Layout::PerSection);
        assert_eq!(s.workbook_name, "reporte");
        assert!(s.sort_questions);
        assert!(!s.strict);
    }

    #[test]
    fn missing_database() {
        let err = resolve_settings(&args(&["--disaggregations", "d.json"])).unwrap_err();
        assert!(matches!(err, SurveyError::MissingSetting { ref name } if name == "database"));
    }

    #[test]
    fn config_file_is_relative_and_overridden() {
        let dir = temp_dir("relative");
        let cp = dir.join("run.json");
        fs::write(
            &cp,
            r#"{"database": "db/survey.db", "disaggregations": "/abs/d.json",
                "outputDirectory": "out", "layout": "single", "sortQuestions": true}"#,
        )
        .unwrap();
        let cps = cp.display().to_string();
        let s = resolve_settings(&args(&["--config", cps.as_str(), "--workbook-name", "todo"])).unwrap();
        assert_eq!(s.database, dir.join("db/survey.db"));
        assert_eq!(s.disaggregations, PathBuf::from("/abs/d.json"));
        assert_eq!(s.output_directory, dir.join("out"));
        assert_eq!(s.layout, Layout::Single);
        assert_eq!(s.workbook_name, "todo");
        assert!(s.sort_questions);

        let s = resolve_settings(&args(&[
            "--config",
            cps.as_str(),
            "--layout",
            "per-section",
            "--database",
            "other.db",
        ]))
        .unwrap();
        assert_eq!(s.layout, Layout::PerSection);
        assert_eq!(s.database, PathBuf::from("other.db"));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn unreadable_config() {
        let err = resolve_settings(&args(&["--config", "/nonexistent/run.json"])).unwrap_err();
        assert!(matches!(err, SurveyError::OpeningJson { .. }));
    }
}
