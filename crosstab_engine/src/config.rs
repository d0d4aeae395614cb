// ********* Input data structures ***********

use snafu::prelude::*;
use std::fmt::Display;

/// The identifier of a response option, as returned by the attribute store.
///
/// Coded answers carry the numeric option id. Raw answers without an option vocabulary carry
/// their own value, and some derived answer keys (modal split buckets) are plain labels.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub enum OptionId {
    Code(i64),
    Text(String),
}

impl OptionId {
    /// Builds an id from a real value coming out of the store.
    ///
    /// Integral reals collapse to codes so that `3.0` and `3` land on the same pivot row.
    pub fn from_real(x: f64) -> OptionId {
        if x.fract() == 0.0 && x.is_finite() && x.abs() < i64::MAX as f64 {
            OptionId::Code(x as i64)
        } else {
            OptionId::Text(x.to_string())
        }
    }
}

impl Display for OptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionId::Code(c) => write!(f, "{}", c),
            OptionId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One row of a disaggregation query result, in long form.
///
/// Any of the fields may be missing in the store (outer joins, uncoercible values). Rows with a
/// missing id, label or group never reach a pivot cell.
#[derive(PartialEq, Debug, Clone)]
pub struct LongRow {
    pub option_id: Option<OptionId>,
    pub label: Option<String>,
    pub group: Option<String>,
    pub value: Option<f64>,
}

impl LongRow {
    pub fn new(option_id: OptionId, label: &str, group: &str, value: f64) -> LongRow {
        LongRow {
            option_id: Some(option_id),
            label: Some(label.to_string()),
            group: Some(group.to_string()),
            value: Some(value),
        }
    }
}

/// The type tag of questions that get a weighted-average summary row.
pub const NUMERIC_QUESTION_TYPE: &str = "numerica";

/// A survey question, as enumerated by the attribute store.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Question {
    pub id: String,
    pub section: String,
    pub text: String,
    pub kind: Option<String>,
    pub notes: Option<String>,
}

impl Question {
    pub fn is_numeric(&self) -> bool {
        self.kind.as_deref() == Some(NUMERIC_QUESTION_TYPE)
    }

    /// `cp` questions belong to the control panel family and are reported twice.
    pub fn is_control_panel(&self) -> bool {
        self.id.starts_with("cp")
    }
}

// ********* Configuration **********

/// How respondents are counted and which respondents are counted.
///
/// The two switches are independent of each other.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct FilterMode {
    /// Sum the survey weight of each respondent instead of a constant 1.
    pub weighted: bool,
    /// Restrict the aggregation to respondents of the initial sample.
    pub initial_only: bool,
}

impl FilterMode {
    /// The default mode of every report.
    pub const WEIGHTED_INITIAL: FilterMode = FilterMode {
        weighted: true,
        initial_only: true,
    };

    /// The mode of the "without weighting factor" twin of control panel reports.
    pub const UNWEIGHTED_ALL: FilterMode = FilterMode {
        weighted: false,
        initial_only: false,
    };
}

impl Default for FilterMode {
    fn default() -> Self {
        FilterMode::WEIGHTED_INITIAL
    }
}

// ******** Errors *********

/// Errors that prevent a report table from being produced.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ReportError {
    #[snafu(display("Disaggregation '{name}' is not supported"))]
    UnsupportedDisaggregation { name: String },

    #[snafu(display(
        "Invalid region id {region_id}: must be 1 (AMM), 2 (Periferia) or 3 (Resto NL)"
    ))]
    InvalidRegion { region_id: u32 },

    #[snafu(display("The table has no Total row to divide by"))]
    MissingTotalRow {},

    #[snafu(display("Attribute store failure ({context}): {message}"))]
    Store { context: String, message: String },
}

pub type ReportResult<T> = Result<T, ReportError>;
