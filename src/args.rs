use clap::Parser;

/// This program writes cross-tabulated report workbooks from a survey database.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file with the configuration of the run. The other options
    /// override the values it contains. See the manual for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The SQLite survey database.
    #[clap(short, long, value_parser)]
    pub database: Option<String>,

    /// (file path) The JSON file listing the disaggregations of each question.
    #[clap(long, value_parser)]
    pub disaggregations: Option<String>,

    /// (directory, default 'output') Where the workbooks are written.
    #[clap(short, long, value_parser)]
    pub out_dir: Option<String>,

    /// (per-section or single, default per-section) One workbook per section with one sheet per
    /// question, or one workbook with one sheet per section.
    #[clap(long, value_parser)]
    pub layout: Option<String>,

    /// (default 'reporte') The name of the workbook for the single layout.
    #[clap(long, value_parser)]
    pub workbook_name: Option<String>,

    /// If passed, the questions of a section are ordered by id (cp first, then p) instead of the
    /// database order.
    #[clap(long, takes_value = false)]
    pub sort_questions: bool,

    /// (file path, 'stdout' or empty) If specified, a summary of all the tables is written in JSON
    /// format to the given location.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, the run fails when the
    /// computed summary does not match it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed, the first question that fails stops the run. Otherwise failing questions are
    /// skipped and reported at the end.
    #[clap(long, takes_value = false)]
    pub strict: bool,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
