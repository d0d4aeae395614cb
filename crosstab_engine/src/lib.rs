/*!
Cross-tabulated survey reports.

For each survey question, `crosstab_engine` computes the distribution of the answers broken down
by a disaggregation (sex, age, municipality, income, ...), and derives the absolute and relative
tables that end up in the report workbooks.

The main entry points are [build_disaggregation_report] for a single pivot table and
[build_question_report] for all the tables of a question. Data is read through the
[AttributeStore] trait. See the [manual] for the list of disaggregations.
*/

mod catalog;
mod config;
mod extend;
pub mod manual;
mod metadata;
mod pivot;
mod query;
mod report;

pub use crate::catalog::*;
pub use crate::config::*;
pub use crate::extend::*;
pub use crate::metadata::*;
pub use crate::pivot::*;
pub use crate::query::*;
pub use crate::report::*;
