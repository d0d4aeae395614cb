// SQL composition for disaggregation queries.
//
// A disaggregation is described as one or more aggregation passes over the answers of a single
// question. Each pass renders to one SELECT returning the long-form columns
// (id_respuesta, respuesta, grupo, valor). Only catalog constants are spliced into the SQL text;
// the question id is always a bound parameter.

use log::debug;

use crate::config::*;
use crate::metadata::*;

/// The named parameter carrying the question id.
pub const QUESTION_PARAM: &str = ":question_id";

/// The per-respondent survey weight.
pub const WEIGHT_COLUMN: &str = "r.factor_cvnl";

/// The three geographic regions of the state.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Region {
    Amm,
    Periferia,
    Resto,
}

impl Region {
    /// Maps the numeric region selector (1: AMM, 2: Periferia, 3: Resto NL).
    pub fn from_id(region_id: u32) -> ReportResult<Region> {
        match region_id {
            1 => Ok(Region::Amm),
            2 => Ok(Region::Periferia),
            3 => Ok(Region::Resto),
            _ => InvalidRegionSnafu { region_id }.fail(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Region::Amm => AMM_LABEL,
            Region::Periferia => PERIFERIA_LABEL,
            Region::Resto => RESTO_LABEL,
        }
    }

    fn condition(&self) -> String {
        match self {
            Region::Amm => format!("r.city_id IN ({})", id_list(&metro_city_ids())),
            Region::Periferia => format!("r.city_id IN ({})", id_list(&PERIFERIA_CITIES)),
            Region::Resto => format!("r.city_id NOT IN ({})", id_list(&metro_and_periferia_ids())),
        }
    }
}

/// How the response option (the pivot row) of a long row is derived.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AnswerKey {
    /// The coded option of the answer, or its raw value when the question has no vocabulary.
    Answer,
    /// The respondent's coded option for an attribute.
    AttributeOption { attribute: &'static str },
    /// Buckets of a respondent attribute. Id and label are both the bucket label.
    AttributeBuckets {
        attribute: &'static str,
        buckets: &'static [Bucket],
    },
}

/// How the group (the pivot column) of a long row is derived.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum GroupKey {
    /// The option label of a respondent attribute. With `only_codes`, other codes get no group.
    AttributeLabel {
        attribute: &'static str,
        only_codes: Option<&'static [i64]>,
    },
    /// Buckets of a respondent attribute. Codes outside every bucket go to `fallback`.
    AttributeBuckets {
        attribute: &'static str,
        buckets: &'static [Bucket],
        fallback: Option<&'static str>,
    },
    /// Age bands of a numeric respondent attribute.
    AgeBands {
        attribute: &'static str,
        bands: &'static [AgeBand],
    },
    /// The name of the metropolitan municipality of the respondent.
    MetroCity,
    /// AMM, Periferia or Resto NL.
    Region,
    Constant(&'static str),
}

/// A restriction of the respondents taking part in a pass.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum Filter {
    AttributeEquals { attribute: &'static str, code: i64 },
    CityEquals(i64),
    InRegion(Region),
    HasCity,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Aggregate {
    /// Sum of the respondent weights.
    Count,
    /// Weighted mean of the numeric answer value.
    WeightedMean,
}

/// One aggregation over the filtered respondents of a question.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Pass {
    pub answer: AnswerKey,
    pub group: GroupKey,
    pub filters: Vec<Filter>,
    pub aggregate: Aggregate,
}

impl Pass {
    pub fn count(group: GroupKey) -> Pass {
        Pass {
            answer: AnswerKey::Answer,
            group,
            filters: Vec::new(),
            aggregate: Aggregate::Count,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Pass {
        self.filters.push(filter);
        self
    }

    pub fn to_sql(&self, mode: FilterMode) -> String {
        let mut joins: Vec<String> = Vec::new();
        let mut conditions: Vec<String> = Vec::new();

        let (id_expr, label_expr) = match &self.answer {
            AnswerKey::Answer => {
                joins.push(
                    "LEFT JOIN options o ON a.question_id = o.question_id AND a.option_id = o.option_id"
                        .to_string(),
                );
                (
                    "COALESCE(o.option_id, a.value)".to_string(),
                    "COALESCE(o.option_label, CAST(a.value AS TEXT))".to_string(),
                )
            }
            AnswerKey::AttributeOption { attribute } => {
                joins.push(attribute_join("aa", attribute));
                joins.push(
                    "LEFT JOIN options ao ON aa.question_id = ao.question_id AND aa.value = ao.option_id"
                        .to_string(),
                );
                conditions.push("aa.value IS NOT NULL".to_string());
                ("aa.value".to_string(), "ao.option_label".to_string())
            }
            AnswerKey::AttributeBuckets { attribute, buckets } => {
                joins.push(attribute_join("aa", attribute));
                conditions.push("aa.value IS NOT NULL".to_string());
                let case = bucket_case("aa.value", buckets, None);
                (case.clone(), case)
            }
        };

        let group_expr = match &self.group {
            GroupKey::AttributeLabel {
                attribute,
                only_codes,
            } => {
                joins.push(attribute_join("ga", attribute));
                let restriction = match only_codes {
                    Some(codes) => format!(" AND ga.value IN ({})", id_list(codes)),
                    None => String::new(),
                };
                joins.push(format!(
                    "LEFT JOIN options og ON ga.question_id = og.question_id AND ga.value = og.option_id{}",
                    restriction
                ));
                "og.option_label".to_string()
            }
            GroupKey::AttributeBuckets {
                attribute,
                buckets,
                fallback,
            } => {
                joins.push(attribute_join("ga", attribute));
                bucket_case("ga.value", buckets, *fallback)
            }
            GroupKey::AgeBands { attribute, bands } => {
                joins.push(attribute_join("ga", attribute));
                conditions.push("ga.value IS NOT NULL".to_string());
                age_case("ga.value", bands)
            }
            GroupKey::MetroCity => {
                let mut case = String::from("CASE");
                for (city_id, name) in METRO_CITIES.iter() {
                    case.push_str(&format!(
                        " WHEN r.city_id = {} THEN {}",
                        city_id,
                        sql_literal(name)
                    ));
                }
                case.push_str(" END");
                case
            }
            GroupKey::Region => format!(
                "CASE WHEN {} THEN {} WHEN {} THEN {} WHEN {} THEN {} END",
                Region::Amm.condition(),
                sql_literal(AMM_LABEL),
                Region::Periferia.condition(),
                sql_literal(PERIFERIA_LABEL),
                Region::Resto.condition(),
                sql_literal(RESTO_LABEL)
            ),
            GroupKey::Constant(label) => sql_literal(label),
        };

        for (idx, filter) in self.filters.iter().enumerate() {
            match filter {
                Filter::AttributeEquals { attribute, code } => {
                    let alias = format!("f{}", idx);
                    joins.push(attribute_join(&alias, attribute));
                    conditions.push(format!("{}.value = {}", alias, code));
                }
                Filter::CityEquals(city_id) => conditions.push(format!("r.city_id = {}", city_id)),
                Filter::InRegion(region) => conditions.push(region.condition()),
                Filter::HasCity => conditions.push("r.city_id IS NOT NULL".to_string()),
            }
        }

        if mode.initial_only {
            conditions.push("r.is_initial_respondent = 1".to_string());
        }

        let weight = weight_expr(mode);
        let value_expr = match self.aggregate {
            Aggregate::Count => format!("SUM({})", weight),
            Aggregate::WeightedMean => format!(
                "SUM(CAST(a.value AS REAL) * {w}) / SUM({w})",
                w = weight
            ),
        };

        let mut sql = format!(
            "SELECT\n    {} AS id_respuesta,\n    {} AS respuesta,\n    {} AS grupo,\n    {} AS valor\nFROM answers a\n",
            id_expr, label_expr, group_expr, value_expr
        );
        for j in joins.iter() {
            sql.push_str(j);
            sql.push('\n');
        }
        sql.push_str("JOIN responses r ON a.respondent_id = r.respondent_id\n");
        sql.push_str(&format!("WHERE a.question_id = {}\n", QUESTION_PARAM));
        for c in conditions.iter() {
            sql.push_str(&format!("  AND {}\n", c));
        }
        sql.push_str("GROUP BY id_respuesta, respuesta, grupo");
        sql
    }
}

/// The statements and named parameters of one disaggregation request.
///
/// The rows of all the statements are concatenated, in order, before pivoting.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct QuerySpec {
    pub statements: Vec<String>,
    pub params: Vec<(String, String)>,
}

impl QuerySpec {
    pub fn new(question_id: &str, mode: FilterMode, passes: &[Pass]) -> QuerySpec {
        let statements: Vec<String> = passes.iter().map(|p| p.to_sql(mode)).collect();
        debug!(
            "QuerySpec::new: question {:?} mode {:?}: {} statement(s)",
            question_id,
            mode,
            statements.len()
        );
        QuerySpec {
            statements,
            params: vec![(QUESTION_PARAM.to_string(), question_id.to_string())],
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

fn weight_expr(mode: FilterMode) -> &'static str {
    if mode.weighted {
        WEIGHT_COLUMN
    } else {
        "1"
    }
}

fn attribute_join(alias: &str, attribute: &str) -> String {
    format!(
        "LEFT JOIN respondent_attributes {a} ON a.respondent_id = {a}.respondent_id AND {a}.attribute = {}",
        sql_literal(attribute),
        a = alias
    )
}

fn bucket_case(column: &str, buckets: &[Bucket], fallback: Option<&str>) -> String {
    let mut case = String::from("CASE");
    for b in buckets.iter() {
        case.push_str(&format!(
            " WHEN {} IN ({}) THEN {}",
            column,
            id_list(b.codes),
            sql_literal(b.label)
        ));
    }
    if let Some(f) = fallback {
        case.push_str(&format!(" ELSE {}", sql_literal(f)));
    }
    case.push_str(" END");
    case
}

fn age_case(column: &str, bands: &[AgeBand]) -> String {
    let mut case = String::from("CASE");
    for b in bands.iter() {
        let cond = match b.upper {
            Some(upper) => format!("{} BETWEEN {} AND {}", column, b.lower, upper),
            None => format!("{} >= {}", column, b.lower),
        };
        case.push_str(&format!(" WHEN {} THEN {}", cond, sql_literal(b.label)));
    }
    case.push_str(" END");
    case
}

fn id_list(ids: &[i64]) -> String {
    ids.iter()
        .map(|x| x.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

fn sql_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
