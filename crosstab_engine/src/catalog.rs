// The closed registry of named disaggregations.

use log::debug;

use crate::config::*;
use crate::metadata::*;
use crate::query::*;

/// A named way of splitting the respondents of a question into groups.
///
/// Implementations only describe the aggregation passes. Pivoting, ordering and table extension
/// are shared by every disaggregation.
pub trait Disaggregation {
    fn name(&self) -> &str;

    /// The domain whose canonical column order applies to the pivot, if any.
    fn domain(&self) -> Option<Domain> {
        None
    }

    /// Geographic disaggregations already carry the state-wide aggregate as a column.
    fn is_geographic(&self) -> bool {
        false
    }

    fn passes(&self, mode: FilterMode) -> ReportResult<Vec<Pass>>;

    fn build_query(&self, question_id: &str, mode: FilterMode) -> ReportResult<QuerySpec> {
        let passes = self.passes(mode)?;
        Ok(QuerySpec::new(question_id, mode, &passes))
    }
}

/// Groups by the option label of one respondent attribute.
pub struct AttributeLookup {
    pub name: &'static str,
    pub attribute: &'static str,
    pub only_codes: Option<&'static [i64]>,
    pub domain: Option<Domain>,
}

impl AttributeLookup {
    pub fn new(name: &'static str, attribute: &'static str, domain: Option<Domain>) -> Self {
        AttributeLookup {
            name,
            attribute,
            only_codes: None,
            domain,
        }
    }
}

impl Disaggregation for AttributeLookup {
    fn name(&self) -> &str {
        self.name
    }

    fn domain(&self) -> Option<Domain> {
        self.domain
    }

    fn passes(&self, _mode: FilterMode) -> ReportResult<Vec<Pass>> {
        Ok(vec![Pass::count(GroupKey::AttributeLabel {
            attribute: self.attribute,
            only_codes: self.only_codes,
        })])
    }
}

/// Groups by buckets of the codes of one respondent attribute.
pub struct DerivedCategory {
    pub name: &'static str,
    pub attribute: &'static str,
    pub buckets: &'static [Bucket],
    pub fallback: Option<&'static str>,
}

impl Disaggregation for DerivedCategory {
    fn name(&self) -> &str {
        self.name
    }

    fn passes(&self, _mode: FilterMode) -> ReportResult<Vec<Pass>> {
        Ok(vec![Pass::count(GroupKey::AttributeBuckets {
            attribute: self.attribute,
            buckets: self.buckets,
            fallback: self.fallback,
        })])
    }
}

/// Groups by age band. Children are left out of initial-sample views.
pub struct AgeBands {
    pub name: &'static str,
    pub attribute: &'static str,
}

impl Disaggregation for AgeBands {
    fn name(&self) -> &str {
        self.name
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::Age)
    }

    fn passes(&self, mode: FilterMode) -> ReportResult<Vec<Pass>> {
        let first = if mode.initial_only {
            INITIAL_SAMPLE_FIRST_AGE_BAND
        } else {
            0
        };
        Ok(vec![Pass::count(GroupKey::AgeBands {
            attribute: self.attribute,
            bands: &AGE_BANDS[first..],
        })])
    }
}

/// Metro city, region and state tiers over the same respondents.
///
/// A respondent of a metro city contributes its full weight to its city, its region and the
/// state.
fn geographic_tiers(answer: AnswerKey, aggregate: Aggregate) -> Vec<Pass> {
    vec![
        Pass {
            answer: answer.clone(),
            group: GroupKey::MetroCity,
            filters: vec![Filter::InRegion(Region::Amm)],
            aggregate,
        },
        Pass {
            answer: answer.clone(),
            group: GroupKey::Region,
            filters: vec![Filter::HasCity],
            aggregate,
        },
        Pass {
            answer,
            group: GroupKey::Constant(STATE_LABEL),
            filters: vec![Filter::HasCity],
            aggregate,
        },
    ]
}

/// Response distribution per municipality, region and state.
pub struct Geography {
    pub name: &'static str,
}

impl Disaggregation for Geography {
    fn name(&self) -> &str {
        self.name
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::Geography)
    }

    fn is_geographic(&self) -> bool {
        true
    }

    fn passes(&self, _mode: FilterMode) -> ReportResult<Vec<Pass>> {
        Ok(geographic_tiers(AnswerKey::Answer, Aggregate::Count))
    }
}

/// Weighted mean of a numeric answer (travel time) per transport mode and geographic tier.
///
/// This is the only disaggregation whose cells are means rather than weighted counts.
pub struct TravelTimeByGeography {
    pub name: &'static str,
    pub mode_attribute: &'static str,
}

impl Disaggregation for TravelTimeByGeography {
    fn name(&self) -> &str {
        self.name
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::Geography)
    }

    fn is_geographic(&self) -> bool {
        true
    }

    fn passes(&self, _mode: FilterMode) -> ReportResult<Vec<Pass>> {
        Ok(geographic_tiers(
            AnswerKey::AttributeOption {
                attribute: self.mode_attribute,
            },
            Aggregate::WeightedMean,
        ))
    }
}

/// Aggregated modal split per geographic tier. The rows are transport mode buckets.
pub struct ModalSplitByGeography {
    pub name: &'static str,
    pub mode_attribute: &'static str,
}

impl Disaggregation for ModalSplitByGeography {
    fn name(&self) -> &str {
        self.name
    }

    fn domain(&self) -> Option<Domain> {
        Some(Domain::Geography)
    }

    fn is_geographic(&self) -> bool {
        true
    }

    fn passes(&self, _mode: FilterMode) -> ReportResult<Vec<Pass>> {
        Ok(geographic_tiers(
            AnswerKey::AttributeBuckets {
                attribute: self.mode_attribute,
                buckets: &MODAL_SPLIT_BUCKETS,
            },
            Aggregate::Count,
        ))
    }
}

/// Every respondent in a single "Total" group.
pub struct Unconditional {
    pub name: &'static str,
}

impl Disaggregation for Unconditional {
    fn name(&self) -> &str {
        self.name
    }

    fn passes(&self, _mode: FilterMode) -> ReportResult<Vec<Pass>> {
        Ok(vec![Pass::count(GroupKey::Constant("Total"))])
    }
}

/// Income distribution inside one region, selected by its numeric id.
pub struct RegionalIncome {
    pub name: &'static str,
    pub region_id: u32,
}

impl Disaggregation for RegionalIncome {
    fn name(&self) -> &str {
        self.name
    }

    fn passes(&self, _mode: FilterMode) -> ReportResult<Vec<Pass>> {
        let region = Region::from_id(self.region_id)?;
        Ok(vec![Pass::count(GroupKey::AttributeLabel {
            attribute: "ingreso",
            only_codes: None,
        })
        .with_filter(Filter::InRegion(region))])
    }
}

/// Another disaggregation, restricted to the respondents matching one more filter.
///
/// Without `inherits_domain` the columns keep the order in which they were observed.
pub struct Restricted {
    pub name: &'static str,
    pub inner: Box<dyn Disaggregation>,
    pub filter: Filter,
    pub inherits_domain: bool,
}

impl Disaggregation for Restricted {
    fn name(&self) -> &str {
        self.name
    }

    fn domain(&self) -> Option<Domain> {
        if self.inherits_domain {
            self.inner.domain()
        } else {
            None
        }
    }

    fn is_geographic(&self) -> bool {
        self.inner.is_geographic()
    }

    fn passes(&self, mode: FilterMode) -> ReportResult<Vec<Pass>> {
        let passes = self.inner.passes(mode)?;
        Ok(passes
            .into_iter()
            .map(|p| p.with_filter(self.filter.clone()))
            .collect())
    }
}

fn by_sex(name: &'static str, inner: Box<dyn Disaggregation>, code: i64) -> Box<dyn Disaggregation> {
    Box::new(Restricted {
        name,
        inner,
        filter: Filter::AttributeEquals {
            attribute: "sexo",
            code,
        },
        inherits_domain: true,
    })
}

fn paid_work() -> Box<dyn Disaggregation> {
    Box::new(AttributeLookup {
        name: "trabajo_remunerado",
        attribute: "tipo_trabajo",
        only_codes: Some(PAID_WORK_CODES),
        domain: None,
    })
}

fn employment_type() -> Box<dyn Disaggregation> {
    Box::new(DerivedCategory {
        name: "tipo_trabajo",
        attribute: "tipo_trabajo",
        buckets: &EMPLOYMENT_BUCKETS,
        fallback: Some(EMPLOYMENT_FALLBACK),
    })
}

fn current_education() -> Box<dyn Disaggregation> {
    Box::new(AttributeLookup::new(
        "nivel_actual_estudios",
        "nivel_actual_estudios",
        Some(Domain::Education),
    ))
}

fn income() -> Box<dyn Disaggregation> {
    Box::new(AttributeLookup::new("ingreso", "ingreso", Some(Domain::Income)))
}

fn municipality() -> Box<dyn Disaggregation> {
    Box::new(Geography { name: "municipio" })
}

/// Income restricted to one metro city: (name, city id).
const INCOME_BY_CITY: [(&str, i64); 11] = [
    ("ingreso_por_apodaca", 6),
    ("ingreso_por_guadalupe", 26),
    ("ingreso_por_juarez", 31),
    ("ingreso_por_monterrey", 39),
    ("ingreso_por_san_nicolas", 46),
    ("ingreso_por_san_pedro", 19),
    ("ingreso_por_santiago", 49),
    ("ingreso_por_cadereyta", 9),
    ("ingreso_por_santa_catarina", 48),
    ("ingreso_por_garcia", 18),
    ("ingreso_por_escobedo", 21),
];

/// The registry of disaggregations, addressable by name.
pub struct Catalog {
    entries: Vec<Box<dyn Disaggregation>>,
}

impl Catalog {
    pub fn empty() -> Catalog {
        Catalog {
            entries: Vec::new(),
        }
    }

    /// Adds a disaggregation. A previous entry with the same name is replaced.
    pub fn register(&mut self, d: Box<dyn Disaggregation>) {
        self.entries.retain(|e| e.name() != d.name());
        self.entries.push(d);
    }

    pub fn get(&self, name: &str) -> ReportResult<&dyn Disaggregation> {
        match self.entries.iter().find(|e| e.name() == name) {
            Some(d) => Ok(d.as_ref()),
            None => UnsupportedDisaggregationSnafu { name }.fail(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The disaggregations of the survey instrument.
    pub fn standard() -> Catalog {
        let mut c = Catalog::empty();

        c.register(paid_work());
        c.register(by_sex("trabajo_remunerado_por_hombres", paid_work(), SEX_MALE));
        c.register(by_sex("trabajo_remunerado_por_mujeres", paid_work(), SEX_FEMALE));
        c.register(employment_type());
        c.register(by_sex("tipo_trabajo_por_hombres", employment_type(), SEX_MALE));
        c.register(by_sex("tipo_trabajo_por_mujeres", employment_type(), SEX_FEMALE));

        c.register(Box::new(AttributeLookup::new(
            "afiliacion_servicio_salud",
            "afiliacion_servicio_salud",
            None,
        )));
        c.register(Box::new(AttributeLookup::new(
            "servicio_salud_donde_se_atendio",
            "servicio_salud_donde_se_atendio",
            None,
        )));
        c.register(Box::new(DerivedCategory {
            name: "tipo_servicio_salud_donde_se_atendio",
            attribute: "servicio_salud_donde_se_atendio",
            buckets: &HEALTH_SERVICE_BUCKETS,
            fallback: None,
        }));
        c.register(Box::new(AttributeLookup::new("tipo_consulta", "tipo_consulta", None)));

        c.register(Box::new(AttributeLookup::new(
            "nivel_max_estudios",
            "nivel_max_estudios",
            Some(Domain::Education),
        )));
        c.register(current_education());
        c.register(Box::new(Restricted {
            name: "nivel_actual_estudios_por_escuela_privada",
            inner: current_education(),
            filter: Filter::AttributeEquals {
                attribute: "tipo_escuela",
                code: SCHOOL_PRIVATE,
            },
            inherits_domain: true,
        }));
        c.register(Box::new(Restricted {
            name: "nivel_actual_estudios_por_escuela_publica",
            inner: current_education(),
            filter: Filter::AttributeEquals {
                attribute: "tipo_escuela",
                code: SCHOOL_PUBLIC,
            },
            inherits_domain: true,
        }));
        c.register(Box::new(AttributeLookup::new(
            "tipo_escuela",
            "tipo_escuela",
            Some(Domain::SchoolType),
        )));

        c.register(Box::new(AttributeLookup::new("sexo", "sexo", Some(Domain::Sex))));
        c.register(Box::new(AgeBands {
            name: "edad",
            attribute: "edad_anos",
        }));
        c.register(Box::new(Unconditional { name: "totales" }));

        c.register(municipality());
        c.register(by_sex("municipio_por_hombres", municipality(), SEX_MALE));
        c.register(by_sex("municipio_por_mujeres", municipality(), SEX_FEMALE));
        c.register(Box::new(TravelTimeByGeography {
            name: "promedio_modo_transporte_y_municipio",
            mode_attribute: "modo_transporte",
        }));
        c.register(Box::new(ModalSplitByGeography {
            name: "particion_modal_agregada_por_municipio",
            mode_attribute: "modo_transporte",
        }));

        c.register(income());
        for (name, city_id) in INCOME_BY_CITY.iter() {
            c.register(Box::new(Restricted {
                name: *name,
                inner: income(),
                filter: Filter::CityEquals(*city_id),
                inherits_domain: false,
            }));
        }
        c.register(Box::new(RegionalIncome {
            name: "ingreso_por_region_amm",
            region_id: 1,
        }));
        c.register(Box::new(RegionalIncome {
            name: "ingreso_por_region_periferia",
            region_id: 2,
        }));
        c.register(Box::new(RegionalIncome {
            name: "ingreso_por_region_resto_nl",
            region_id: 3,
        }));

        debug!("Catalog::standard: {} disaggregations", c.len());
        c
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::standard()
    }
}
