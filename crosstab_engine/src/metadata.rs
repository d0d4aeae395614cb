// Static reference data of the survey instrument.
//
// Everything in this module is curated by hand and mirrors the coded vocabularies stored in the
// survey database. Labels must match the stored option labels character for character, since
// they are used both as SQL literals and as pivot column names.

/// Answer codes for "no data", "does not know" and "no answer".
///
/// These codes are shared by the numeric questions of the instrument.
pub const SENTINEL_CODES: [i64; 3] = [7777, 8888, 9999];

pub fn is_sentinel(x: f64) -> bool {
    SENTINEL_CODES.iter().any(|c| *c as f64 == x)
}

// **** Geography ****

/// Municipalities of the metropolitan area (AMM), in canonical column order.
pub const METRO_CITIES: [(i64, &str); 11] = [
    (6, "Apodaca"),
    (9, "Cadereyta Jiménez"),
    (18, "García"),
    (21, "General Escobedo"),
    (26, "Guadalupe"),
    (31, "Juárez"),
    (39, "Monterrey"),
    (46, "San Nicolás de los Garza"),
    (19, "San Pedro Garza García"),
    (48, "Santa Catarina"),
    (49, "Santiago"),
];

/// Municipalities of the periphery ring around the metropolitan area.
pub const PERIFERIA_CITIES: [i64; 10] = [1, 4, 10, 12, 17, 25, 27, 33, 41, 45];

pub const AMM_LABEL: &str = "AMM";
pub const PERIFERIA_LABEL: &str = "Periferia";
pub const RESTO_LABEL: &str = "Resto NL";
pub const STATE_LABEL: &str = "Nuevo León";

pub fn metro_city_ids() -> Vec<i64> {
    METRO_CITIES.iter().map(|(id, _)| *id).collect()
}

pub fn metro_city_name(city_id: i64) -> Option<&'static str> {
    METRO_CITIES
        .iter()
        .find(|(id, _)| *id == city_id)
        .map(|(_, name)| *name)
}

/// The metro and periphery ids together. Everything else with a city is "Resto NL".
pub fn metro_and_periferia_ids() -> Vec<i64> {
    let mut ids = metro_city_ids();
    ids.extend(PERIFERIA_CITIES.iter());
    ids
}

// **** Age ****

/// An inclusive range of ages. The last band has no upper bound.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct AgeBand {
    pub lower: u32,
    pub upper: Option<u32>,
    pub label: &'static str,
}

pub const AGE_BANDS: [AgeBand; 10] = [
    AgeBand { lower: 0, upper: Some(5), label: "0-5" },
    AgeBand { lower: 6, upper: Some(12), label: "6-12" },
    AgeBand { lower: 13, upper: Some(17), label: "13-17" },
    AgeBand { lower: 18, upper: Some(24), label: "18-24" },
    AgeBand { lower: 25, upper: Some(34), label: "25-34" },
    AgeBand { lower: 35, upper: Some(44), label: "35-44" },
    AgeBand { lower: 45, upper: Some(54), label: "45-54" },
    AgeBand { lower: 55, upper: Some(64), label: "55-64" },
    AgeBand { lower: 65, upper: Some(74), label: "65-74" },
    AgeBand { lower: 75, upper: None, label: "75 o más" },
];

/// Initial-sample respondents are adults: their bands start at 18-24.
pub const INITIAL_SAMPLE_FIRST_AGE_BAND: usize = 3;

// **** Coded buckets ****

/// A named set of attribute codes.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct Bucket {
    pub codes: &'static [i64],
    pub label: &'static str,
}

pub const EMPLOYMENT_BUCKETS: [Bucket; 2] = [
    Bucket { codes: &[1, 4, 6], label: "Trabajo remunerado" },
    Bucket { codes: &[5], label: "Trabajo no remunerado" },
];

pub const EMPLOYMENT_FALLBACK: &str = "Otro";

/// Employment codes that count as paid work.
pub const PAID_WORK_CODES: &[i64] = &[1, 4, 6];

pub const HEALTH_SERVICE_BUCKETS: [Bucket; 2] = [
    Bucket { codes: &[2, 3, 7, 8, 9, 10, 12, 13], label: "Servicios Privados" },
    Bucket { codes: &[1, 4, 5, 6, 11], label: "Servicios Publicos" },
];

pub const MODAL_SPLIT_BUCKETS: [Bucket; 7] = [
    Bucket { codes: &[3, 4, 5, 9], label: "Medios motorizados no colectivos" },
    Bucket { codes: &[1, 6, 7], label: "Medios no motorizados" },
    Bucket { codes: &[2, 8, 10], label: "Transporte publico colectivo" },
    Bucket { codes: &[11, 12, 13], label: "Transporte privado colectivo" },
    Bucket { codes: &[14, 15], label: "Otros" },
    Bucket { codes: &[8888], label: "No Sabe" },
    Bucket { codes: &[9999], label: "No Contesta" },
];

// Attribute codes.
pub const SEX_MALE: i64 = 0;
pub const SEX_FEMALE: i64 = 1;
pub const SCHOOL_PUBLIC: i64 = 1;
pub const SCHOOL_PRIVATE: i64 = 2;

// **** Canonical column orders ****

pub const EDUCATION_ORDER: [&str; 15] = [
    "Ninguno",
    "Preescolar",
    "Primaria",
    "Secundaria",
    "Preparatoria o bachillerato general",
    "Bachillerato tecnológico",
    "Estudios técnicos o comerciales con primaria terminada",
    "Estudios técnicos o comerciales con secundaria terminada",
    "Estudios técnicos o comerciales con preparatoria terminada",
    "Normal con primaria o secundaria terminada",
    "Normal de licenciatura",
    "Licenciatura",
    "Especialidad",
    "Maestría",
    "Doctorado",
];

// One minimum wage (SM) is $8,364 a month.
pub const INCOME_ORDER: [&str; 13] = [
    "Sin ingreso",
    "No contesta",
    "Menos de 1 SM ($1 - $8,364)",
    "1-2 SM ($8,365 - $16,728)",
    "2-3 SM ($16,729 - $25,092)",
    "3-4 SM ($25,093 - $33,456)",
    "4-5 SM ($33,457 - $41,820)",
    "5-6 SM ($41,821 - $50,184)",
    "6-7 SM ($50,185 - $58,548)",
    "7-8 SM ($58,549 - $66,912)",
    "8-9 SM ($66,913 - $75,276)",
    "9-10 SM ($75,277 - $83,640)",
    "10 o más SM ($83,641 o más)",
];

pub const AGE_ORDER: [&str; 10] = [
    "0-5", "6-12", "13-17", "18-24", "25-34", "35-44", "45-54", "55-64", "65-74", "75 o más",
];

pub const GEOGRAPHY_ORDER: [&str; 15] = [
    "Apodaca",
    "Cadereyta Jiménez",
    "García",
    "General Escobedo",
    "Guadalupe",
    "Juárez",
    "Monterrey",
    "San Nicolás de los Garza",
    "San Pedro Garza García",
    "Santa Catarina",
    "Santiago",
    AMM_LABEL,
    PERIFERIA_LABEL,
    RESTO_LABEL,
    STATE_LABEL,
];

pub const SCHOOL_TYPE_ORDER: [&str; 3] = ["Pública", "Privada", "Otro tipo"];

pub const SEX_ORDER: [&str; 2] = ["Hombre", "Mujer"];

/// The semantic domains that have a curated column order.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Domain {
    Education,
    Income,
    Age,
    Geography,
    SchoolType,
    Sex,
}

impl Domain {
    pub fn canonical_order(&self) -> &'static [&'static str] {
        match self {
            Domain::Education => &EDUCATION_ORDER,
            Domain::Income => &INCOME_ORDER,
            Domain::Age => &AGE_ORDER,
            Domain::Geography => &GEOGRAPHY_ORDER,
            Domain::SchoolType => &SCHOOL_TYPE_ORDER,
            Domain::Sex => &SEX_ORDER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geography_order_starts_with_metro_cities() {
        for (idx, (_, name)) in METRO_CITIES.iter().enumerate() {
            assert_eq!(GEOGRAPHY_ORDER[idx], *name);
        }
        assert_eq!(&GEOGRAPHY_ORDER[11..], &["AMM", "Periferia", "Resto NL", "Nuevo León"]);
    }

    #[test]
    fn age_bands_match_age_order() {
        let labels: Vec<&str> = AGE_BANDS.iter().map(|b| b.label).collect();
        assert_eq!(labels, AGE_ORDER.to_vec());
        assert_eq!(AGE_BANDS[INITIAL_SAMPLE_FIRST_AGE_BAND].label, "18-24");
        for w in AGE_BANDS.windows(2) {
            assert_eq!(w[0].upper.map(|u| u + 1), Some(w[1].lower));
        }
    }

    #[test]
    fn metro_and_periferia_do_not_overlap() {
        for id in PERIFERIA_CITIES.iter() {
            assert_eq!(metro_city_name(*id), None);
        }
        assert_eq!(metro_and_periferia_ids().len(), 21);
    }

    #[test]
    fn sentinels() {
        assert!(is_sentinel(8888.0));
        assert!(!is_sentinel(8887.0));
    }
}
