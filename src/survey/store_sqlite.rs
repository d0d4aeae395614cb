use crate::survey::*;

use rusqlite::types::ValueRef;
use rusqlite::{named_params, Connection, OpenFlags, Row};

const SECTIONS_SQL: &str = "SELECT DISTINCT q_section AS section
FROM questions
WHERE q_section IS NOT NULL
ORDER BY section";

const QUESTIONS_SQL: &str = "SELECT q_id AS id, q_text, q_type AS type, q_notes
FROM questions
WHERE q_section = :section
ORDER BY id";

/// The survey database.
pub struct SqliteStore {
    conn: Connection,
}

fn store_err(context: &'static str) -> impl Fn(rusqlite::Error) -> ReportError {
    move |e| {
        StoreSnafu {
            context,
            message: e.to_string(),
        }
        .build()
    }
}

impl SqliteStore {
    /// Opens an existing database, read only.
    pub fn open(path: &Path) -> SurveyResult<SqliteStore> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).context(
            OpeningDatabaseSnafu {
                path: path.display().to_string(),
            },
        )?;
        info!("Opened survey database {}", path.display());
        Ok(SqliteStore { conn })
    }
}

fn option_id_of(v: ValueRef) -> Option<OptionId> {
    match v {
        ValueRef::Integer(i) => Some(OptionId::Code(i)),
        ValueRef::Real(f) => Some(OptionId::from_real(f)),
        ValueRef::Text(t) => {
            let s = String::from_utf8_lossy(t).to_string();
            match s.trim().parse::<i64>() {
                Ok(i) => Some(OptionId::Code(i)),
                Err(_) => Some(OptionId::Text(s)),
            }
        }
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn text_of(v: ValueRef) -> Option<String> {
    match v {
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) => Some(String::from_utf8_lossy(t).to_string()),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

/// Values that are not numbers become missing.
fn number_of(v: ValueRef) -> Option<f64> {
    match v {
        ValueRef::Integer(i) => Some(i as f64),
        ValueRef::Real(f) => Some(f),
        ValueRef::Text(t) => String::from_utf8_lossy(t).trim().parse::<f64>().ok(),
        ValueRef::Null | ValueRef::Blob(_) => None,
    }
}

fn long_row(row: &Row) -> rusqlite::Result<LongRow> {
    Ok(LongRow {
        option_id: option_id_of(row.get_ref("id_respuesta")?),
        label: text_of(row.get_ref("respuesta")?),
        group: text_of(row.get_ref("grupo")?),
        value: number_of(row.get_ref("valor")?),
    })
}

impl AttributeStore for SqliteStore {
    fn sections(&self) -> ReportResult<Vec<String>> {
        let mut stmt = self.conn.prepare(SECTIONS_SQL).map_err(store_err("sections"))?;
        let sections = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(store_err("sections"))?
            .collect::<rusqlite::Result<Vec<String>>>()
            .map_err(store_err("sections"))?;
        Ok(sections)
    }

    fn questions_by_section(&self, section: &str) -> ReportResult<Vec<Question>> {
        let mut stmt = self
            .conn
            .prepare(QUESTIONS_SQL)
            .map_err(store_err("questions"))?;
        let questions = stmt
            .query_map(named_params! {":section": section}, |row| {
                Ok(Question {
                    id: row.get("id")?,
                    section: section.to_string(),
                    text: row.get::<_, Option<String>>("q_text")?.unwrap_or_default(),
                    kind: row.get("type")?,
                    notes: row.get("q_notes")?,
                })
            })
            .map_err(store_err("questions"))?
            .collect::<rusqlite::Result<Vec<Question>>>()
            .map_err(store_err("questions"))?;
        debug!(
            "questions_by_section: {}: {} questions",
            section,
            questions.len()
        );
        Ok(questions)
    }

    fn fetch(&self, sql: &str, params: &[(String, String)]) -> ReportResult<Vec<LongRow>> {
        debug!("fetch: {}", sql);
        let mut stmt = self.conn.prepare(sql).map_err(store_err("prepare"))?;
        for (name, value) in params.iter() {
            match stmt.parameter_index(name).map_err(store_err("bind"))? {
                Some(idx) => stmt
                    .raw_bind_parameter(idx, value)
                    .map_err(store_err("bind"))?,
                None => debug!("fetch: parameter {} is not used", name),
            }
        }
        let mut rows = stmt.raw_query();
        let mut res: Vec<LongRow> = Vec::new();
        while let Some(row) = rows.next().map_err(store_err("query"))? {
            res.push(long_row(row).map_err(store_err("row"))?);
        }
        Ok(res)
    }
}

/// A small survey for the tests of the binary.
#[cfg(test)]
pub mod fixture {
    use super::*;

    const SCHEMA: &str = "
CREATE TABLE responses (respondent_id INTEGER PRIMARY KEY, factor_cvnl REAL,
    is_initial_respondent INTEGER, city_id INTEGER);
CREATE TABLE answers (respondent_id INTEGER, question_id TEXT, option_id INTEGER, value REAL);
CREATE TABLE options (question_id TEXT, option_id INTEGER, option_label TEXT);
CREATE TABLE respondent_attributes (respondent_id INTEGER, attribute TEXT, question_id TEXT,
    value INTEGER);
CREATE TABLE questions (q_id TEXT, q_section TEXT, q_text TEXT, q_type TEXT, q_notes TEXT);
";

    // Respondents:
    // 1: Monterrey, weight 2, man, 30 years, no income, walks
    // 2: Periferia, weight 3, woman, 45 years, less than 1 SM, walks
    // 3: Resto NL, weight 5, woman, 70 years, no income, drives
    // 4: no city, weight 7, man, 20 years
    // 5: Monterrey, weight 11, not in the initial sample, man, 10 years, drives, income unknown
    // Work: 1 and 4 paid, 2 unpaid, 3 not recorded.
    // Health service: 1 private, 2 public, 3 outside every bucket.
    const DATA: &str = "
INSERT INTO responses VALUES (1, 2.0, 1, 39), (2, 3.0, 1, 1), (3, 5.0, 1, 70), (4, 7.0, 1, NULL),
    (5, 11.0, 0, 39);
INSERT INTO questions VALUES
    ('p1', 'movilidad', '¿Usa transporte público?', 'opcion', NULL),
    ('p20', 'movilidad', 'Minutos de traslado', 'numerica', 'En minutos'),
    ('cp1', 'salud', '¿Tiene seguro?', 'opcion', ''),
    ('x9', NULL, 'Sin sección', 'opcion', NULL);
INSERT INTO options VALUES ('p1', 1, 'Sí'), ('p1', 2, 'No'), ('cp1', 1, 'Sí'), ('cp1', 2, 'No'),
    ('p_sexo', 0, 'Hombre'), ('p_sexo', 1, 'Mujer'),
    ('p_ingreso', 1, 'Sin ingreso'), ('p_ingreso', 2, 'Menos de 1 SM ($1 - $8,364)'),
    ('p_ingreso', 3, 'No sabe'),
    ('p_trabajo', 1, 'Empleado'), ('p_trabajo', 4, 'Por cuenta propia'), ('p_trabajo', 5, 'Hogar'),
    ('p_modo', 1, 'Caminar'), ('p_modo', 2, 'Auto');
INSERT INTO answers VALUES (1, 'p1', 1, 1), (2, 'p1', 1, 1), (3, 'p1', 2, 2), (4, 'p1', 1, 1),
    (5, 'p1', 1, 1),
    (1, 'p20', NULL, 10), (2, 'p20', NULL, 20), (3, 'p20', NULL, 30), (5, 'p20', NULL, 40),
    (1, 'cp1', 1, 1), (5, 'cp1', 2, 2);
INSERT INTO respondent_attributes VALUES
    (1, 'sexo', 'p_sexo', 0), (2, 'sexo', 'p_sexo', 1), (3, 'sexo', 'p_sexo', 1),
    (4, 'sexo', 'p_sexo', 0), (5, 'sexo', 'p_sexo', 0),
    (1, 'edad_anos', NULL, 30), (2, 'edad_anos', NULL, 45), (3, 'edad_anos', NULL, 70),
    (4, 'edad_anos', NULL, 20), (5, 'edad_anos', NULL, 10),
    (1, 'ingreso', 'p_ingreso', 1), (2, 'ingreso', 'p_ingreso', 2), (3, 'ingreso', 'p_ingreso', 1),
    (5, 'ingreso', 'p_ingreso', 3),
    (1, 'tipo_trabajo', 'p_trabajo', 1), (2, 'tipo_trabajo', 'p_trabajo', 5),
    (4, 'tipo_trabajo', 'p_trabajo', 4),
    (1, 'servicio_salud_donde_se_atendio', NULL, 2), (2, 'servicio_salud_donde_se_atendio', NULL, 1),
    (3, 'servicio_salud_donde_se_atendio', NULL, 99),
    (1, 'modo_transporte', 'p_modo', 1), (2, 'modo_transporte', 'p_modo', 1),
    (3, 'modo_transporte', 'p_modo', 2), (5, 'modo_transporte', 'p_modo', 2);
";

    pub fn store() -> SqliteStore {
        let _ = env_logger::builder().is_test(true).try_init();
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(DATA).unwrap();
        SqliteStore { conn }
    }

    /// Writes the same data to a database file.
    pub fn write_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(SCHEMA).unwrap();
        conn.execute_batch(DATA).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::fixture::store;
    use super::*;

    fn report(qid: &str, name: &str, mode: FilterMode) -> Table {
        build_disaggregation_report(&store(), &Catalog::standard(), qid, name, mode).unwrap()
    }

    fn code(c: i64) -> RowKey {
        RowKey::Option(OptionId::Code(c))
    }

    #[test]
    fn sections_and_questions() {
        let s = store();
        assert_eq!(s.sections().unwrap(), vec!["movilidad", "salud"]);
        let qs = s.questions_by_section("movilidad").unwrap();
        let ids: Vec<&str> = qs.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p20"]);
        assert!(qs[1].is_numeric());
        assert_eq!(qs[1].notes.as_deref(), Some("En minutos"));
        assert_eq!(qs[0].notes, None);
        assert!(s.questions_by_section("o'hara").unwrap().is_empty());
    }

    #[test]
    fn municipality_tiers() {
        let t = report("p1", "municipio", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(
            t.columns,
            vec!["Monterrey", "AMM", "Periferia", "Resto NL", "Nuevo León"]
        );
        assert_eq!(t.row(&code(1)).unwrap().values, vec![2.0, 2.0, 3.0, 0.0, 5.0]);
        assert_eq!(t.row(&code(2)).unwrap().values, vec![0.0, 0.0, 0.0, 5.0, 5.0]);
    }

    #[test]
    fn metro_respondent_counts_in_three_buckets() {
        let t = report("cp1", "municipio", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.columns, vec!["Monterrey", "AMM", "Nuevo León"]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].values, vec![2.0, 2.0, 2.0]);

        let t = report("cp1", "municipio", FilterMode::UNWEIGHTED_ALL);
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.row(&code(2)).unwrap().values, vec![1.0, 1.0, 1.0]);
    }

    #[test]
    fn weighting_modes() {
        let t = report("p1", "sexo", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.columns, vec!["Hombre", "Mujer"]);
        assert_eq!(t.row(&code(1)).unwrap().values, vec![9.0, 3.0]);
        assert_eq!(t.row(&code(2)).unwrap().values, vec![0.0, 5.0]);

        let t = report("p1", "sexo", FilterMode::UNWEIGHTED_ALL);
        assert_eq!(t.row(&code(1)).unwrap().values, vec![3.0, 1.0]);

        let t = report(
            "p1",
            "sexo",
            FilterMode {
                weighted: true,
                initial_only: false,
            },
        );
        assert_eq!(t.row(&code(1)).unwrap().values, vec![20.0, 3.0]);
    }

    #[test]
    fn children_left_out_of_initial_sample() {
        let t = report("p1", "edad", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.columns, vec!["18-24", "25-34", "45-54", "65-74"]);
        assert_eq!(t.row(&code(1)).unwrap().values, vec![7.0, 2.0, 3.0, 0.0]);

        let t = report("p1", "edad", FilterMode::UNWEIGHTED_ALL);
        assert_eq!(t.columns, vec!["6-12", "18-24", "25-34", "45-54", "65-74"]);
        assert_eq!(t.row(&code(1)).unwrap().values, vec![1.0, 1.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn travel_time_means() {
        let t = report(
            "p20",
            "promedio_modo_transporte_y_municipio",
            FilterMode::WEIGHTED_INITIAL,
        );
        let walk = t.row(&code(1)).unwrap();
        assert_eq!(walk.label, "Caminar");
        assert_eq!(t.cell(&code(1), "Monterrey"), Some(10.0));
        assert_eq!(t.cell(&code(1), "AMM"), Some(10.0));
        assert_eq!(t.cell(&code(1), "Periferia"), Some(20.0));
        assert_eq!(t.cell(&code(1), "Nuevo León"), Some(16.0));
        assert_eq!(t.cell(&code(2), "Resto NL"), Some(30.0));
        assert_eq!(t.cell(&code(2), "Nuevo León"), Some(30.0));
    }

    #[test]
    fn modal_split_buckets() {
        let t = report(
            "p1",
            "particion_modal_agregada_por_municipio",
            FilterMode::WEIGHTED_INITIAL,
        );
        let non_motorized = RowKey::Option(OptionId::Text("Medios no motorizados".to_string()));
        let public = RowKey::Option(OptionId::Text("Transporte publico colectivo".to_string()));
        assert_eq!(t.cell(&non_motorized, "Nuevo León"), Some(5.0));
        assert_eq!(t.cell(&non_motorized, "Monterrey"), Some(2.0));
        assert_eq!(t.cell(&public, "Resto NL"), Some(5.0));
        assert_eq!(t.rows.len(), 2);
    }

    #[test]
    fn regional_income() {
        let t = report("p1", "ingreso_por_region_periferia", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.columns, vec!["Menos de 1 SM ($1 - $8,364)"]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].values, vec![3.0]);

        let t = report("p1", "ingreso_por_monterrey", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.columns, vec!["Sin ingreso"]);
        assert_eq!(t.rows[0].values, vec![2.0]);

        let t = report("p1", "ingreso", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.columns, vec!["Sin ingreso", "Menos de 1 SM ($1 - $8,364)"]);
    }

    #[test]
    fn city_income_keeps_unlisted_labels() {
        let t = report("p1", "ingreso_por_monterrey", FilterMode::UNWEIGHTED_ALL);
        assert_eq!(t.columns.len(), 2);
        assert_eq!(t.cell(&code(1), "Sin ingreso"), Some(1.0));
        assert_eq!(t.cell(&code(1), "No sabe"), Some(1.0));

        let t = report("p1", "ingreso_por_region_amm", FilterMode::UNWEIGHTED_ALL);
        assert_eq!(t.cell(&code(1), "No sabe"), Some(1.0));

        let t = report("p1", "ingreso", FilterMode::UNWEIGHTED_ALL);
        assert_eq!(t.columns, vec!["Sin ingreso", "Menos de 1 SM ($1 - $8,364)"]);
    }

    #[test]
    fn employment_buckets() {
        let t = report("p1", "tipo_trabajo", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.cell(&code(1), "Trabajo remunerado"), Some(9.0));
        assert_eq!(t.cell(&code(1), "Trabajo no remunerado"), Some(3.0));
        assert_eq!(t.cell(&code(1), "Otro"), Some(0.0));
        assert_eq!(t.cell(&code(2), "Otro"), Some(5.0));

        let t = report("p1", "tipo_trabajo_por_hombres", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.columns, vec!["Trabajo remunerado"]);
        assert_eq!(t.rows.len(), 1);
        assert_eq!(t.rows[0].values, vec![9.0]);

        let t = report("p1", "trabajo_remunerado", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.cell(&code(1), "Empleado"), Some(2.0));
        assert_eq!(t.cell(&code(1), "Por cuenta propia"), Some(7.0));
        assert_eq!(t.column_index("Hogar"), None);
    }

    #[test]
    fn health_service_buckets() {
        let t = report(
            "p1",
            "tipo_servicio_salud_donde_se_atendio",
            FilterMode::WEIGHTED_INITIAL,
        );
        assert_eq!(t.columns.len(), 2);
        assert_eq!(t.cell(&code(1), "Servicios Privados"), Some(2.0));
        assert_eq!(t.cell(&code(1), "Servicios Publicos"), Some(3.0));
        assert!(t.row(&code(2)).is_none());
    }

    #[test]
    fn municipality_for_women() {
        let t = report("p1", "municipio_por_mujeres", FilterMode::WEIGHTED_INITIAL);
        assert_eq!(t.columns, vec!["Periferia", "Resto NL", "Nuevo León"]);
        assert_eq!(t.row(&code(1)).unwrap().values, vec![3.0, 0.0, 3.0]);
        assert_eq!(t.row(&code(2)).unwrap().values, vec![0.0, 5.0, 5.0]);
    }

    #[test]
    fn unknown_question_is_empty() {
        let t = report("p404", "sexo", FilterMode::WEIGHTED_INITIAL);
        assert!(t.is_empty());
    }

    #[test]
    fn coercion_of_values() {
        let s = store();
        let rows = s
            .fetch(
                "SELECT 'x' AS id_respuesta, 'Sí' AS respuesta, NULL AS grupo, 'abc' AS valor
                 UNION ALL SELECT 3.0, 4, 'g', ' 2.5 '",
                &[(":question_id".to_string(), "p1".to_string())],
            )
            .unwrap();
        assert_eq!(rows[0].option_id, Some(OptionId::Text("x".to_string())));
        assert_eq!(rows[0].group, None);
        assert_eq!(rows[0].value, None);
        assert_eq!(rows[1].option_id, Some(OptionId::Code(3)));
        assert_eq!(rows[1].label.as_deref(), Some("4"));
        assert_eq!(rows[1].value, Some(2.5));
    }

    #[test]
    fn store_failures() {
        let s = store();
        let err = s.fetch("SELECT * FROM nowhere", &[]).unwrap_err();
        assert!(matches!(err, ReportError::Store { ref context, .. } if context == "prepare"));
    }

    #[test]
    fn missing_database_file() {
        let res = SqliteStore::open(Path::new("/nonexistent/survey.db"));
        assert!(matches!(res, Err(SurveyError::OpeningDatabase { .. })));
    }
}
