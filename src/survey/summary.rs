use crate::survey::*;

fn table_to_json(table: &Table) -> JSValue {
    let rows: Vec<JSValue> = table
        .rows
        .iter()
        .map(|r| {
            let mut cells: Vec<JSValue> = Vec::with_capacity(r.values.len() + 2);
            cells.push(match &r.key {
                RowKey::Option(OptionId::Code(c)) => json!(c),
                other => json!(other.to_string()),
            });
            cells.push(json!(r.label));
            cells.extend(r.values.iter().map(|v| json!(v)));
            JSValue::Array(cells)
        })
        .collect();
    json!({"columns": table.header(), "rows": rows})
}

fn question_to_json(q: &QuestionReport) -> JSValue {
    let tables: Vec<JSValue> = q
        .tables
        .iter()
        .map(|t| {
            json!({
                "title": t.title,
                "disaggregation": t.disaggregation,
                "absolute": table_to_json(&t.absolute),
                "relative": table_to_json(&t.relative),
            })
        })
        .collect();
    let mut js: JSMap<String, JSValue> = JSMap::new();
    js.insert("id".to_string(), json!(q.question_id));
    js.insert("sheet".to_string(), json!(q.sheet_name));
    js.insert("title".to_string(), json!(q.title));
    if let Some(n) = &q.notes {
        js.insert("notes".to_string(), json!(n));
    }
    js.insert("tables".to_string(), JSValue::Array(tables));
    JSValue::Object(js)
}

/// Everything that was computed, unit by unit.
pub fn build_summary_js(units: &[ReportUnit]) -> JSValue {
    let units_js: Vec<JSValue> = units
        .iter()
        .map(|u| {
            json!({
                "unit": u.name,
                "questions": u.questions.iter().map(question_to_json).collect::<Vec<JSValue>>(),
            })
        })
        .collect();
    json!({ "units": units_js })
}

pub fn pretty_summary(units: &[ReportUnit]) -> SurveyResult<String> {
    let summary_js = build_summary_js(units);
    serde_json::to_string_pretty(&summary_js).context(SerializingSummarySnafu {})
}

/// Writes the summary to a file, or to the standard output for 'stdout'.
pub fn write_summary(out: &str, pretty_js_stats: &str) -> SurveyResult<()> {
    if out == "stdout" {
        println!("{}", pretty_js_stats);
    } else {
        fs::write(out, pretty_js_stats).context(WritingSummarySnafu { path: out })?;
        info!("Summary written to {}", out);
    }
    Ok(())
}

pub fn read_summary(path: &str) -> SurveyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

/// Fails if the summary differs from the reference summary stored at `reference`.
pub fn check_reference(reference: &str, pretty_js_stats: &str) -> SurveyResult<()> {
    let summary_ref = read_summary(reference)?;
    debug!("reference summary: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(SerializingSummarySnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary {}", reference);
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    info!("Summary matches the reference {}", reference);
    Ok(())
}
