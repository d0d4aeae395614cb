/*!

This is the long-form manual for `crosstab_engine` and `crosstab`.

## Survey database

The survey is read from a SQLite database with the following tables:

| table                   | columns                                                        |
|-------------------------|----------------------------------------------------------------|
| `responses`             | `respondent_id`, `factor_cvnl`, `is_initial_respondent`, `city_id` |
| `answers`               | `respondent_id`, `question_id`, `option_id`, `value`           |
| `options`               | `question_id`, `option_id`, `option_label`                     |
| `respondent_attributes` | `respondent_id`, `attribute`, `question_id`, `value`           |
| `questions`             | `q_id`, `q_section`, `q_text`, `q_type`, `q_notes`             |

`factor_cvnl` is the survey weight of a respondent. The `question_id` of a respondent attribute
points to the question whose `options` label the attribute codes.

## Weighting

Every table is computed in one of two modes:
- weighted, initial sample only: each respondent of the initial sample counts for its weight.
  This is the mode of every report.
- unweighted, all respondents: each respondent counts for 1. Control panel questions (ids starting
  with `cp`) are reported a second time in this mode, in the `{section}_sin_factor` output.

## Disaggregations

| name                                          | columns                                          |
|-----------------------------------------------|--------------------------------------------------|
| `sexo`                                        | Hombre, Mujer                                    |
| `edad`                                        | age bands (from 18-24 in the initial sample)      |
| `municipio`                                   | metro municipalities, AMM, Periferia, Resto NL, Nuevo León |
| `municipio_por_hombres`, `municipio_por_mujeres` | same, for one sex                             |
| `ingreso`                                     | income brackets in minimum wages (SM)            |
| `ingreso_por_<municipio>`                     | income brackets, for one metro municipality      |
| `ingreso_por_region_amm`, `_periferia`, `_resto_nl` | income brackets, for one region            |
| `nivel_max_estudios`                          | highest education level                          |
| `nivel_actual_estudios`                       | current education level                          |
| `nivel_actual_estudios_por_escuela_publica`, `_privada` | same, for one school type              |
| `tipo_escuela`                                | Pública, Privada, Otro tipo                      |
| `trabajo_remunerado`                          | paid occupations only                            |
| `tipo_trabajo`                                | Trabajo remunerado, Trabajo no remunerado, Otro  |
| `afiliacion_servicio_salud`                   | health service affiliation                       |
| `servicio_salud_donde_se_atendio`             | health service used                              |
| `tipo_servicio_salud_donde_se_atendio`        | Servicios Privados, Servicios Publicos           |
| `tipo_consulta`                               | consultation type                                |
| `totales`                                     | a single Total column                            |
| `promedio_modo_transporte_y_municipio`        | geography; rows are transport modes, cells are weighted mean answers |
| `particion_modal_agregada_por_municipio`       | geography; rows are aggregated transport modes   |

The `trabajo_remunerado` and `tipo_trabajo` families also exist with the `_por_hombres` and
`_por_mujeres` suffixes.

The municipality family counts every respondent three times: in its municipality (metro area
only), in its region and in the state. These tables have no total column.

## Tables

Each disaggregation gives two tables. The absolute table has a `Total` row, a `Total` column
(except for the municipality family) and, for `numerica` questions, a `Promedio` row: the average
of the answers weighted by each column. The codes 7777, 8888 and 9999 are left out of the average.
The relative table divides each column by its `Total` row.

## Configuration

The disaggregations of each question are given in a JSON file:

```text
{
  "p1": [ { "type": "sexo" }, { "type": "municipio" } ],
  "cp3": [ { "type": "edad" } ]
}
```

The run itself can be configured with a JSON file. All the keys are optional and the command line
takes precedence:

```text
{
  "database": "encuesta.db",
  "disaggregations": "disaggregations.json",
  "outputDirectory": "output",
  "layout": "per-section",
  "workbookName": "reporte",
  "sortQuestions": true
}
```

Relative paths are relative to the configuration file. `layout` is `per-section` (one workbook per
section, one sheet per question) or `single` (one workbook, one sheet per section).

 */
