//! SIVEP (severe respiratory illness surveillance) conversion.
//!
//! Produces two tables from the merged raw dataset: the main output dated by
//! symptom onset, and a condensed output of SRAG classification fields
//! dated by the evaluation (outcome) date.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;
use sus_model::{
    ConversionOptions, DATE_COLUMN, Dimension, HIERARCHICAL_DIMENSIONS, IndicatorPolicy,
    RecordTable, ReferenceTable, Result, SourceSchema, SusError, field_name,
};
use tracing::{info, info_span};

use crate::age::{build_age_group, build_race};
use crate::datetime::{
    DateCascade, DateReport, DateSource, OptionalDatePolicy, add_date_diff, clean_optional_dates,
    normalize_dates,
};
use crate::indicators::{SET, add_indicator};
use crate::join::{JoinReport, KeyResolver, UnmatchedFill, reference_join};

pub const PRIMARY_DATE: &str = "DT_SIN_PRI";
pub const EVALUATION_DATE: &str = "DT_EVOLUCA";
pub const CLASSIFICATION_COLUMN: &str = "CLASSI_FIN";
pub const PCR_COLUMN: &str = "PCR_SARS2";
pub const OUTCOME_COLUMN: &str = "EVOLUCAO";
pub const HOSPITAL_COLUMN: &str = "HOSPITAL";
pub const STATE_COLUMN: &str = "SG_UF";
pub const MUNICIPALITY_COLUMN: &str = "CO_MUN_RES";
pub const SEX_COLUMN: &str = "CS_SEXO";
pub const AGE_COLUMN: &str = "NU_IDADE_N";
pub const RACE_COLUMN: &str = "CS_RACA";

pub const CASES_FIELD: &str = "total_number_of_cases_seen";
pub const HOSPITALIZED_FIELD: &str = "number_of_people_hospitalized";
pub const HOSPITALIZED_DIMENSION: &str = "dimension_hospitalizado";
pub const DEAD_VALUE: &str = "Óbito";
const EVALUATION_SUFFIX: &str = "_by_evaluation_date";

/// How a classification code is matched against a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationRule {
    /// The code, unless the SARS-CoV-2 PCR was positive.
    Code,
    /// The code, or a positive SARS-CoV-2 PCR.
    CodeOrPositivePcr,
    /// The code, or no classification yet.
    CodeOrEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SragClassification {
    pub code: String,
    pub field_id: String,
    pub label: String,
    pub rule: ClassificationRule,
}

impl SragClassification {
    fn new(code: &str, field_id: &str, label: &str, rule: ClassificationRule) -> Self {
        Self {
            code: code.to_string(),
            field_id: field_id.to_string(),
            label: label.to_string(),
            rule,
        }
    }

    fn matches(&self, classification: &str, pcr: &str) -> bool {
        let code = classification == self.code;
        match self.rule {
            ClassificationRule::Code => code && pcr != SET,
            ClassificationRule::CodeOrPositivePcr => code || pcr == SET,
            ClassificationRule::CodeOrEmpty => code || classification.is_empty(),
        }
    }
}

/// A comorbidity dimension column filled with `label` when `field_id` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comorbidity {
    pub column: String,
    pub field_id: String,
    pub label: String,
}

/// Immutable description of a SIVEP conversion.
#[derive(Debug, Clone)]
pub struct SivepConfig {
    /// Column -> field id; the field is set where the column is `1`.
    pub simple_indicators: Vec<(String, String)>,
    /// Outcome code -> field id.
    pub outcome_indicators: Vec<(String, String)>,
    /// Outcome fields meaning the patient died.
    pub death_fields: Vec<String>,
    /// Applied in order; a later match overrides the classification dimension.
    pub classifications: Vec<SragClassification>,
    /// Secondary date columns, kept only within `years` and not in the future.
    pub optional_dates: Vec<String>,
    pub years: Vec<i32>,
    /// Field id -> (start column, end column).
    pub date_differences: Vec<(String, String, String)>,
    pub comorbidities: Vec<Comorbidity>,
}

fn pairs(values: &[(&str, &str)]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
        .collect()
}

impl SivepConfig {
    pub fn standard() -> Self {
        use ClassificationRule::{Code, CodeOrEmpty, CodeOrPositivePcr};

        let simple_indicators = pairs(&[
            ("ASMA", "asma"),
            ("CARDIOPATI", "doenca_cardiovascular_cronica"),
            ("DESC_RESP", "number_of_people_with_symptom_diffbreathing"),
            ("DIABETES", "diabetes_mellitus"),
            ("DISPNEIA", "number_of_people_with_symptom_dispneia"),
            ("FEBRE", "number_of_people_with_symptom_fever"),
            ("GARGANTA", "number_of_people_with_symptom_sorethroat"),
            ("HEMATOLOGI", "doenca_hematologica_cronica"),
            ("HEPATICA", "doenca_hepatica_cronica"),
            ("IMUNODEPRE", "imunodeficiencia_ou_imunodepressao"),
            ("NEUROLOGIC", "doenca_neurologica_cronica"),
            ("OBESIDADE", "obesidade"),
            ("OUT_MORBI", "outros"),
            ("PNEUMOPATI", "outra_pneumatopatia_cronica"),
            ("PUERPERA", "puerpera"),
            ("RENAL", "doenca_renal_cronica"),
            ("SIND_DOWN", "sindrome_de_down"),
            ("TOSSE", "number_of_people_with_symptom_cough"),
            ("UTI", "number_of_people_admitted_icu"),
        ]);
        let outcome_indicators = pairs(&[
            ("1", "number_of_people_hospitalized_cured"),
            ("2", "number_of_people_hospitalized_died_of_infl"),
            ("3", "number_of_people_hospitalized_other"),
            ("4", "number_of_people_hospitalized_died_in_investigation"),
            ("9", "number_of_people_hospitalized_ignored"),
        ]);
        let death_fields = [
            "number_of_people_hospitalized_died_in_investigation",
            "number_of_people_hospitalized_died_of_infl",
            "number_of_people_hospitalized_other",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        let classifications = vec![
            SragClassification::new("0", "srag_em_investigacao", "SRAG em investigação", CodeOrEmpty),
            SragClassification::new("1", "srag_por_influenza", "SRAG por Influenza", Code),
            SragClassification::new(
                "2",
                "srag_por_outro_virus_respiratorio",
                "SRAG por outro virus respiratório",
                Code,
            ),
            SragClassification::new(
                "3",
                "srag_por_outro_agente_etiologico",
                "SRAG por outro agente etiológico",
                Code,
            ),
            SragClassification::new("4", "srag_por_nao_especificado", "SRAG não especificado", Code),
            SragClassification::new("5", "srag_covid19", "COVID-19", CodeOrPositivePcr),
        ];
        let optional_dates = [
            "DT_COLETA",
            "DT_ENTUTI",
            EVALUATION_DATE,
            "DT_INTERNA",
            "DT_NOTIFIC",
            "DT_SAIDUTI",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        let date_differences = [
            ("oportunidade_de_notificacao", PRIMARY_DATE, "DT_NOTIFIC"),
            (
                "oportunidade_de_coleta_de_amostra_desde_a_notificacao",
                "DT_NOTIFIC",
                "DT_COLETA",
            ),
            (
                "oportunidade_de_coleta_de_amostra_desde_inicio_dos_sintomas",
                PRIMARY_DATE,
                "DT_COLETA",
            ),
            ("tempo_de_internacao_na_uti_entrada_e_a_saida", "DT_ENTUTI", "DT_SAIDUTI"),
            (
                "tempo_em_dias_entre_entrada_na_uti_e_o_desfecho_obito_caso_va_a_obito_na_uti",
                "DT_ENTUTI",
                EVALUATION_DATE,
            ),
            ("tempo_de_internacao", "DT_INTERNA", EVALUATION_DATE),
        ]
        .into_iter()
        .map(|(id, start, end)| (id.to_string(), start.to_string(), end.to_string()))
        .collect();
        let comorbidities = [
            ("dimension_asma", "asma", "Asma"),
            ("dimension_diabetes_mellitus", "diabetes_mellitus", "Diabetes mellitus"),
            (
                "dimension_doenca_cardiovascular_cronica",
                "doenca_cardiovascular_cronica",
                "Doença Cardiovascular Crônica",
            ),
            (
                "dimension_doenca_hematologica_cronica",
                "doenca_hematologica_cronica",
                "Doença Hematológica Crônica",
            ),
            (
                "dimension_doenca_hepatica_cronica",
                "doenca_hepatica_cronica",
                "Doença Hepática Crônica",
            ),
            (
                "dimension_doenca_neurologica_cronica",
                "doenca_neurologica_cronica",
                "Doença Neurológica Crónica",
            ),
            ("dimension_doenca_renal_cronica", "doenca_renal_cronica", "Doença Renal Crônica"),
            (HOSPITALIZED_DIMENSION, HOSPITALIZED_FIELD, "Pacientes Internados"),
            (
                "dimension_imunodeficiencia",
                "imunodeficiencia_ou_imunodepressao",
                "Imunodeficiência ou Imunodepressão",
            ),
            ("dimension_obesidade", "obesidade", "Obesidade"),
            (
                "dimension_outra_pneumatopatia_cronica",
                "outra_pneumatopatia_cronica",
                "Outra Pneumatopatia Crônica",
            ),
            ("dimension_outros", "outros", "Outros"),
            ("dimension_puerpera", "puerpera", "Puérpera"),
            ("dimension_sindrome_de_down", "sindrome_de_down", "Síndrome de Down"),
        ]
        .into_iter()
        .map(|(column, field_id, label)| Comorbidity {
            column: column.to_string(),
            field_id: field_id.to_string(),
            label: label.to_string(),
        })
        .collect();
        Self {
            simple_indicators,
            outcome_indicators,
            death_fields,
            classifications,
            optional_dates,
            years: vec![2019, 2020, 2021],
            date_differences,
            comorbidities,
        }
    }

    /// Schema of the merged SIVEP file.
    pub fn schema(&self) -> SourceSchema {
        SourceSchema::new("sivep")
            .require([
                CLASSIFICATION_COLUMN,
                MUNICIPALITY_COLUMN,
                RACE_COLUMN,
                SEX_COLUMN,
                PRIMARY_DATE,
                OUTCOME_COLUMN,
                HOSPITAL_COLUMN,
                AGE_COLUMN,
                PCR_COLUMN,
                STATE_COLUMN,
            ])
            .require(self.optional_dates.iter().cloned())
            .require(self.simple_indicators.iter().map(|(column, _)| column.clone()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SivepReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub dates: DateReport,
    pub rejected_optional_dates: usize,
    /// Field id -> records set.
    pub classifications: BTreeMap<String, usize>,
    pub deaths: usize,
    pub municipality: Option<JoinReport>,
    pub evaluation_rows: usize,
}

#[derive(Debug, Clone)]
pub struct SivepOutput {
    pub table: RecordTable,
    pub by_evaluation_date: RecordTable,
    pub report: SivepReport,
}

fn is_set(row: &[String], idx: usize) -> bool {
    row[idx] == SET
}

/// Convert the merged SIVEP table. `today` bounds the secondary dates.
pub fn convert_sivep(
    mut table: RecordTable,
    config: &SivepConfig,
    today: NaiveDate,
    municipality: Option<&ReferenceTable>,
    options: &ConversionOptions,
) -> Result<SivepOutput> {
    let span = info_span!("convert_sivep", rows = table.row_count());
    let _guard = span.enter();
    let start = Instant::now();

    let mut report = SivepReport {
        input_rows: table.row_count(),
        ..SivepReport::default()
    };

    let primary = [DateSource::new(PRIMARY_DATE, DateCascade::sivep())];
    report.dates = normalize_dates(&mut table, &primary, DATE_COLUMN, options.undated)?;
    let date_idx = table.require_column(DATE_COLUMN, "sivep")?;
    let iso_dates = table.column_values(date_idx).map(str::to_string).collect();
    table.set_column(PRIMARY_DATE, iso_dates)?;

    let mut fields: Vec<String> = Vec::new();
    add_indicator(&mut table, &field_name(CASES_FIELD), IndicatorPolicy::Zero, |_| true)?;
    fields.push(field_name(CASES_FIELD));

    for (column, field_id) in &config.simple_indicators {
        let idx = table.require_column(column, "sivep")?;
        let field = field_name(field_id);
        add_indicator(&mut table, &field, IndicatorPolicy::Zero, |row| is_set(row, idx))?;
        fields.push(field);
    }

    let hospital_idx = table.require_column(HOSPITAL_COLUMN, "sivep")?;
    let outcome_idx = table.require_column(OUTCOME_COLUMN, "sivep")?;
    let hospitalized = field_name(HOSPITALIZED_FIELD);
    add_indicator(&mut table, &hospitalized, IndicatorPolicy::Zero, |row| {
        is_set(row, hospital_idx) || row[outcome_idx] == "2"
    })?;
    fields.push(hospitalized);
    for (code, field_id) in &config.outcome_indicators {
        let field = field_name(field_id);
        add_indicator(&mut table, &field, IndicatorPolicy::Zero, |row| row[outcome_idx] == *code)?;
        fields.push(field);
    }

    let classification_idx = table.require_column(CLASSIFICATION_COLUMN, "sivep")?;
    let pcr_idx = table.require_column(PCR_COLUMN, "sivep")?;
    let final_idx = table.fill_column(Dimension::FinalClassificationOfCase.as_str(), "");
    let mut srag_fields = Vec::with_capacity(config.classifications.len());
    for classification in &config.classifications {
        let field = field_name(&classification.field_id);
        let mut set = 0usize;
        let values: Vec<String> = table
            .rows
            .iter_mut()
            .map(|row| {
                if classification.matches(&row[classification_idx], &row[pcr_idx]) {
                    row[final_idx] = classification.label.clone();
                    set += 1;
                    SET.to_string()
                } else {
                    IndicatorPolicy::Zero.unset_value().to_string()
                }
            })
            .collect();
        table.set_column(&field, values)?;
        report
            .classifications
            .insert(classification.field_id.clone(), set);
        srag_fields.push(field.clone());
        fields.push(field);
    }

    let death_idx = config
        .death_fields
        .iter()
        .map(|field_id| table.require_column(&field_name(field_id), "sivep"))
        .collect::<Result<Vec<_>>>()?;
    let dead_values = table
        .rows
        .iter()
        .map(|row| {
            if death_idx.iter().any(|&idx| is_set(row, idx)) {
                DEAD_VALUE.to_string()
            } else {
                String::new()
            }
        })
        .collect();
    table.set_column(Dimension::Dead.as_str(), dead_values)?;
    let dead_idx = table.require_column(Dimension::Dead.as_str(), "sivep")?;
    report.deaths = table.column_values(dead_idx).filter(|v| !v.is_empty()).count();

    let policy = OptionalDatePolicy {
        years: config.years.clone(),
        latest: today,
    };
    let optional: Vec<&str> = config.optional_dates.iter().map(String::as_str).collect();
    report.rejected_optional_dates = clean_optional_dates(&mut table, &optional, &policy)?;
    for (field_id, start_column, end_column) in &config.date_differences {
        let field = field_name(field_id);
        add_date_diff(&mut table, &field, start_column, end_column)?;
        fields.push(field);
    }

    for comorbidity in &config.comorbidities {
        let idx = table.require_column(&field_name(&comorbidity.field_id), "sivep")?;
        let values = table
            .rows
            .iter()
            .map(|row| {
                if is_set(row, idx) {
                    comorbidity.label.clone()
                } else {
                    String::new()
                }
            })
            .collect();
        table.set_column(&comorbidity.column, values)?;
    }

    let copy = |table: &mut RecordTable, from: &str, to: Dimension| -> Result<()> {
        let idx = table.require_column(from, "sivep")?;
        let values = table.column_values(idx).map(str::to_string).collect();
        table.set_column(to.as_str(), values)?;
        Ok(())
    };
    copy(&mut table, STATE_COLUMN, Dimension::State)?;
    copy(&mut table, MUNICIPALITY_COLUMN, Dimension::Municipality)?;
    copy(&mut table, SEX_COLUMN, Dimension::Gender)?;
    let age_idx = table.require_column(AGE_COLUMN, "sivep")?;
    let groups = table.column_values(age_idx).map(build_age_group).collect();
    table.set_column(Dimension::AgeGroup.as_str(), groups)?;
    let race_idx = table.require_column(RACE_COLUMN, "sivep")?;
    let races = table
        .column_values(race_idx)
        .map(|value| build_race(value).to_string())
        .collect();
    table.set_column(Dimension::Race.as_str(), races)?;

    let mut location_columns = vec![Dimension::State, Dimension::Municipality];
    if let Some(reference) = municipality {
        let outputs: Vec<String> = HIERARCHICAL_DIMENSIONS
            .iter()
            .map(|dimension| dimension.as_str().to_string())
            .collect();
        report.municipality = Some(reference_join(
            &mut table,
            MUNICIPALITY_COLUMN,
            reference,
            &KeyResolver::standard(),
            &outputs,
            Some(DATE_COLUMN),
            UnmatchedFill::Keep,
        )?);
        location_columns = HIERARCHICAL_DIMENSIONS.to_vec();
    }

    let mut output_columns = vec![DATE_COLUMN.to_string()];
    output_columns.extend(location_columns.iter().map(|d| d.as_str().to_string()));
    output_columns.extend(
        [
            Dimension::AgeGroup,
            Dimension::Gender,
            Dimension::Race,
            Dimension::Dead,
            Dimension::FinalClassificationOfCase,
        ]
        .iter()
        .map(|d| d.as_str().to_string()),
    );
    let mut comorbidity_columns: Vec<String> =
        config.comorbidities.iter().map(|c| c.column.clone()).collect();
    comorbidity_columns.sort();
    output_columns.extend(comorbidity_columns);
    fields.sort();
    output_columns.extend(fields);

    let by_evaluation_date = evaluation_output(&table, &srag_fields, &location_columns)?;
    report.evaluation_rows = by_evaluation_date.row_count();

    let output = table.select(&output_columns, "sivep output")?;
    report.output_rows = output.row_count();
    SusError::ensure_row_count(
        "sivep conversion",
        report.input_rows - report.dates.dropped,
        report.output_rows,
    )?;
    info!(
        input_rows = report.input_rows,
        output_rows = report.output_rows,
        evaluation_rows = report.evaluation_rows,
        deaths = report.deaths,
        duration_ms = start.elapsed().as_millis(),
        "sivep converted"
    );
    Ok(SivepOutput {
        table: output,
        by_evaluation_date,
        report,
    })
}

/// Rows with an evaluation date and at least one SRAG field set, dated by
/// the evaluation date, with the SRAG fields renamed `*_by_evaluation_date`.
fn evaluation_output(
    table: &RecordTable,
    srag_fields: &[String],
    location_columns: &[Dimension],
) -> Result<RecordTable> {
    let evaluation_idx = table.require_column(EVALUATION_DATE, "sivep")?;
    let srag_idx = srag_fields
        .iter()
        .map(|field| table.require_column(field, "sivep"))
        .collect::<Result<Vec<_>>>()?;

    let mut columns = vec![DATE_COLUMN.to_string()];
    columns.extend(location_columns.iter().map(|d| d.as_str().to_string()));
    columns.extend(
        [
            Dimension::AgeGroup,
            Dimension::Gender,
            Dimension::Race,
            Dimension::Dead,
            Dimension::FinalClassificationOfCase,
        ]
        .iter()
        .map(|d| d.as_str().to_string()),
    );
    columns.push(HOSPITALIZED_DIMENSION.to_string());
    let mut renamed: Vec<(String, String)> = srag_fields
        .iter()
        .map(|field| (field.clone(), format!("{field}{EVALUATION_SUFFIX}")))
        .collect();
    renamed.sort_by(|a, b| a.1.cmp(&b.1));
    columns.extend(renamed.iter().map(|(field, _)| field.clone()));

    let mut subset = table.clone();
    subset.retain_rows(|row| {
        !row[evaluation_idx].is_empty() && srag_idx.iter().any(|&idx| is_set(row, idx))
    });
    let date_idx = subset.require_column(DATE_COLUMN, "sivep")?;
    for row in &mut subset.rows {
        row[date_idx] = row[evaluation_idx].clone();
    }
    let mut output = subset.select(&columns, "sivep evaluation output")?;
    output.rename_columns(renamed.iter().map(|(from, to)| (from.as_str(), to.as_str())));
    Ok(output)
}
