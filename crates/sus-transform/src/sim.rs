//! SIM (mortality information system) conversion.
//!
//! One call converts one batch of raw death records:
//!
//! 1. death date from `DTOBITO` (1996 on) or `DATAOBITO` (before 1996)
//! 2. coded columns remapped to labels
//! 3. age decoded into an age label and an age group
//! 4. numeric placeholders removed
//! 5. underlying cause of death joined onto the CID lookup
//! 6. deceased and mother occupations joined onto the CBO lookup
//! 7. optional residence municipality join
//! 8. indicator fields
//! 9. raw columns renamed to dimension names

use std::time::Instant;

use serde::Serialize;
use sus_model::codes::cause_of_death;
use sus_model::{
    ConversionOptions, DATE_COLUMN, Dimension, HIERARCHICAL_DIMENSIONS, IndicatorPolicy,
    RecordTable, ReferenceTable, Result, SourceSchema, SusError, field_name,
};
use tracing::{debug, info, info_span};

use crate::age::{decode_age_column, normalize_numeric_column};
use crate::cause_of_death::{CauseOfDeathReport, category1_columns, join_causes_of_death};
use crate::datetime::{DateCascade, DateReport, DateSource, normalize_dates};
use crate::indicators::{add_indicator, add_label_fields, add_passthrough_field, add_pivot_fields};
use crate::join::{JoinReport, KeyResolver, UnmatchedFill, reference_join};
use crate::occupation::{
    MOTHERS_OCCUPATION_DIMENSIONS, OCCUPATION_DIMENSIONS, OccupationReport, join_occupation,
};
use crate::remap::{RemapReport, ValueMap, remap_columns};

pub const DATE_FROM_1996: &str = "DTOBITO";
pub const DATE_BEFORE_1996: &str = "DATAOBITO";
pub const RESIDENCE_COLUMN: &str = "CODMUNRES";
pub const OCCURRENCE_COLUMN: &str = "CODMUNOCOR";
pub const CERTIFICATION_COLUMN: &str = "COMUNSVOIM";
pub const CAUSE_COLUMN: &str = "CAUSABAS";
pub const AGE_COLUMN: &str = "IDADE";
pub const OCCUPATION_COLUMN: &str = "OCUP";
pub const MOTHERS_OCCUPATION_COLUMN: &str = "OCUPMAE";
pub const DEATHS_FIELD: &str = "obitos";

fn schooling() -> [(&'static str, &'static str); 8] {
    [
        ("0", "Sem escolaridade"),
        ("1", "Fundamental I (1ª a 4ª série)"),
        ("2", "Fundamental II (5ª a 8ª série)"),
        ("3", "Médio (antigo 2º Grau)"),
        ("4", "Superior incompleto"),
        ("5", "Superior completo"),
        ("9", "Ignorado"),
        ("", ""),
    ]
}

fn yes_no() -> [(&'static str, &'static str); 4] {
    [("1", "Sim"), ("2", "Não"), ("9", "Ignorado"), ("", "")]
}

/// Column dictionaries for the coded SIM columns.
pub fn standard_value_maps() -> Vec<ValueMap> {
    vec![
        ValueMap::new("SEXO", [("1", "Masculino"), ("2", "Feminino"), ("0", "Ignorado")]),
        ValueMap::new(
            "RACACOR",
            [
                ("1", "Branca"),
                ("2", "Preta"),
                ("3", "Amarela"),
                ("4", "Parda"),
                ("5", "Indígena"),
                ("", "Ignorado"),
            ],
        ),
        ValueMap::new("ESC2010", schooling()),
        ValueMap::new("ESCMAE2010", schooling()),
        ValueMap::new(
            "GRAVIDEZ",
            [
                ("1", "Única"),
                ("2", "Dupla"),
                ("3", "Tripla e mais"),
                ("9", "Ignorada"),
                ("", ""),
            ],
        ),
        ValueMap::new(
            "LOCOCOR",
            [
                ("1", "Hospital"),
                ("2", "Outros estabelecimentos de saúde"),
                ("3", "Domicílio"),
                ("4", "Via pública"),
                ("5", "Outros"),
                ("6", "Aldeia indígena"),
                ("9", "Ignorado"),
            ],
        ),
        ValueMap::new(
            "PARTO",
            [("1", "Vaginal"), ("2", "Cesáreo"), ("9", "Ignorado"), ("", "")],
        ),
        ValueMap::new(
            "OBITOPARTO",
            [
                ("1", "Antes"),
                ("2", "Durante"),
                ("3", "Depois"),
                ("9", "Ignorado"),
                ("", ""),
            ],
        ),
        ValueMap::new(
            "TPMORTEOCO",
            [
                ("1", "Na gravidez"),
                ("2", "No parto"),
                ("3", "No abortamento"),
                ("4", "Até 42 dias após o término do parto"),
                ("5", "De 43 dias a 1 ano após o término da gestação"),
                ("8", "Não ocorreu nestes períodos"),
                ("9", "Ignorado"),
                ("", ""),
            ],
        ),
        ValueMap::new("ASSISTMED", yes_no()),
        ValueMap::new("NECROPSIA", yes_no()),
        ValueMap::new("ACIDTRAB", yes_no()),
        ValueMap::new(
            "CIRCOBITO",
            [
                ("1", "Acidente"),
                ("2", "Suicídio"),
                ("3", "Homicídio"),
                ("4", "Outros"),
                ("9", "Ignorado"),
                ("", ""),
            ],
        ),
        ValueMap::new(
            "FONTE",
            [
                ("1", "Ocorrência policial"),
                ("2", "Hospital"),
                ("3", "Família"),
                ("4", "Outra"),
                ("9", "Ignorado"),
                ("", ""),
            ],
        ),
        ValueMap::new("TIPOBITO", [("1", "Fetal"), ("2", "Não Fetal"), ("", "")]),
    ]
}

/// Immutable description of a SIM conversion.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub value_maps: Vec<ValueMap>,
    /// Remapped columns that also get one indicator field per label.
    pub label_field_columns: Vec<String>,
    /// Integer columns copied into `*field_{column}` after cleanup.
    pub numeric_columns: Vec<String>,
    pub numeric_placeholders: Vec<String>,
    pub date_sources: Vec<DateSource>,
    pub cause_column: String,
    /// Codes kept from the cause column.
    pub max_cause_codes: usize,
    /// Raw column -> output dimension.
    pub renames: Vec<(String, Dimension)>,
}

impl SimConfig {
    pub fn standard() -> Self {
        let value_maps = standard_value_maps();
        let label_field_columns = value_maps
            .iter()
            .map(|map| map.column.clone())
            .filter(|column| !matches!(column.as_str(), "SEXO" | "RACACOR" | "ESC2010"))
            .collect();
        let renames = [
            ("ACIDTRAB", Dimension::IsWorkRelated),
            ("ASSISTMED", Dimension::MedicalCare),
            ("CIRCOBITO", Dimension::ViolentDeathType),
            ("ESC2010", Dimension::Schooling),
            ("ESCMAE2010", Dimension::MothersSchooling),
            ("FONTE", Dimension::InfoSource),
            ("GRAVIDEZ", Dimension::PregnancyType),
            ("IDADE", Dimension::Age),
            ("IDADEMAE", Dimension::MothersAge),
            ("LOCOCOR", Dimension::PlaceOfDeath),
            ("NECROPSIA", Dimension::IsAutopsy),
            ("OBITOPARTO", Dimension::MomentOfChildbirth),
            ("PARTO", Dimension::PregnancyKind),
            ("QTDFILMORT", Dimension::NumberDeceasedChildren),
            ("QTDFILVIVO", Dimension::NumberLivingChildren),
            ("RACACOR", Dimension::Race),
            ("SEMAGESTAC", Dimension::GestationWeeks),
            ("SEXO", Dimension::Gender),
            ("TPMORTEOCO", Dimension::GestationalPhase),
            ("TIPOBITO", Dimension::DeathType),
        ]
        .into_iter()
        .map(|(column, dimension)| (column.to_string(), dimension))
        .collect();
        Self {
            value_maps,
            label_field_columns,
            numeric_columns: ["IDADEMAE", "QTDFILVIVO", "QTDFILMORT", "SEMAGESTAC"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            numeric_placeholders: vec!["99".to_string()],
            date_sources: vec![
                DateSource::new(DATE_FROM_1996, DateCascade::modern_sim()),
                DateSource::new(DATE_BEFORE_1996, DateCascade::legacy_sim()),
            ],
            cause_column: CAUSE_COLUMN.to_string(),
            max_cause_codes: 1,
            renames,
        }
    }

    /// Schema of a raw SIM file read with `delimiter`.
    ///
    /// Only the columns every era carries are required; the rest are added
    /// empty. Files before 1996 name the municipality columns `MUNIRES` and
    /// `MUNIOCOR`.
    pub fn schema(&self, delimiter: u8) -> SourceSchema {
        let mut optional: Vec<String> = vec![
            DATE_FROM_1996.to_string(),
            DATE_BEFORE_1996.to_string(),
            OCCURRENCE_COLUMN.to_string(),
            CERTIFICATION_COLUMN.to_string(),
            OCCUPATION_COLUMN.to_string(),
            MOTHERS_OCCUPATION_COLUMN.to_string(),
        ];
        optional.extend(self.value_maps.iter().map(|map| map.column.clone()));
        optional.extend(self.numeric_columns.iter().cloned());

        SourceSchema::new("sim")
            .with_delimiter(delimiter)
            .require([RESIDENCE_COLUMN, AGE_COLUMN, self.cause_column.as_str()])
            .optional(optional)
            .alias("MUNIRES", RESIDENCE_COLUMN)
            .alias("MUNIOCOR", OCCURRENCE_COLUMN)
    }

    fn placeholders(&self) -> Vec<&str> {
        self.numeric_placeholders.iter().map(String::as_str).collect()
    }
}

/// Reference tables a SIM conversion reads.
#[derive(Debug, Clone, Copy)]
pub struct SimLookups<'a> {
    pub cause_of_death: &'a ReferenceTable,
    pub occupation: &'a ReferenceTable,
    pub municipality: Option<&'a ReferenceTable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimReport {
    pub input_rows: usize,
    pub output_rows: usize,
    pub dates: DateReport,
    pub remap: RemapReport,
    pub causes: CauseOfDeathReport,
    pub occupation: OccupationReport,
    pub mothers_occupation: OccupationReport,
    pub municipality: Option<JoinReport>,
    pub fields: usize,
}

#[derive(Debug, Clone)]
pub struct SimOutput {
    pub table: RecordTable,
    pub report: SimReport,
}

/// Convert one batch of raw SIM records.
pub fn convert_sim(
    mut table: RecordTable,
    config: &SimConfig,
    lookups: SimLookups<'_>,
    options: &ConversionOptions,
) -> Result<SimOutput> {
    let span = info_span!("convert_sim", rows = table.row_count());
    let _guard = span.enter();
    let start = Instant::now();

    let mut report = SimReport {
        input_rows: table.row_count(),
        ..SimReport::default()
    };

    report.dates = normalize_dates(&mut table, &config.date_sources, DATE_COLUMN, options.undated)?;
    table.drop_columns(&[DATE_FROM_1996, DATE_BEFORE_1996]);

    report.remap = remap_columns(&mut table, &config.value_maps, options.remap_mode)?;
    decode_age_column(&mut table, AGE_COLUMN, Dimension::AgeGroup.as_str())?;
    let placeholders = config.placeholders();
    for column in &config.numeric_columns {
        normalize_numeric_column(&mut table, column, &placeholders)?;
    }
    debug!(rows = table.row_count(), "values remapped");

    report.causes = join_causes_of_death(
        &mut table,
        &config.cause_column,
        config.max_cause_codes,
        lookups.cause_of_death,
    )?;
    report.occupation = join_occupation(
        &mut table,
        OCCUPATION_COLUMN,
        &OCCUPATION_DIMENSIONS,
        lookups.occupation,
    )?;
    report.mothers_occupation = join_occupation(
        &mut table,
        MOTHERS_OCCUPATION_COLUMN,
        &MOTHERS_OCCUPATION_DIMENSIONS,
        lookups.occupation,
    )?;

    if let Some(municipality) = lookups.municipality {
        let outputs: Vec<String> = HIERARCHICAL_DIMENSIONS
            .iter()
            .map(|dimension| dimension.as_str().to_string())
            .collect();
        report.municipality = Some(reference_join(
            &mut table,
            RESIDENCE_COLUMN,
            municipality,
            &KeyResolver::standard(),
            &outputs,
            Some(DATE_COLUMN),
            UnmatchedFill::Empty,
        )?);
    }

    let mut fields = 0usize;
    for column in &config.label_field_columns {
        let map = config
            .value_maps
            .iter()
            .find(|map| &map.column == column)
            .ok_or_else(|| SusError::Message(format!("no dictionary for field column {column}")))?;
        fields += add_label_fields(&mut table, column, &map.labels(), IndicatorPolicy::Missing)?.len();
    }
    for column in &config.numeric_columns {
        add_passthrough_field(&mut table, column)?;
        fields += 1;
    }
    add_indicator(&mut table, &field_name(DEATHS_FIELD), IndicatorPolicy::Zero, |_| true)?;
    fields += 1;

    fields += add_pivot_fields(
        &mut table,
        &category1_columns(config.max_cause_codes),
        cause_of_death::CATEGORY_1,
        IndicatorPolicy::Zero,
    )?
    .len();
    report.fields = fields;

    table.rename_columns(
        config
            .renames
            .iter()
            .map(|(column, dimension)| (column.as_str(), dimension.as_str())),
    );

    report.output_rows = table.row_count();
    SusError::ensure_row_count(
        "sim conversion",
        report.input_rows - report.dates.dropped,
        report.output_rows,
    )?;
    info!(
        input_rows = report.input_rows,
        output_rows = report.output_rows,
        fields = report.fields,
        duration_ms = start.elapsed().as_millis(),
        "sim batch converted"
    );
    Ok(SimOutput { table, report })
}
