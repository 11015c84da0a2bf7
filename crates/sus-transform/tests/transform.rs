//! Conversion tests over small in-memory SIM and SIVEP tables.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use sus_model::codes::{cause_of_death, occupation};
use sus_model::{
    ConversionOptions, HIERARCHICAL_DIMENSIONS, RecordTable, ReferenceTable, RemapMode, SusError,
    UndatedPolicy,
};
use sus_transform::{
    DateCascade, DateGranularity, DateSource, FanOutIndex, KeyResolver, MatchStage, SimConfig,
    SimLookups, SivepConfig, UnmatchedFill, ValueMap, convert_sim, convert_sivep, fan_out,
    normalize_dates, reference_join, remap_columns, unmatched_key_summary,
};
use serde_json::json;

fn cell<'a>(table: &'a RecordTable, row: usize, column: &str) -> &'a str {
    let idx = table
        .column_index(column)
        .unwrap_or_else(|| panic!("missing column {column}"));
    table.value(row, idx)
}

fn cause_lookup() -> ReferenceTable {
    let mut builder = ReferenceTable::builder(cause_of_death::VALUE_COLUMNS);
    builder
        .insert(
            "A000",
            "",
            vec![
                "A00.0: Cólera clássica".into(),
                "A00: Cólera".into(),
                "A00-B99: Algumas doenças infecciosas e parasitárias".into(),
                "A00-A09: Doenças infecciosas intestinais".into(),
            ],
        )
        .unwrap();
    builder
        .insert(
            "I21",
            "",
            vec![
                "".into(),
                "I21: Infarto agudo do miocárdio".into(),
                "I00-I99: Doenças do aparelho circulatório".into(),
            ],
        )
        .unwrap();
    builder.build()
}

fn occupation_lookup() -> ReferenceTable {
    let mut builder = ReferenceTable::builder(occupation::VALUE_COLUMNS);
    builder
        .insert(
            "225125",
            "",
            vec![
                "Médico clínico".into(),
                "2251: Médicos clínicos".into(),
                "225: Profissionais da medicina".into(),
                "22: Profissionais das ciências biológicas".into(),
                "2: Profissionais das ciências e das artes".into(),
            ],
        )
        .unwrap();
    builder
        .insert("999", "", vec!["Aposentado".into()])
        .unwrap();
    builder.build()
}

fn municipality_reference() -> ReferenceTable {
    let mut builder =
        ReferenceTable::builder(HIERARCHICAL_DIMENSIONS.iter().map(|d| d.as_str()));
    builder
        .insert(
            "310620",
            "3106200",
            vec![
                "Sudeste".into(),
                "Minas Gerais".into(),
                "Belo Horizonte".into(),
                "Belo Horizonte".into(),
            ],
        )
        .unwrap();
    builder
        .insert(
            "530010",
            "5300108",
            vec![
                "Centro-Oeste".into(),
                "Distrito Federal".into(),
                "Distrito Federal".into(),
                "Brasília".into(),
            ],
        )
        .unwrap();
    builder.build()
}

fn raw_sim() -> RecordTable {
    let mut table = RecordTable::from_literal(
        &[
            "DTOBITO", "DATAOBITO", "MUNIRES", "IDADE", "CAUSABAS", "SEXO", "RACACOR", "LOCOCOR",
            "OCUP", "IDADEMAE", "QTDFILVIVO",
        ],
        &[
            &[
                "15031996", "", "310620", "435", "*A00.0", "1", "", "1", "225125", "99", "02",
            ],
            &["", "950315", "539999", "503", "I219", "2", "", "3", "99912", "", ""],
            &["", "", "310620", "420", "A000", "1", "1", "1", "", "", ""],
        ],
    );
    SimConfig::standard()
        .schema(b';')
        .conform(&mut table)
        .expect("conform");
    table
}

#[test]
fn sim_batch_conversion() {
    let config = SimConfig::standard();
    let causes = cause_lookup();
    let occupations = occupation_lookup();
    let municipalities = municipality_reference();
    let lookups = SimLookups {
        cause_of_death: &causes,
        occupation: &occupations,
        municipality: Some(&municipalities),
    };

    let output =
        convert_sim(raw_sim(), &config, lookups, &ConversionOptions::default()).expect("convert");
    let table = &output.table;
    let report = &output.report;

    assert_eq!(report.input_rows, 3);
    assert_eq!(report.dates.dropped, 1);
    assert_eq!(report.dates.day, 2);
    assert_eq!(report.output_rows, 2);
    assert_eq!(table.row_count(), 2);

    for gone in ["DTOBITO", "DATAOBITO", "CAUSABAS", "OCUP", "OCUPMAE", "SEXO", "IDADE"] {
        assert!(!table.has_column(gone), "{gone} should not be in the output");
    }

    assert_eq!(cell(table, 0, "date"), "1996-03-15");
    assert_eq!(cell(table, 1, "date"), "1995-03-15");
    assert_eq!(cell(table, 0, "Gender"), "Masculino");
    assert_eq!(cell(table, 1, "Gender"), "Feminino");
    assert_eq!(cell(table, 0, "Race"), "Ignorado");
    assert_eq!(cell(table, 0, "Age"), "35 anos");
    assert_eq!(cell(table, 1, "AgeGroup"), "80+");
    assert_eq!(cell(table, 1, "PlaceOfDeath"), "Domicílio");
    assert_eq!(cell(table, 0, "MothersAge"), "");
    assert_eq!(cell(table, 0, "NumberLivingChildren"), "2");

    assert_eq!(
        cell(table, 0, "CausesOfDeathCategory1_0"),
        "A00-B99: Algumas doenças infecciosas e parasitárias"
    );
    assert_eq!(cell(table, 1, "CausesOfDeathParent_0"), "I21: Infarto agudo do miocárdio");
    assert_eq!(report.causes.parent_fallbacks, 1);

    assert_eq!(cell(table, 0, "OccupationTitle"), "Médico clínico");
    assert_eq!(cell(table, 1, "OccupationTitle"), "Aposentado");
    assert_eq!(cell(table, 0, "MothersOccupationTitle"), "");

    assert_eq!(cell(table, 0, "StateName"), "Minas Gerais");
    assert_eq!(cell(table, 1, "MunicipalityName"), "Brasília");
    let municipality = report.municipality.as_ref().expect("municipality report");
    assert_eq!(municipality.degraded, 1);

    assert_eq!(cell(table, 0, "*field_obitos"), "1");
    assert_eq!(cell(table, 0, "*field_LOCOCOR - Hospital"), "1");
    assert_eq!(cell(table, 1, "*field_LOCOCOR - Hospital"), "");
    assert_eq!(cell(table, 0, "*field_IDADEMAE"), "");
    assert_eq!(cell(table, 0, "*field_QTDFILVIVO"), "2");
    assert!(!table.has_column("*field_SEXO - Masculino"));
    let category = "*field_cause_of_death_category1 - A00-B99: Algumas doenças infecciosas e parasitárias";
    assert_eq!(cell(table, 0, category), "1");
    assert_eq!(cell(table, 1, category), "0");
}

#[test]
fn sim_strict_mode_rejects_unknown_codes() {
    let config = SimConfig::standard();
    let causes = cause_lookup();
    let occupations = occupation_lookup();
    let lookups = SimLookups {
        cause_of_death: &causes,
        occupation: &occupations,
        municipality: None,
    };
    let mut table = raw_sim();
    let sex = table.column_index("SEXO").unwrap();
    table.rows[0][sex] = "7".to_string();

    let err = convert_sim(table, &config, lookups, &ConversionOptions::strict()).unwrap_err();
    assert!(matches!(err, SusError::UnmappedCodes { ref column, .. } if column == "SEXO"));
}

fn raw_sivep(rows: &[&[(&str, &str)]]) -> RecordTable {
    let schema = SivepConfig::standard().schema();
    let mut table = RecordTable::new(schema.required.iter().cloned());
    for overrides in rows {
        let overrides: BTreeMap<&str, &str> = overrides.iter().copied().collect();
        let row = table
            .headers
            .iter()
            .map(|header| overrides.get(header.as_str()).copied().unwrap_or("").to_string())
            .collect();
        table.push_row(row);
    }
    table
}

#[test]
fn sivep_conversion() {
    let table = raw_sivep(&[
        &[
            ("CLASSI_FIN", "5"),
            ("DT_SIN_PRI", "01/03/2020"),
            ("DT_NOTIFIC", "05/03/2020"),
            ("DT_INTERNA", "02/03/2020"),
            ("DT_EVOLUCA", "20/03/2020"),
            ("EVOLUCAO", "2"),
            ("HOSPITAL", "1"),
            ("NU_IDADE_N", "67"),
            ("CS_RACA", "1"),
            ("CS_SEXO", "M"),
            ("SG_UF", "MG"),
            ("CO_MUN_RES", "310620"),
            ("ASMA", "1"),
        ],
        &[
            ("CLASSI_FIN", "1"),
            ("PCR_SARS2", "1"),
            ("DT_SIN_PRI", "10/04/2021"),
            ("DT_NOTIFIC", "01/01/2018"),
            ("EVOLUCAO", "1"),
            ("HOSPITAL", "2"),
            ("NU_IDADE_N", "x"),
            ("SG_UF", "SP"),
            ("CO_MUN_RES", "355030"),
        ],
        &[("DT_SIN_PRI", "15/06/2020"), ("SG_UF", "RJ")],
    ]);
    let today = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
    let output = convert_sivep(
        table,
        &SivepConfig::standard(),
        today,
        None,
        &ConversionOptions::default(),
    )
    .expect("convert");
    let table = &output.table;
    let report = &output.report;

    assert_eq!(table.row_count(), 3);
    assert_eq!(
        table.headers[..8],
        [
            "date",
            "StateName",
            "MunicipalityName",
            "AgeGroup",
            "Gender",
            "Race",
            "Dead",
            "FinalClassificationOfCase"
        ]
    );
    let fields: Vec<&String> = table
        .headers
        .iter()
        .filter(|h| h.starts_with("*field_"))
        .collect();
    let mut sorted = fields.clone();
    sorted.sort();
    assert_eq!(fields, sorted);

    assert_eq!(cell(table, 0, "date"), "2020-03-01");
    assert_eq!(cell(table, 0, "FinalClassificationOfCase"), "COVID-19");
    assert_eq!(cell(table, 1, "FinalClassificationOfCase"), "COVID-19");
    assert_eq!(cell(table, 2, "FinalClassificationOfCase"), "SRAG em investigação");
    assert_eq!(cell(table, 1, "*field_srag_por_influenza"), "0");
    assert_eq!(cell(table, 0, "Dead"), "Óbito");
    assert_eq!(cell(table, 1, "Dead"), "");
    assert_eq!(cell(table, 0, "*field_number_of_people_hospitalized"), "1");
    assert_eq!(cell(table, 1, "*field_number_of_people_hospitalized"), "0");
    assert_eq!(cell(table, 1, "*field_number_of_people_hospitalized_cured"), "1");
    assert_eq!(cell(table, 0, "*field_oportunidade_de_notificacao"), "4");
    assert_eq!(cell(table, 1, "*field_oportunidade_de_notificacao"), "0");
    assert_eq!(cell(table, 0, "*field_tempo_de_internacao"), "18");
    assert_eq!(cell(table, 0, "dimension_asma"), "Asma");
    assert_eq!(cell(table, 0, "dimension_hospitalizado"), "Pacientes Internados");
    assert_eq!(cell(table, 1, "dimension_asma"), "");
    assert_eq!(cell(table, 0, "AgeGroup"), "60-69");
    assert_eq!(cell(table, 1, "AgeGroup"), "0-9");
    assert_eq!(cell(table, 0, "Race"), "branca");
    assert_eq!(cell(table, 1, "Race"), "s/informação");
    assert_eq!(cell(table, 2, "*field_total_number_of_cases_seen"), "1");

    assert_eq!(report.rejected_optional_dates, 1);
    assert_eq!(report.classifications.get("srag_covid19"), Some(&2));
    assert_eq!(report.classifications.get("srag_em_investigacao"), Some(&1));
    assert_eq!(report.deaths, 1);

    let evaluation = &output.by_evaluation_date;
    assert_eq!(evaluation.row_count(), 1);
    assert_eq!(cell(evaluation, 0, "date"), "2020-03-20");
    assert_eq!(cell(evaluation, 0, "*field_srag_covid19_by_evaluation_date"), "1");
    assert_eq!(cell(evaluation, 0, "dimension_hospitalizado"), "Pacientes Internados");
    assert!(!evaluation.has_column("*field_srag_covid19"));
}

#[test]
fn sivep_municipality_join_keeps_unmatched_codes() {
    let table = raw_sivep(&[
        &[("DT_SIN_PRI", "01/03/2020"), ("CO_MUN_RES", "310620"), ("SG_UF", "MG")],
        &[("DT_SIN_PRI", "01/03/2020"), ("CO_MUN_RES", "999999"), ("SG_UF", "XX")],
    ]);
    let reference = municipality_reference();
    let output = convert_sivep(
        table,
        &SivepConfig::standard(),
        NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
        Some(&reference),
        &ConversionOptions::default(),
    )
    .expect("convert");
    let table = &output.table;
    assert_eq!(cell(table, 0, "RegionName"), "Sudeste");
    assert_eq!(cell(table, 0, "MunicipalityName"), "Belo Horizonte");
    assert_eq!(cell(table, 1, "MunicipalityName"), "999999");
    assert_eq!(cell(table, 1, "StateName"), "XX");
}

#[test]
fn reference_join_preserves_rows_and_reports_fallbacks() {
    let reference = municipality_reference();
    let mut table = RecordTable::from_literal(
        &["code", "date"],
        &[
            &["310620", "2020-01-01"],
            &["5300108", "2020-01-02"],
            &["531111", "2020-02-01"],
            &["531111", "2020-01-15"],
            &["319999", "2020-03-01"],
            &["990000", "2020-04-01"],
            &["", "2020-04-02"],
        ],
    );
    let outputs: Vec<String> = HIERARCHICAL_DIMENSIONS
        .iter()
        .map(|d| d.as_str().to_string())
        .collect();
    let report = reference_join(
        &mut table,
        "code",
        &reference,
        &KeyResolver::standard(),
        &outputs,
        Some("date"),
        UnmatchedFill::Empty,
    )
    .expect("join");

    assert_eq!(table.row_count(), 7);
    assert_eq!(report.exact, 2);
    assert_eq!(report.degraded, 2);
    assert_eq!(report.unmatched, 3);
    assert_eq!(report.empty_keys, 1);
    assert_eq!(cell(&table, 2, "MunicipalityName"), "Brasília");
    assert_eq!(cell(&table, 5, "StateName"), "");

    let summary = unmatched_key_summary(&report.non_exact).expect("summary");
    insta::assert_snapshot!(
        summary
            .iter()
            .map(|key| format!(
                "{} {} {} {} {}",
                key.key,
                key.stage,
                key.count,
                key.first_date.as_deref().unwrap_or("-"),
                key.last_date.as_deref().unwrap_or("-")
            ))
            .collect::<Vec<_>>()
            .join("\n"),
        @r"
    531111 degraded 2 2020-01-15 2020-02-01
    319999 unmatched 1 2020-03-01 2020-03-01
    990000 unmatched 1 2020-04-01 2020-04-01
    "
    );
    assert!(summary.iter().all(|key| key.stage != MatchStage::ExactShort));
}

#[test]
fn fan_out_emits_one_row_per_match() {
    let table = RecordTable::from_literal(
        &["state", "city", "count"],
        &[&["MG", "BH", "1"], &["SP", "SP", "2"], &["RJ", "RJ", "3"]],
    );
    let mut index = FanOutIndex::new(
        vec!["state".to_string(), "city".to_string()],
        vec!["raw".to_string()],
    );
    index.insert("MG__BH".to_string(), vec!["Belo Horizonte".to_string()]);
    index.insert("MG__BH".to_string(), vec!["B. Horizonte".to_string()]);
    index.insert("MG__BH".to_string(), vec!["Belo Horizonte".to_string()]);
    index.insert("SP__SP".to_string(), vec!["São Paulo".to_string()]);

    let output = fan_out(&table, &index).expect("fan out");
    let expected: usize = ["MG__BH", "SP__SP", "RJ__RJ"]
        .iter()
        .map(|key| index.matches(key))
        .sum();
    assert_eq!(output.row_count(), expected);
    assert_eq!(output.row_count(), 3);
    let raw: Vec<&str> = output
        .column_values(output.column_index("raw").unwrap())
        .collect();
    assert_eq!(raw, vec!["B. Horizonte", "Belo Horizonte", "São Paulo"]);
}

#[test]
fn remapping_twice_is_a_no_op() {
    let maps = sus_transform::sim::standard_value_maps();
    let mut table = RecordTable::from_literal(&["SEXO", "LOCOCOR"], &[&["1", "9"], &["0", "6"]]);
    for map in &maps {
        table.ensure_column(&map.column);
    }
    remap_columns(&mut table, &maps, RemapMode::Strict).expect("first pass");
    let once = table.clone();
    remap_columns(&mut table, &maps, RemapMode::Strict).expect("second pass");
    assert_eq!(table, once);
    assert_eq!(cell(&table, 1, "LOCOCOR"), "Aldeia indígena");

    let custom = ValueMap::new("SEXO", [("M", "Masculino")]);
    assert_eq!(custom.resolve("Masculino"), Some("Masculino"));
}

#[test]
fn documented_date_examples() {
    let cascade = DateCascade::modern_sim();
    let day = NaiveDate::from_ymd_opt(1996, 3, 15).unwrap();
    let month = NaiveDate::from_ymd_opt(1996, 3, 1).unwrap();
    let year = NaiveDate::from_ymd_opt(1996, 1, 1).unwrap();
    assert_eq!(cascade.resolve("15031996"), Some((day, DateGranularity::Day)));
    assert_eq!(cascade.resolve("031996"), Some((month, DateGranularity::Month)));
    assert_eq!(cascade.resolve("1996"), Some((year, DateGranularity::Year)));
    assert_eq!(cascade.resolve(""), None);
}

#[test]
fn undated_records_can_be_kept() {
    let mut table = RecordTable::from_literal(
        &["DTOBITO", "CAUSABAS"],
        &[&["15031996", "A000"], &["xx", "I219"], &["1996", "B01"]],
    );
    let sources = [DateSource::new("DTOBITO", DateCascade::modern_sim())];
    let report =
        normalize_dates(&mut table, &sources, "date", UndatedPolicy::Keep).expect("dates");

    assert_eq!(table.row_count(), 3);
    assert_eq!(report.undated, 1);
    assert_eq!(report.dropped, 0);
    assert_eq!(cell(&table, 0, "date"), "1996-03-15");
    assert_eq!(cell(&table, 1, "date"), "");
    assert_eq!(cell(&table, 1, "CAUSABAS"), "I219");
    assert_eq!(cell(&table, 2, "date"), "1996-01-01");
}

#[test]
fn join_report_serializes_non_exact_keys() {
    let reference = municipality_reference();
    let outputs: Vec<String> = HIERARCHICAL_DIMENSIONS
        .iter()
        .map(|d| d.as_str().to_string())
        .collect();
    let mut table = RecordTable::from_literal(
        &["code", "date"],
        &[&["310620", "2020-01-01"], &["539999", ""]],
    );
    let report = reference_join(
        &mut table,
        "code",
        &reference,
        &KeyResolver::standard(),
        &outputs,
        Some("date"),
        UnmatchedFill::Empty,
    )
    .expect("join");

    assert_eq!(
        serde_json::to_value(&report).expect("serialize"),
        json!({
            "rows": 2,
            "exact": 1,
            "degraded": 1,
            "unmatched": 0,
            "empty_keys": 0,
            "non_exact": [{ "key": "539999", "stage": "degraded", "date": null }],
        })
    );

    let mut exact_only = report.clone();
    exact_only.non_exact.clear();
    let value = serde_json::to_value(&exact_only).expect("serialize");
    assert!(value.get("non_exact").is_none());
}
