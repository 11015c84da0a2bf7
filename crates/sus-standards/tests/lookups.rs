use std::fs;
use std::path::{Path, PathBuf};

use sus_model::Dimension;
use sus_model::codes::{cause_of_death, occupation};
use sus_standards::{
    OccupationSources, StandardsError, build_cause_of_death_lookup, build_occupation_lookup,
    cause_of_death_table, load_cause_of_death_lookup, load_municipality_reference,
    load_occupation_lookup,
};

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write file");
    path
}

fn write_lookup(path: &Path, headers: &[String], rows: &[Vec<String>]) {
    let mut writer = csv::Writer::from_path(path).expect("create lookup");
    writer.write_record(headers).expect("write header");
    for row in rows {
        writer.write_record(row).expect("write row");
    }
    writer.flush().expect("flush lookup");
}

const CID9: &str = "cid_id,cause_of_death_title
001-139,Doenças infecciosas e parasitárias
001X,Cólera
0010,Devida a Vibrio cholerae
0019,Não especificada
";

const CID10: &str = "cid
(A00-B99) Algumas doenças infecciosas e parasitárias
(A00-A09) Doenças infecciosas intestinais
(A00) Cólera
(A00.0) Cólera devida a Vibrio cholerae 01 biótipo cholerae
";

#[test]
fn cause_of_death_lookup_from_raw_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cid9 = write_file(dir.path(), "cid9.csv", CID9);
    let cid10 = write_file(dir.path(), "cid10.csv", CID10);

    let entries = build_cause_of_death_lookup(&cid9, &cid10).expect("build lookup");
    let table = cause_of_death_table(&entries);
    let rendered: Vec<String> = std::iter::once(&table.headers)
        .chain(&table.rows)
        .map(|row| row.join("|"))
        .collect();

    insta::assert_snapshot!(rendered.join("\n"), @r"
cid_id|cause_of_death_title|cause_of_death_parent|cause_of_death_category1|cause_of_death_category2|cause_of_death_category3|cause_of_death_category4
001X||001X: Cólera|001-139: Doenças infecciosas e parasitárias|||
0010|0010: Devida a Vibrio cholerae|001X: Cólera|001-139: Doenças infecciosas e parasitárias|||
0019|0019: Não especificada|001X: Cólera|001-139: Doenças infecciosas e parasitárias|||
A00||A00: Cólera|A00-B99: Algumas doenças infecciosas e parasitárias|A00-A09: Doenças infecciosas intestinais||
A000|A00.0: Cólera devida a Vibrio cholerae 01 biótipo cholerae|A00: Cólera|A00-B99: Algumas doenças infecciosas e parasitárias|A00-A09: Doenças infecciosas intestinais||
");

    let path = dir.path().join("cause_of_death.csv");
    write_lookup(&path, &table.headers, &table.rows);
    let lookup = load_cause_of_death_lookup(&path).expect("load lookup");
    assert_eq!(lookup.len(), 5);
    let row = lookup.get("A000").expect("A000");
    let parent = lookup
        .column_index(cause_of_death::PARENT)
        .expect("parent column");
    assert_eq!(row[parent], "A00: Cólera");
}

#[test]
fn missing_column_names_the_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cid9 = write_file(dir.path(), "cid9.csv", "codigo,titulo\n001,x\n");
    let cid10 = write_file(dir.path(), "cid10.csv", CID10);

    let err = build_cause_of_death_lookup(&cid9, &cid10).unwrap_err();
    assert!(matches!(err, StandardsError::MissingColumn { ref column, .. } if column == "cid_id"));
}

#[test]
fn occupation_lookup_from_raw_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let sources = OccupationSources {
        short_title: write_file(dir.path(), "short_title.csv", "CODIGO,TITULO\n011,Químico\n"),
        short_subgroup: write_file(
            dir.path(),
            "short_subgroup.csv",
            "CODIGO,TITULO\n011-019,Químicos e físicos\n",
        ),
        short_group: write_file(
            dir.path(),
            "short_group.csv",
            "CODIGO,TITULO\n001-099,0/1-Profissionais liberais\n",
        ),
        cbo94_to_cbo2002: write_file(
            dir.path(),
            "cbo94.csv",
            "CBO94;CBO2002\n07110;223505\n",
        ),
        cbo_title: write_file(dir.path(), "cbo_title.csv", "CODIGO,TITULO\n223505,Enfermeiro\n"),
        cbo_family: write_file(
            dir.path(),
            "cbo_family.csv",
            "CODIGO,TITULO\n2235,Enfermeiros e afins\n",
        ),
        cbo_subgroup: write_file(
            dir.path(),
            "cbo_subgroup.csv",
            "CODIGO,TITULO\n223,PROFISSIONAIS DA SAÚDE\n",
        ),
        cbo_principal_subgroup: write_file(
            dir.path(),
            "cbo_principal_subgroup.csv",
            "CODIGO,TITULO\n22,PROFISSIONAIS DAS CIÊNCIAS BIOLÓGICAS\n",
        ),
        cbo_group: write_file(
            dir.path(),
            "cbo_group.csv",
            "CODIGO,TITULO\n2,PROFISSIONAIS DAS CIÊNCIAS E DAS ARTES\n",
        ),
    };

    let table = build_occupation_lookup(&sources).expect("build lookup");
    let codes: Vec<&str> = table.column_values(0).collect();
    assert_eq!(codes, vec!["011", "07110", "223505"]);

    let path = dir.path().join("occupation.csv");
    write_lookup(&path, &table.headers, &table.rows);
    let lookup = load_occupation_lookup(&path).expect("load lookup");
    let group = lookup.column_index(occupation::GROUP).expect("group column");
    assert_eq!(lookup.get("011").expect("011")[group], "Profissionais liberais");
    assert_eq!(
        lookup.get("07110").expect("07110")[group],
        "Profissionais Das Ciências E Das Artes"
    );
}

#[test]
fn municipality_reference_by_short_and_long_code() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_file(
        dir.path(),
        "municipalities.csv",
        "MunicipalityCodeShort,MunicipalityCodeLong,RegionName,StateName,HealthRegionName,MunicipalityName
110001,1100015,Norte,Rondônia,Zona da Mata,Alta Floresta D'Oeste
530010,5300108,Centro-Oeste,Distrito Federal,Distrito Federal,Brasília
",
    );

    let reference = load_municipality_reference(&path).expect("load reference");
    assert_eq!(reference.len(), 2);
    let name = reference
        .column_index(Dimension::Municipality.as_str())
        .expect("municipality column");
    assert_eq!(reference.get_short("530010").expect("short")[name], "Brasília");
    assert_eq!(reference.get_long("1100015").expect("long")[name], "Alta Floresta D'Oeste");
}

#[test]
fn municipality_row_without_codes_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = write_file(
        dir.path(),
        "municipalities.csv",
        "MunicipalityCodeShort,MunicipalityCodeLong,RegionName,StateName,HealthRegionName,MunicipalityName
,,Norte,Rondônia,Zona da Mata,Sem código
",
    );
    let err = load_municipality_reference(&path).unwrap_err();
    assert!(matches!(err, StandardsError::Model(_)));
}
