//! Offline run of the middle of the pipeline: saved pages in, merged
//! table, data-quality buckets and statistics out, with the CSV handoff
//! exercised through a temp directory.

use municipio::Municipality;
use popbr::merge::MismatchReason;
use popbr::{extract, merge, stats, table};

const MG_PAGE: &str = r#"
    <html><body>
      <h2>Estimativas da população residente 2025</h2>
      <table>
        <tr><th>Município</th><th>População estimada</th></tr>
        <tr><td>Belo Horizonte</td><td>2.315.560</td></tr>
        <tr><td>Contagem</td><td>700.000</td></tr>
        <tr><td>Nova Lima</td><td>—</td></tr>
      </table>
    </body></html>
"#;

const PE_PAGE: &str = r#"
    <table>
      <tr><td>Bonito</td><td>37.000</td></tr>
      <tr><td>Atlântida</td><td>1.234</td></tr>
      <tr><td>Total</td><td>38.234</td></tr>
    </table>
"#;

const MS_PAGE: &str = r#"
    <table>
      <tr><td>Bonito</td><td>23.028 (1)</td></tr>
    </table>
"#;

fn register() -> Vec<Municipality> {
    let mun = |code: i64, name: &str, uf: &str, uf_name: &str, region: &str| Municipality {
        code,
        name: name.into(),
        uf: uf.into(),
        uf_name: uf_name.into(),
        region: region.into(),
    };
    vec![
        mun(3106200, "Belo Horizonte", "MG", "Minas Gerais", "Sudeste"),
        mun(3118601, "Contagem", "MG", "Minas Gerais", "Sudeste"),
        mun(2602902, "Bonito", "PE", "Pernambuco", "Nordeste"),
        mun(5002209, "Bonito", "MS", "Mato Grosso do Sul", "Centro-Oeste"),
        mun(1400100, "Boa Vista", "RR", "Roraima", "Norte"),
        mun(1400704, "Uiramutã", "RR", "Roraima", "Norte"),
    ]
}

fn extract_all() -> Vec<municipio::PopulationRecord> {
    let mut records = Vec::new();
    for (page, uf) in [(MG_PAGE, "mg"), (PE_PAGE, "pe"), (MS_PAGE, "ms")] {
        let uf = extract::uf_from_stem(uf);
        records.extend(extract::extract_population(page, uf.as_deref(), 2025).records);
    }
    records
}

#[test]
fn pages_to_merged_table_with_quality_buckets() {
    let municipalities = register();
    let population = extract_all();
    // Nova Lima's dash and the Total row never become records.
    assert_eq!(population.len(), 5);

    let outcome = merge::merge(&municipalities, &population);
    let matches = outcome.merged.len();
    assert_eq!(matches, 4);

    // Same-named Bonitos land on their own states.
    let bonito_pe = outcome.merged.iter().find(|r| r.code == 2602902).unwrap();
    assert_eq!(bonito_pe.population, 37_000);
    let bonito_ms = outcome.merged.iter().find(|r| r.code == 5002209).unwrap();
    assert_eq!(bonito_ms.population, 23_028);

    // Every input row is accounted for.
    assert_eq!(
        outcome.unmatched_municipalities.len(),
        municipalities.len() - matches
    );
    assert_eq!(outcome.unmatched_population.len(), population.len() - matches);
    assert_eq!(
        outcome.unmatched_population[0].reason,
        MismatchReason::NoMunicipality
    );
    let leftover: Vec<i64> = outcome
        .unmatched_municipalities
        .iter()
        .map(|m| m.code)
        .collect();
    assert_eq!(leftover, vec![1400100, 1400704]);

    // Year comes from the MG heading and from the default elsewhere.
    assert!(outcome.merged.iter().all(|r| r.year == 2025));
}

#[test]
fn merged_statistics_line_up() {
    let outcome = merge::merge(&register(), &extract_all());
    let values: Vec<i64> = outcome.merged.iter().map(|r| r.population).collect();
    let summary = stats::describe(&values).unwrap();

    assert_eq!(summary.count, 4);
    assert_eq!(summary.sum, 3_075_588);
    assert_eq!(summary.min, 23_028);
    assert_eq!(summary.max, 2_315_560);
    assert_eq!(summary.median, 368_500.0);

    let per_uf = stats::by_uf(&outcome.merged);
    assert_eq!(per_uf[0].uf, "MG");
    assert_eq!(per_uf[0].municipalities, 2);
    assert_eq!(per_uf[0].total, 3_015_560);
}

#[test]
fn merged_table_survives_the_csv_handoff() {
    let outcome = merge::merge(&register(), &extract_all());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("municipios_pop.csv");
    let mut df = table::merged_to_df(&outcome.merged).unwrap();
    table::write_df(&path, &mut df).unwrap();

    let back = table::merged_from_df(&table::read_df(&path).unwrap()).unwrap();
    assert_eq!(back, outcome.merged);
}
