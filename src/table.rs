//! CSV interchange between stages, polars-backed.
//!
//! Stage logic works on plain structs; this module converts them to and
//! from `DataFrame`s so files on disk keep the schemas the next stage
//! expects. Numeric columns are written as i64 throughout, matching what
//! the CSV reader infers when the file is read back.

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use polars::prelude::*;

use municipio::{MergedRecord, Municipality, PopulationRecord};

pub fn write_df(path: &Path, df: &mut DataFrame) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file =
        File::create(path).with_context(|| format!("creating {}", path.display()))?;
    CsvWriter::new(&mut file).finish(df)?;
    Ok(())
}

pub fn read_df(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("missing stage input {}", path.display()))?;
    CsvReader::new(file)
        .has_header(true)
        .finish()
        .with_context(|| format!("reading {}", path.display()))
}

pub fn municipalities_to_df(rows: &[Municipality]) -> Result<DataFrame> {
    let codes: Vec<i64> = rows.iter().map(|m| m.code).collect();
    let names: Vec<&str> = rows.iter().map(|m| m.name.as_str()).collect();
    let ufs: Vec<&str> = rows.iter().map(|m| m.uf.as_str()).collect();
    let uf_names: Vec<&str> = rows.iter().map(|m| m.uf_name.as_str()).collect();
    let regions: Vec<&str> = rows.iter().map(|m| m.region.as_str()).collect();
    Ok(df!(
        "id_ibge" => codes,
        "nome" => names,
        "uf" => ufs,
        "uf_nome" => uf_names,
        "regiao" => regions,
    )?)
}

pub fn municipalities_from_df(df: &DataFrame) -> Result<Vec<Municipality>> {
    // A header-only file reads back with every column inferred as utf8,
    // so the typed accessors below must not run on zero rows.
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    let code = df.column("id_ibge")?.i64()?;
    let name = df.column("nome")?.utf8()?;
    let uf = df.column("uf")?.utf8()?;
    let uf_name = df.column("uf_nome")?.utf8()?;
    let region = df.column("regiao")?.utf8()?;

    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(code), Some(name), Some(uf)) = (code.get(i), name.get(i), uf.get(i)) else {
            bail!("municipios.csv row {i} is missing id_ibge, nome or uf");
        };
        out.push(Municipality {
            code,
            name: name.to_string(),
            uf: uf.to_string(),
            uf_name: uf_name.get(i).unwrap_or_default().to_string(),
            region: region.get(i).unwrap_or_default().to_string(),
        });
    }
    Ok(out)
}

pub fn population_to_df(rows: &[PopulationRecord]) -> Result<DataFrame> {
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    let ufs: Vec<Option<&str>> = rows.iter().map(|r| r.uf.as_deref()).collect();
    let pops: Vec<i64> = rows.iter().map(|r| r.population).collect();
    let years: Vec<i64> = rows.iter().map(|r| r.year as i64).collect();
    Ok(df!(
        "nome" => names,
        "uf" => ufs,
        "populacao" => pops,
        "ano" => years,
    )?)
}

pub fn population_from_df(df: &DataFrame) -> Result<Vec<PopulationRecord>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    let name = df.column("nome")?.utf8()?;
    let uf = df.column("uf")?.utf8()?;
    let pop = df.column("populacao")?.i64()?;
    let year = df.column("ano")?.i64()?;

    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(name), Some(population), Some(year)) = (name.get(i), pop.get(i), year.get(i))
        else {
            bail!("populacao.csv row {i} is missing nome, populacao or ano");
        };
        out.push(PopulationRecord {
            name: name.to_string(),
            uf: uf.get(i).map(str::to_string),
            population,
            year: year as i32,
        });
    }
    Ok(out)
}

pub fn merged_to_df(rows: &[MergedRecord]) -> Result<DataFrame> {
    let codes: Vec<i64> = rows.iter().map(|r| r.code).collect();
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    let ufs: Vec<&str> = rows.iter().map(|r| r.uf.as_str()).collect();
    let regions: Vec<&str> = rows.iter().map(|r| r.region.as_str()).collect();
    let pops: Vec<i64> = rows.iter().map(|r| r.population).collect();
    let years: Vec<i64> = rows.iter().map(|r| r.year as i64).collect();
    Ok(df!(
        "id_ibge" => codes,
        "nome" => names,
        "uf" => ufs,
        "regiao" => regions,
        "populacao" => pops,
        "ano" => years,
    )?)
}

pub fn merged_from_df(df: &DataFrame) -> Result<Vec<MergedRecord>> {
    if df.height() == 0 {
        return Ok(Vec::new());
    }
    let code = df.column("id_ibge")?.i64()?;
    let name = df.column("nome")?.utf8()?;
    let uf = df.column("uf")?.utf8()?;
    let region = df.column("regiao")?.utf8()?;
    let pop = df.column("populacao")?.i64()?;
    let year = df.column("ano")?.i64()?;

    let mut out = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let (Some(code), Some(name), Some(uf), Some(population), Some(year)) =
            (code.get(i), name.get(i), uf.get(i), pop.get(i), year.get(i))
        else {
            bail!("municipios_pop.csv row {i} has missing fields");
        };
        out.push(MergedRecord {
            code,
            name: name.to_string(),
            uf: uf.to_string(),
            region: region.get(i).unwrap_or_default().to_string(),
            population,
            year: year as i32,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_merged() -> Vec<MergedRecord> {
        vec![
            MergedRecord {
                code: 3106200,
                name: "Belo Horizonte".into(),
                uf: "MG".into(),
                region: "Sudeste".into(),
                population: 2_315_560,
                year: 2025,
            },
            MergedRecord {
                code: 3550308,
                name: "São Paulo".into(),
                uf: "SP".into(),
                region: "Sudeste".into(),
                population: 11_451_999,
                year: 2025,
            },
        ]
    }

    #[test]
    fn merged_roundtrips_through_csv() {
        let rows = sample_merged();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("municipios_pop.csv");

        let mut df = merged_to_df(&rows).unwrap();
        write_df(&path, &mut df).unwrap();
        let back = merged_from_df(&read_df(&path).unwrap()).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn population_roundtrip_keeps_missing_uf() {
        let rows = vec![
            PopulationRecord {
                name: "Boa Vista".into(),
                uf: Some("RR".into()),
                population: 436_591,
                year: 2025,
            },
            PopulationRecord {
                name: "Alto Alegre".into(),
                uf: None,
                population: 11_646,
                year: 2025,
            },
        ];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("populacao.csv");

        let mut df = population_to_df(&rows).unwrap();
        write_df(&path, &mut df).unwrap();
        let back = population_from_df(&read_df(&path).unwrap()).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn header_only_files_read_back_as_empty() {
        let dir = tempfile::tempdir().unwrap();

        let path = dir.path().join("municipios_pop.csv");
        let mut df = merged_to_df(&[]).unwrap();
        write_df(&path, &mut df).unwrap();
        assert!(merged_from_df(&read_df(&path).unwrap()).unwrap().is_empty());

        let path = dir.path().join("nao_casados_municipios.csv");
        let mut df = municipalities_to_df(&[]).unwrap();
        write_df(&path, &mut df).unwrap();
        let back = municipalities_from_df(&read_df(&path).unwrap()).unwrap();
        assert!(back.is_empty());

        let path = dir.path().join("nao_casados_populacao.csv");
        let mut df = population_to_df(&[]).unwrap();
        write_df(&path, &mut df).unwrap();
        let back = population_from_df(&read_df(&path).unwrap()).unwrap();
        assert!(back.is_empty());
    }
}
