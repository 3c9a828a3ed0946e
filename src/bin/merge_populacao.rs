//! Stage 4: join the register with the population table.
//!
//! Besides the merged table, two data-quality files come out of this
//! stage: the municipalities that found no population row, and the
//! population rows that found no municipality, each with the reason.

use anyhow::Result;
use polars::prelude::*;

use municipio::PopulationRecord;
use popbr::{config, merge, table};

fn main() -> Result<()> {
    popbr::init_tracing();

    let municipalities =
        table::municipalities_from_df(&table::read_df(&config::raw_dir().join("municipios.csv"))?)?;
    let population =
        table::population_from_df(&table::read_df(&config::ready_dir().join("populacao.csv"))?)?;
    println!(
        "Entrada: {} municipios, {} linhas de populacao",
        municipalities.len(),
        population.len()
    );

    let outcome = merge::merge(&municipalities, &population);
    println!("Casados: {}", outcome.merged.len());
    println!(
        "Municipios sem populacao: {}",
        outcome.unmatched_municipalities.len()
    );
    println!(
        "Linhas de populacao sem municipio: {}",
        outcome.unmatched_population.len()
    );
    for (reason, n) in outcome.reason_counts() {
        if n > 0 {
            println!("  {}: {}", reason.as_str(), n);
        }
    }

    let ready = config::ready_dir();

    let mut merged_df = table::merged_to_df(&outcome.merged)?;
    println!("{}", merged_df.head(Some(5)));
    table::write_df(&ready.join("municipios_pop.csv"), &mut merged_df)?;

    let mut leftover_df = table::municipalities_to_df(&outcome.unmatched_municipalities)?;
    table::write_df(&ready.join("nao_casados_municipios.csv"), &mut leftover_df)?;

    let rows: Vec<PopulationRecord> = outcome
        .unmatched_population
        .iter()
        .map(|u| u.record.clone())
        .collect();
    let reasons: Vec<&str> = outcome
        .unmatched_population
        .iter()
        .map(|u| u.reason.as_str())
        .collect();
    let mut unmatched_df = table::population_to_df(&rows)?;
    unmatched_df.with_column(Series::new("motivo", reasons))?;
    table::write_df(&ready.join("nao_casados_populacao.csv"), &mut unmatched_df)?;

    println!("Gravado: {}", ready.join("municipios_pop.csv").display());
    Ok(())
}
