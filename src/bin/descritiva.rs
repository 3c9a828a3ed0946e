//! Stage 5: descriptive statistics over the merged table.

use anyhow::{bail, Result};
use polars::prelude::*;

use popbr::{config, stats, table};

fn main() -> Result<()> {
    popbr::init_tracing();

    let records =
        table::merged_from_df(&table::read_df(&config::ready_dir().join("municipios_pop.csv"))?)?;
    let values: Vec<i64> = records.iter().map(|r| r.population).collect();
    let Some(summary) = stats::describe(&values) else {
        bail!("merged table is empty, nothing to describe");
    };

    let (metrics, numbers): (Vec<String>, Vec<String>) =
        summary.report_rows().into_iter().unzip();
    let mut report = df!("metrica" => metrics, "valor" => numbers)?;
    println!("Resumo da populacao municipal:");
    println!("{}", report);
    table::write_df(&config::ready_dir().join("relatorio_descritivo.csv"), &mut report)?;

    let per_uf = stats::by_uf(&records);
    let ufs: Vec<&str> = per_uf.iter().map(|s| s.uf.as_str()).collect();
    let counts: Vec<i64> = per_uf.iter().map(|s| s.municipalities as i64).collect();
    let totals: Vec<i64> = per_uf.iter().map(|s| s.total).collect();
    let means: Vec<f64> = per_uf.iter().map(|s| s.mean).collect();
    let mut uf_report = df!(
        "uf" => ufs,
        "municipios" => counts,
        "populacao_total" => totals,
        "populacao_media" => means,
    )?;
    println!("Por UF:");
    println!("{}", uf_report);
    table::write_df(&config::ready_dir().join("relatorio_uf.csv"), &mut uf_report)?;

    Ok(())
}
