//! Stage 6: bar charts over the merged table.

use anyhow::{bail, Result};

use popbr::{chart, config, table};

fn main() -> Result<()> {
    popbr::init_tracing();

    let records =
        table::merged_from_df(&table::read_df(&config::ready_dir().join("municipios_pop.csv"))?)?;
    if records.is_empty() {
        bail!("merged table is empty, nothing to chart");
    }

    let out = config::out_dir();
    let charts = [
        (
            out.join("populacao_por_uf.png"),
            "População por UF",
            chart::uf_totals(&records),
            false,
        ),
        (
            out.join("top10_maiores.png"),
            "Os 10 municípios mais populosos",
            chart::top_largest(&records, 10),
            true,
        ),
        (
            out.join("top10_menores.png"),
            "Os 10 municípios menos populosos",
            chart::top_smallest(&records, 10),
            true,
        ),
        (
            out.join("populacao_por_regiao.png"),
            "População por região",
            chart::region_totals(&records),
            false,
        ),
    ];

    for (path, title, bars, rotate) in charts {
        chart::bar_chart(&path, title, "População", &bars, rotate)?;
        println!("Gravado: {}", path.display());
    }
    Ok(())
}
