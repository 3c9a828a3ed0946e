//! Stage 2: download one population-estimate page per state.
//!
//! The states come from the register written by the previous stage, so a
//! state with no municipalities in the API never produces a request. A
//! failed page is logged and skipped; only a batch with zero pages aborts.

use std::collections::BTreeSet;

use anyhow::{bail, Result};

use popbr::br::Brazil;
use popbr::getter::Getter;
use popbr::{config, table};

#[tokio::main]
async fn main() -> Result<()> {
    popbr::init_tracing();

    let df = table::read_df(&config::raw_dir().join("municipios.csv"))?;
    let municipalities = table::municipalities_from_df(&df)?;
    let ufs: BTreeSet<String> = municipalities.into_iter().map(|m| m.uf).collect();
    println!("Estados a buscar: {}", ufs.len());

    let mut source = Brazil::new()?;
    let dir = config::pages_dir();
    std::fs::create_dir_all(&dir)?;

    let mut fetched = 0usize;
    for uf in &ufs {
        match source.population_page(uf).await {
            Ok(html) => {
                let path = dir.join(format!("{}.html", uf.to_lowercase()));
                std::fs::write(&path, html)?;
                println!("{} -> {}", uf, path.display());
                fetched += 1;
            }
            Err(err) => tracing::warn!(%uf, error = %err, "page fetch failed, moving on"),
        }
    }
    if fetched == 0 {
        bail!("no estimate page could be fetched");
    }
    println!("Paginas salvas: {} de {}", fetched, ufs.len());
    Ok(())
}
