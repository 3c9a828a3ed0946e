//! Stage 3: turn the saved HTML pages into one population table.

use anyhow::{bail, Context, Result};

use municipio::normalize_name;
use popbr::{config, extract, table};

fn main() -> Result<()> {
    popbr::init_tracing();

    let dir = config::pages_dir();
    let mut pages: Vec<_> = std::fs::read_dir(&dir)
        .with_context(|| format!("missing pages directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("html"))
        .collect();
    pages.sort();

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for page in &pages {
        let uf = page
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(extract::uf_from_stem);
        let html = std::fs::read_to_string(page)
            .with_context(|| format!("reading {}", page.display()))?;
        let got = extract::extract_population(&html, uf.as_deref(), config::REFERENCE_YEAR);
        println!(
            "{}: {} registros, {} linhas puladas",
            page.display(),
            got.records.len(),
            got.skipped
        );
        skipped += got.skipped;
        records.extend(got.records);
    }
    if records.is_empty() {
        bail!("no population rows extracted from {}", dir.display());
    }
    records.sort_by(|a, b| {
        (&a.uf, normalize_name(&a.name), a.year).cmp(&(&b.uf, normalize_name(&b.name), b.year))
    });

    let mut df = table::population_to_df(&records)?;
    println!("{}", df.head(Some(5)));

    let path = config::ready_dir().join("populacao.csv");
    table::write_df(&path, &mut df)?;
    println!(
        "Gravado: {} ({} registros, {} linhas puladas no total)",
        path.display(),
        records.len(),
        skipped
    );
    Ok(())
}
