//! Stage 7: choropleth of municipal population.
//!
//! The boundary mesh is cached next to the other raw downloads, so the
//! stage only goes to the network on its first run. The same boundaries
//! also leave enriched as GeoJSON, with name, population and year stamped
//! onto every municipality the merge matched.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use geojson::{FeatureCollection, GeoJson};

use popbr::br::Brazil;
use popbr::getter::Getter;
use popbr::{config, map, table};

#[tokio::main]
async fn main() -> Result<()> {
    popbr::init_tracing();

    let records =
        table::merged_from_df(&table::read_df(&config::ready_dir().join("municipios_pop.csv"))?)?;
    if records.is_empty() {
        bail!("merged table is empty, nothing to map");
    }
    let year = records.iter().map(|r| r.year).max().unwrap_or(config::REFERENCE_YEAR);

    let boundaries = load_boundaries().await?;
    let shapes = map::shapes(&boundaries);
    println!("Malha: {} municipios desenhaveis", shapes.len());

    let mut population: HashMap<i64, (i32, i64)> = HashMap::new();
    for r in &records {
        let entry = population.entry(r.code).or_insert((r.year, r.population));
        if r.year > entry.0 {
            *entry = (r.year, r.population);
        }
    }
    let population: HashMap<i64, i64> =
        population.into_iter().map(|(code, (_, pop))| (code, pop)).collect();

    let png = config::out_dir().join("mapa_populacao.png");
    let title = format!("Estimativa populacional por município ({year})");
    let stats = map::render_choropleth(&png, &title, &shapes, &population)?;
    println!(
        "Gravado: {} ({} com dados, {} sem dados)",
        png.display(),
        stats.matched,
        stats.no_data
    );

    let enriched = map::enrich(&boundaries, &records);
    let geojson_path = config::out_dir().join("mapa.geojson");
    std::fs::write(&geojson_path, GeoJson::from(enriched).to_string())
        .with_context(|| format!("writing {}", geojson_path.display()))?;
    println!("Gravado: {}", geojson_path.display());
    Ok(())
}

/// Boundary mesh from the local cache, downloading it on the first run.
async fn load_boundaries() -> Result<FeatureCollection> {
    let cache = config::raw_dir().join("malha_municipios.geojson");
    if cache.exists() {
        let contents = std::fs::read_to_string(&cache)
            .with_context(|| format!("reading {}", cache.display()))?;
        return contents
            .parse()
            .with_context(|| format!("parsing cached boundaries {}", cache.display()));
    }

    let mut source = Brazil::new()?;
    let boundaries = source.boundaries().await?;
    if let Some(dir) = cache.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&cache, GeoJson::from(boundaries.clone()).to_string())
        .with_context(|| format!("caching boundaries at {}", cache.display()))?;
    println!("Malha baixada e guardada em {}", cache.display());
    Ok(boundaries)
}
