use async_trait::async_trait;
use geojson::FeatureCollection;
use municipio::Municipality;

/// Gets municipality metadata, population pages and boundary data from a
/// national statistics source.
#[async_trait]
pub trait Getter {
    /// Canonical municipality list (code, name, state, region).
    async fn municipalities(&mut self) -> anyhow::Result<Vec<Municipality>>;
    /// Raw HTML of the population-estimates page for one state.
    async fn population_page(&mut self, uf: &str) -> anyhow::Result<String>;
    /// Municipality boundary polygons.
    async fn boundaries(&mut self) -> anyhow::Result<FeatureCollection>;
}
