//! IBGE data source for Brazil.
//!
//! Three acquisitions live here: the municipality list from the localidades
//! API, the per-state population-estimate pages (discovered by scanning the
//! estimates landing page for the current edition), and the municipality
//! boundary mesh shipped as a GeoJSON inside a zip archive.

use std::io::{Read, Write};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use geojson::FeatureCollection;
use scraper::{Html, Selector};
use serde::Deserialize;

use municipio::Municipality;

use crate::config;
use crate::getter::Getter;
use crate::http::PoliteClient;

/// Nested JSON shape of `/api/v1/localidades/municipios`. Every level is
/// optional so one missing branch never sinks the whole batch.
#[derive(Debug, Deserialize)]
struct ApiMunicipio {
    id: Option<i64>,
    nome: Option<String>,
    microrregiao: Option<ApiMicrorregiao>,
}

#[derive(Debug, Deserialize)]
struct ApiMicrorregiao {
    mesorregiao: Option<ApiMesorregiao>,
}

#[derive(Debug, Deserialize)]
struct ApiMesorregiao {
    #[serde(rename = "UF")]
    uf: Option<ApiUf>,
}

#[derive(Debug, Deserialize)]
struct ApiUf {
    sigla: Option<String>,
    nome: Option<String>,
    regiao: Option<ApiRegiao>,
}

#[derive(Debug, Deserialize)]
struct ApiRegiao {
    nome: Option<String>,
}

impl ApiMunicipio {
    /// None when the record is unusable: missing id, name or state, or an
    /// id whose state prefix is not a real one.
    fn into_municipality(self) -> Option<Municipality> {
        let code = self.id?;
        let name = self.nome?;
        let uf = self
            .microrregiao
            .and_then(|m| m.mesorregiao)
            .and_then(|m| m.uf)?;
        let m = Municipality {
            code,
            name,
            uf: uf.sigla?,
            uf_name: uf.nome.unwrap_or_default(),
            region: uf.regiao.and_then(|r| r.nome).unwrap_or_default(),
        };
        // A real 7-digit id starts with a state code between 11 and 53.
        (11..=53).contains(&m.uf_code()).then_some(m)
    }
}

pub struct Brazil {
    client: PoliteClient,
    // Edition page located on first use, then reused for every state.
    edition: Option<String>,
}

impl Brazil {
    pub fn new() -> Result<Self> {
        Ok(Brazil {
            client: PoliteClient::new()?,
            edition: None,
        })
    }

    async fn edition_url(&mut self) -> Result<String> {
        if let Some(url) = &self.edition {
            return Ok(url.clone());
        }
        let index = self
            .client
            .get_text(config::ESTIMATES_INDEX_URL)
            .await
            .context("fetching the estimates index page")?;
        let url = discover_edition(&index, config::ESTIMATES_INDEX_URL, config::REFERENCE_YEAR)?;
        tracing::debug!(%url, "estimates edition located");
        self.edition = Some(url.clone());
        Ok(url)
    }
}

#[async_trait]
impl Getter for Brazil {
    async fn municipalities(&mut self) -> Result<Vec<Municipality>> {
        let raw: Vec<ApiMunicipio> = self
            .client
            .get_json(config::MUNICIPIOS_URL)
            .await
            .context("fetching the municipality list")?;

        let total = raw.len();
        let mut out = Vec::with_capacity(total);
        for item in raw {
            match item.into_municipality() {
                Some(m) => out.push(m),
                None => tracing::warn!("skipping API record with missing id, name or state"),
            }
        }
        if out.is_empty() {
            bail!("municipality list came back empty");
        }
        if out.len() < total {
            tracing::warn!(skipped = total - out.len(), "incomplete API records dropped");
        }
        out.sort_by_key(|m| m.code);
        Ok(out)
    }

    async fn population_page(&mut self, uf: &str) -> Result<String> {
        let edition = self.edition_url().await?;
        let url = page_url_for_uf(&edition, uf);
        self.client
            .get_text(&url)
            .await
            .with_context(|| format!("fetching the estimates page for {uf}"))
    }

    async fn boundaries(&mut self) -> Result<FeatureCollection> {
        let bytes = self
            .client
            .get_bytes(config::BOUNDARIES_ZIP_URL)
            .await
            .context("downloading the boundary archive")?;
        let mut tmpfile = tempfile::tempfile()?;
        tmpfile.write_all(&bytes)?;
        let mut zip = zip::ZipArchive::new(tmpfile)?;

        let entry = if zip.file_names().any(|n| n == config::BOUNDARIES_ZIP_ENTRY) {
            config::BOUNDARIES_ZIP_ENTRY.to_string()
        } else {
            match zip
                .file_names()
                .find(|n| n.to_lowercase().ends_with(".geojson"))
            {
                Some(name) => name.to_string(),
                None => bail!("boundary archive contains no .geojson entry"),
            }
        };

        let mut file = zip.by_name(&entry)?;
        let mut buffer = String::new();
        file.read_to_string(&mut buffer)?;
        buffer
            .parse()
            .with_context(|| format!("parsing GeoJSON entry {entry}"))
    }
}

/// Finds the current estimates edition among the anchors of the landing
/// page: prefer a link naming the reference year, fall back to one
/// mentioning "pop", else take the first estimates link.
fn discover_edition(index_html: &str, base_url: &str, prefer_year: i32) -> Result<String> {
    let doc = Html::parse_document(index_html);
    let anchors = Selector::parse("a[href]").unwrap();

    let mut candidates = Vec::new();
    for a in doc.select(&anchors) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if !href.to_lowercase().contains("estimativas") {
            continue;
        }
        if let Some(url) = resolve_url(base_url, href) {
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        }
    }
    if candidates.is_empty() {
        bail!("no estimates link found on {base_url}");
    }

    let year = prefer_year.to_string();
    if let Some(url) = candidates.iter().find(|u| u.contains(&year)) {
        return Ok(url.clone());
    }
    if let Some(url) = candidates.iter().find(|u| u.to_lowercase().contains("pop")) {
        return Ok(url.clone());
    }
    Ok(candidates.remove(0))
}

fn resolve_url(base: &str, href: &str) -> Option<String> {
    let base = reqwest::Url::parse(base).ok()?;
    Some(base.join(href).ok()?.to_string())
}

/// Per-state page address under an edition page.
fn page_url_for_uf(edition: &str, uf: &str) -> String {
    let base = edition.strip_suffix(".html").unwrap_or(edition);
    format!("{}/{}.html", base, uf.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
        <html><body>
          <a href="/sobre.html">Sobre</a>
          <a href="/estatisticas/estimativas-de-populacao-2023.html">2023</a>
          <a href="/estatisticas/estimativas-de-populacao-2025.html">2025</a>
        </body></html>
    "#;

    #[test]
    fn discover_prefers_reference_year() {
        let url = discover_edition(INDEX, "https://www.ibge.gov.br/index.html", 2025).unwrap();
        assert_eq!(
            url,
            "https://www.ibge.gov.br/estatisticas/estimativas-de-populacao-2025.html"
        );
    }

    #[test]
    fn discover_falls_back_to_pop_link() {
        let html = r#"<a href="/estimativas-pop.html">x</a><a href="/estimativas-outros.html">y</a>"#;
        let url = discover_edition(html, "https://www.ibge.gov.br/", 1999).unwrap();
        assert_eq!(url, "https://www.ibge.gov.br/estimativas-pop.html");
    }

    #[test]
    fn discover_fails_without_candidates() {
        assert!(discover_edition("<html></html>", "https://www.ibge.gov.br/", 2025).is_err());
    }

    #[test]
    fn page_urls_are_per_state() {
        assert_eq!(
            page_url_for_uf("https://x.gov.br/estimativas-2025.html", "MG"),
            "https://x.gov.br/estimativas-2025/mg.html"
        );
    }

    fn microrregiao(sigla: &str) -> ApiMicrorregiao {
        ApiMicrorregiao {
            mesorregiao: Some(ApiMesorregiao {
                uf: Some(ApiUf {
                    sigla: Some(sigla.into()),
                    nome: None,
                    regiao: None,
                }),
            }),
        }
    }

    #[test]
    fn ids_without_a_state_prefix_convert_to_none() {
        let bogus = ApiMunicipio {
            id: Some(99),
            nome: Some("Atlântida".into()),
            microrregiao: Some(microrregiao("RS")),
        };
        assert!(bogus.into_municipality().is_none());

        let ok = ApiMunicipio {
            id: Some(4300001),
            nome: Some("Atlântida".into()),
            microrregiao: Some(microrregiao("RS")),
        };
        assert_eq!(ok.into_municipality().unwrap().uf_code(), 43);
    }

    #[test]
    fn incomplete_api_records_convert_to_none() {
        let missing_uf = ApiMunicipio {
            id: Some(3106200),
            nome: Some("Belo Horizonte".into()),
            microrregiao: None,
        };
        assert!(missing_uf.into_municipality().is_none());

        let complete = ApiMunicipio {
            id: Some(3106200),
            nome: Some("Belo Horizonte".into()),
            microrregiao: Some(ApiMicrorregiao {
                mesorregiao: Some(ApiMesorregiao {
                    uf: Some(ApiUf {
                        sigla: Some("MG".into()),
                        nome: Some("Minas Gerais".into()),
                        regiao: Some(ApiRegiao {
                            nome: Some("Sudeste".into()),
                        }),
                    }),
                }),
            }),
        };
        let m = complete.into_municipality().unwrap();
        assert_eq!(m.code, 3106200);
        assert_eq!(m.uf, "MG");
        assert_eq!(m.region, "Sudeste");
    }
}
