//! Fixed endpoints and tunables shared by the stage binaries.
//!
//! Stages take no command-line arguments; everything that might need
//! adjusting lives here, with a couple of environment overrides for the
//! directories and the HTTP timeout. Proxy settings are picked up from the
//! standard `HTTP_PROXY`/`HTTPS_PROXY` variables by the HTTP client itself.

use std::path::PathBuf;
use std::time::Duration;

/// IBGE localidades API: the canonical municipality list.
pub const MUNICIPIOS_URL: &str =
    "https://servicodados.ibge.gov.br/api/v1/localidades/municipios";

/// Landing page listing the population-estimate editions. The fetch stage
/// scans it for the current edition link instead of hardcoding one.
pub const ESTIMATES_INDEX_URL: &str =
    "https://www.ibge.gov.br/estatisticas/sociais/populacao/9103-estimativas-de-populacao.html";

/// Zip archive with the municipality boundary mesh as GeoJSON.
pub const BOUNDARIES_ZIP_URL: &str =
    "https://geoftp.ibge.gov.br/organizacao_do_territorio/malhas_territoriais/malhas_municipais/municipio_2024/Brasil/BR_Municipios_2024_geojson.zip";

/// Preferred entry inside the boundary archive. When absent, the first
/// `.geojson` entry is taken instead.
pub const BOUNDARIES_ZIP_ENTRY: &str = "BR_Municipios_2024.geojson";

/// Feature property holding the 7-digit IBGE code in the boundary mesh.
pub const BOUNDARY_CODE_PROPERTY: &str = "codarea";

/// Identifying ourselves to the server is part of polite scraping.
pub const USER_AGENT: &str = "popbr/0.1 (IBGE municipal population pipeline)";

/// Edition year the fetch stage prefers when scanning the index page, and
/// the year assigned to extracted rows when the page does not state one.
pub const REFERENCE_YEAR: i32 = 2025;

/// Pause between consecutive requests to the same host.
pub const COURTESY_DELAY: Duration = Duration::from_millis(300);

/// Transient failures (timeouts, 5xx) are retried this many times in total,
/// doubling the delay below between attempts.
pub const RETRY_ATTEMPTS: u32 = 3;
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Request timeout, overridable via `POPBR_HTTP_TIMEOUT_SECS`.
pub fn http_timeout() -> Duration {
    let secs = std::env::var("POPBR_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    Duration::from_secs(secs)
}

/// Base data directory (`POPBR_DATA_DIR`, default `./data`).
pub fn data_dir() -> PathBuf {
    std::env::var("POPBR_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Raw downloads land here before any cleaning.
pub fn raw_dir() -> PathBuf {
    data_dir().join("raw")
}

/// One saved HTML page per state.
pub fn pages_dir() -> PathBuf {
    raw_dir().join("pages")
}

/// Cleaned, merge-ready outputs.
pub fn ready_dir() -> PathBuf {
    data_dir().join("ready")
}

/// Charts and the map (`POPBR_OUT_DIR`, default `./charts`).
pub fn out_dir() -> PathBuf {
    std::env::var("POPBR_OUT_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("charts"))
}
