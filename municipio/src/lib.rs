use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// One municipality as listed by the IBGE localidades API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Municipality {
    // 7-digit IBGE id. The first two digits are the state code.
    pub code: i64,
    pub name: String,
    // Two-letter state abbreviation, e.g. "MG".
    pub uf: String,
    pub uf_name: String,
    // One of the five macro-regions ("Norte", "Nordeste", ...).
    pub region: String,
}

impl Municipality {
    /// Numeric state code embedded in the municipality code.
    pub fn uf_code(&self) -> i64 {
        self.code / 100_000
    }
}

/// A population figure scraped from an estimates page. Names come in with
/// whatever casing, accents and stray whitespace the page happens to use.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PopulationRecord {
    pub name: String,
    // Present when the source page identifies the state.
    pub uf: Option<String>,
    pub population: i64,
    pub year: i32,
}

/// A municipality joined with its population figure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergedRecord {
    pub code: i64,
    pub name: String,
    pub uf: String,
    pub region: String,
    pub population: i64,
    pub year: i32,
}

// Prefixes that some sources prepend to the plain municipality name.
const STRIP_PREFIXES: &[&str] = &["municipio de ", "municipio do ", "municipio da "];

/// Canonical join key for a municipality name: Unicode-lowercased, accents
/// stripped, whitespace collapsed, leading "municipio de/do/da" removed.
/// Idempotent, so already-normalized names pass through unchanged.
pub fn normalize_name(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped: String = lowered.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut out = collapsed.as_str();
    loop {
        let mut changed = false;
        for prefix in STRIP_PREFIXES {
            if let Some(rest) = out.strip_prefix(prefix) {
                out = rest;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    out.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_accents_and_case() {
        assert_eq!(normalize_name("São Paulo"), "sao paulo");
        assert_eq!(normalize_name("BRASÍLIA"), "brasilia");
        assert_eq!(normalize_name("Açaílândia"), "acailandia");
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize_name("  belo   horizonte \t"), "belo horizonte");
    }

    #[test]
    fn normalize_strips_prefix() {
        assert_eq!(normalize_name("Município de Osasco"), "osasco");
        assert_eq!(normalize_name("Município do Rio de Janeiro"), "rio de janeiro");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "São José dos Campos",
            "Município de Município de Santos",
            "  MOGI   DAS  CRUZES ",
            "ita",
        ] {
            let once = normalize_name(raw);
            assert_eq!(normalize_name(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn uf_code_is_leading_digits() {
        let m = Municipality {
            code: 3106200,
            name: "Belo Horizonte".into(),
            uf: "MG".into(),
            uf_name: "Minas Gerais".into(),
            region: "Sudeste".into(),
        };
        assert_eq!(m.uf_code(), 31);
    }
}
