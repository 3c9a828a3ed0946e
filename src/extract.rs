//! Extraction of population rows from saved estimate pages.
//!
//! Pages arrive as whatever HTML the site served; the extractor scans every
//! table row, takes the first non-numeric cell as the municipality name and
//! the last numeric cell as the population, and drops anything that does
//! not fit. One bad row never aborts the page, one bad page never aborts
//! the batch.

use scraper::{Html, Selector};

use municipio::{normalize_name, PopulationRecord};

/// What one page yielded. `skipped` counts rows that looked like data but
/// could not be parsed; structural rows (headers, totals) are not counted.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<PopulationRecord>,
    pub skipped: usize,
}

// Aggregate rows that show up in the tables but are not municipalities.
const NON_MUNICIPALITY_ROWS: &[&str] = &["total", "brasil", "fonte"];

pub fn extract_population(html: &str, uf: Option<&str>, default_year: i32) -> Extraction {
    let doc = Html::parse_document(html);
    let rows = Selector::parse("table tr").unwrap();
    let cells = Selector::parse("td, th").unwrap();

    let year = page_year(&doc).unwrap_or(default_year);
    let uf = uf.map(|u| u.trim().to_uppercase());

    let mut out = Extraction::default();
    for row in doc.select(&rows) {
        let texts: Vec<String> = row
            .select(&cells)
            .map(|c| c.text().collect::<String>().trim().to_string())
            .collect();
        if texts.len() < 2 {
            continue;
        }

        // First cell that is not a number is the name; a leading rank or
        // code column therefore does not confuse the scan.
        let Some(name_idx) = texts
            .iter()
            .position(|t| !t.is_empty() && parse_pt_number(t).is_none())
        else {
            continue;
        };
        let name = strip_footnote(&texts[name_idx]);
        if name.is_empty() {
            tracing::debug!(row = %texts[name_idx], "footnote-only name cell, ignoring row");
            continue;
        }

        let key = normalize_name(&name);
        if NON_MUNICIPALITY_ROWS.contains(&key.as_str()) || key == "municipio" || key == "municipios"
        {
            tracing::debug!(row = %name, "ignoring aggregate or header row");
            continue;
        }

        let population = texts
            .iter()
            .skip(name_idx + 1)
            .rev()
            .find_map(|t| parse_pt_number(t));
        match population {
            Some(population) => out.records.push(PopulationRecord {
                name,
                uf: uf.clone(),
                population,
                year,
            }),
            None => {
                tracing::warn!(row = %name, "no parseable population figure, skipping row");
                out.skipped += 1;
            }
        }
    }
    out
}

/// Year stated in the page headings, e.g. "Estimativas da população 2025".
fn page_year(doc: &Html) -> Option<i32> {
    let headings = Selector::parse("h1, h2, caption").unwrap();
    for heading in doc.select(&headings) {
        let text: String = heading.text().collect();
        if let Some(year) = find_year(&text) {
            return Some(year);
        }
    }
    None
}

fn find_year(text: &str) -> Option<i32> {
    // Last token wins: range headings like "Estimativas 2021-2025" state
    // the edition year at the end.
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|tok| tok.len() == 4 && tok.starts_with("20"))
        .last()
        .and_then(|tok| tok.parse().ok())
}

/// Parses a pt-BR formatted count: "2.315.560", "1.234(1)", "987 *".
/// Thousands separators are dots; a decimal comma part is truncated since
/// estimates are whole persons. Returns None for anything non-numeric.
pub fn parse_pt_number(raw: &str) -> Option<i64> {
    let cleaned = raw.trim();
    let cleaned = match cleaned.find(|c| c == '(' || c == '*') {
        Some(idx) => cleaned[..idx].trim_end(),
        None => cleaned,
    };
    let cleaned = cleaned.split(',').next().unwrap_or(cleaned);
    if cleaned.is_empty() {
        return None;
    }
    let digits: String = cleaned.chars().filter(|c| *c != '.').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Drops a trailing footnote marker from a scraped name, so "Tarauacá (1)"
/// and "Tarauacá *" both join under "Tarauacá". Parenthesised tokens longer
/// than a marker stay untouched.
fn strip_footnote(raw: &str) -> String {
    let mut name = raw.trim();
    loop {
        if let Some(rest) = name.strip_suffix('*') {
            name = rest.trim_end();
            continue;
        }
        if name.ends_with(')') {
            if let Some(open) = name.rfind('(') {
                let token = &name[open + 1..name.len() - 1];
                if !token.is_empty()
                    && token.len() <= 3
                    && token.chars().all(|c| c.is_ascii_digit() || c == '*')
                {
                    name = name[..open].trim_end();
                    continue;
                }
            }
        }
        break;
    }
    name.to_string()
}

/// Guess the UF from a saved page filename such as `mg.html`.
pub fn uf_from_stem(stem: &str) -> Option<String> {
    let stem = stem.trim();
    if stem.len() == 2 && stem.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(stem.to_uppercase())
    } else {
        None
    }
}
