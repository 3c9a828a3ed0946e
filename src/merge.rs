//! Join of the municipality register with scraped population figures.
//!
//! The join key is the normalized name, not the IBGE code, because the
//! estimate pages carry only names. Brazil has same-named municipalities
//! in different states, so a name collision is resolved by the state
//! abbreviation when the population row carries one and flagged as
//! unresolved when it does not.

use std::collections::{HashMap, HashSet};

use municipio::{normalize_name, MergedRecord, Municipality, PopulationRecord};

/// Why a population row did not make it into the merged table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MismatchReason {
    /// No municipality normalizes to this name.
    NoMunicipality,
    /// Several municipalities share the name and the row cannot pick one.
    Ambiguous,
    /// The row names a state that disagrees with every candidate.
    UfDivergent,
    /// A previous row already supplied this municipality and year.
    Duplicate,
}

impl MismatchReason {
    pub const ALL: [MismatchReason; 4] = [
        MismatchReason::NoMunicipality,
        MismatchReason::Ambiguous,
        MismatchReason::UfDivergent,
        MismatchReason::Duplicate,
    ];

    /// Stable identifier used in the data-quality report.
    pub fn as_str(self) -> &'static str {
        match self {
            MismatchReason::NoMunicipality => "sem_municipio",
            MismatchReason::Ambiguous => "ambiguo",
            MismatchReason::UfDivergent => "uf_divergente",
            MismatchReason::Duplicate => "duplicado",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Unmatched {
    pub record: PopulationRecord,
    pub reason: MismatchReason,
}

#[derive(Debug, Default, PartialEq)]
pub struct MergeOutcome {
    /// Inner-join result, sorted by (code, year).
    pub merged: Vec<MergedRecord>,
    /// Municipalities with no population row, sorted by code.
    pub unmatched_municipalities: Vec<Municipality>,
    /// Population rows that found no municipality, with the reason.
    pub unmatched_population: Vec<Unmatched>,
}

impl MergeOutcome {
    /// Unmatched-population counts per reason, in `MismatchReason::ALL` order.
    pub fn reason_counts(&self) -> Vec<(MismatchReason, usize)> {
        MismatchReason::ALL
            .iter()
            .map(|&reason| {
                let n = self
                    .unmatched_population
                    .iter()
                    .filter(|u| u.reason == reason)
                    .count();
                (reason, n)
            })
            .collect()
    }
}

pub fn merge(municipalities: &[Municipality], population: &[PopulationRecord]) -> MergeOutcome {
    let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, m) in municipalities.iter().enumerate() {
        by_name.entry(normalize_name(&m.name)).or_default().push(idx);
    }

    let mut outcome = MergeOutcome::default();
    let mut matched: HashSet<usize> = HashSet::new();
    let mut claimed: HashSet<(usize, i32)> = HashSet::new();

    for rec in population {
        match resolve(municipalities, &by_name, rec) {
            Ok(idx) => {
                if !claimed.insert((idx, rec.year)) {
                    outcome.unmatched_population.push(Unmatched {
                        record: rec.clone(),
                        reason: MismatchReason::Duplicate,
                    });
                    continue;
                }
                matched.insert(idx);
                let m = &municipalities[idx];
                outcome.merged.push(MergedRecord {
                    code: m.code,
                    name: m.name.clone(),
                    uf: m.uf.clone(),
                    region: m.region.clone(),
                    population: rec.population,
                    year: rec.year,
                });
            }
            Err(reason) => outcome.unmatched_population.push(Unmatched {
                record: rec.clone(),
                reason,
            }),
        }
    }

    outcome.merged.sort_by_key(|r| (r.code, r.year));
    outcome.unmatched_municipalities = municipalities
        .iter()
        .enumerate()
        .filter(|(idx, _)| !matched.contains(idx))
        .map(|(_, m)| m.clone())
        .collect();
    outcome.unmatched_municipalities.sort_by_key(|m| m.code);
    outcome
        .unmatched_population
        .sort_by(|a, b| {
            (a.reason.as_str(), normalize_name(&a.record.name), a.record.year).cmp(&(
                b.reason.as_str(),
                normalize_name(&b.record.name),
                b.record.year,
            ))
        });
    outcome
}

/// Picks the municipality a population row refers to, or says why none fits.
fn resolve(
    municipalities: &[Municipality],
    by_name: &HashMap<String, Vec<usize>>,
    rec: &PopulationRecord,
) -> Result<usize, MismatchReason> {
    let key = normalize_name(&rec.name);
    let Some(candidates) = by_name.get(&key) else {
        return Err(MismatchReason::NoMunicipality);
    };

    if let [only] = candidates.as_slice() {
        return match &rec.uf {
            Some(uf) if !uf.eq_ignore_ascii_case(&municipalities[*only].uf) => {
                Err(MismatchReason::UfDivergent)
            }
            _ => Ok(*only),
        };
    }

    // Name collision. Without a state on the row there is nothing to pick
    // by, so the row is reported rather than guessed at.
    let Some(uf) = &rec.uf else {
        return Err(MismatchReason::Ambiguous);
    };
    let in_state: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|&idx| municipalities[idx].uf.eq_ignore_ascii_case(uf))
        .collect();
    match in_state.as_slice() {
        [] => Err(MismatchReason::UfDivergent),
        [only] => Ok(*only),
        _ => Err(MismatchReason::Ambiguous),
    }
}
