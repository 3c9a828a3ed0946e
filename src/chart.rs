//! Bar charts over the merged table, rendered to PNG with plotters.
//!
//! The aggregation helpers are pure and carry the tests; rendering is a
//! thin wrapper around one vertical-bar layout shared by every chart.

use std::path::Path;

use anyhow::{bail, Context, Result};
use plotters::prelude::*;

use municipio::MergedRecord;

use crate::stats;

const STEEL_BLUE: RGBColor = RGBColor(70, 130, 180);

#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: i64,
}

/// Total population per state, largest first.
pub fn uf_totals(records: &[MergedRecord]) -> Vec<Bar> {
    stats::by_uf(records)
        .into_iter()
        .map(|s| Bar {
            label: s.uf,
            value: s.total,
        })
        .collect()
}

/// Total population per macro-region, each label carrying its share.
pub fn region_totals(records: &[MergedRecord]) -> Vec<Bar> {
    let mut acc: Vec<(String, i64)> = Vec::new();
    for r in records {
        match acc.iter_mut().find(|(region, _)| *region == r.region) {
            Some((_, total)) => *total += r.population,
            None => acc.push((r.region.clone(), r.population)),
        }
    }
    let grand: i64 = acc.iter().map(|(_, t)| t).sum();
    if grand == 0 {
        return Vec::new();
    }
    acc.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    acc.into_iter()
        .map(|(region, total)| Bar {
            label: format!("{} ({:.1}%)", region, 100.0 * total as f64 / grand as f64),
            value: total,
        })
        .collect()
}

/// The `n` most populous municipalities, labelled "Name - UF".
pub fn top_largest(records: &[MergedRecord], n: usize) -> Vec<Bar> {
    let mut sorted: Vec<&MergedRecord> = records.iter().collect();
    sorted.sort_by(|a, b| b.population.cmp(&a.population).then(a.name.cmp(&b.name)));
    sorted.into_iter().take(n).map(labelled_bar).collect()
}

/// The `n` least populous municipalities, smallest first.
pub fn top_smallest(records: &[MergedRecord], n: usize) -> Vec<Bar> {
    let mut sorted: Vec<&MergedRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.population.cmp(&b.population).then(a.name.cmp(&b.name)));
    sorted.into_iter().take(n).map(labelled_bar).collect()
}

fn labelled_bar(r: &MergedRecord) -> Bar {
    Bar {
        label: format!("{} - {}", r.name, r.uf),
        value: r.population,
    }
}

/// Renders one vertical bar chart. `rotate_labels` turns the x labels
/// upright for long municipality names.
pub fn bar_chart(
    path: &Path,
    title: &str,
    y_desc: &str,
    bars: &[Bar],
    rotate_labels: bool,
) -> Result<()> {
    if bars.is_empty() {
        bail!("no bars to draw for {title:?}");
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating chart directory {}", dir.display()))?;
    }

    let root = BitMapBackend::new(path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let y_max = bars.iter().map(|b| b.value).max().unwrap_or(1).max(1);
    let y_max = y_max + y_max / 20 + 1;
    let x_label_area = if rotate_labels { 180 } else { 60 };

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(x_label_area)
        .y_label_area_size(110)
        .build_cartesian_2d((0u32..bars.len() as u32).into_segmented(), 0i64..y_max)?;

    let label_for = |seg: &SegmentValue<u32>| -> String {
        let idx = match seg {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => *i as usize,
            SegmentValue::Last => return String::new(),
        };
        bars.get(idx).map(|b| b.label.clone()).unwrap_or_default()
    };
    let label_font = if rotate_labels {
        ("sans-serif", 13).into_font().transform(FontTransform::Rotate90)
    } else {
        ("sans-serif", 14).into_font()
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .y_desc(y_desc)
        .axis_desc_style(("sans-serif", 16))
        .x_labels(bars.len())
        .x_label_formatter(&label_for)
        .x_label_style(label_font)
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(STEEL_BLUE.filled())
            .margin(8)
            .data(bars.iter().enumerate().map(|(i, b)| (i as u32, b.value))),
    )?;

    root.present()
        .with_context(|| format!("writing chart to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, uf: &str, region: &str, population: i64) -> MergedRecord {
        MergedRecord {
            code: 0,
            name: name.into(),
            uf: uf.into(),
            region: region.into(),
            population,
            year: 2025,
        }
    }

    fn sample() -> Vec<MergedRecord> {
        vec![
            rec("Belo Horizonte", "MG", "Sudeste", 2_315_560),
            rec("Contagem", "MG", "Sudeste", 700_000),
            rec("Boa Vista", "RR", "Norte", 436_591),
            rec("Amajari", "RR", "Norte", 13_047),
        ]
    }

    #[test]
    fn uf_totals_follow_state_ranking() {
        let bars = uf_totals(&sample());
        assert_eq!(bars[0].label, "MG");
        assert_eq!(bars[0].value, 3_015_560);
        assert_eq!(bars[1].label, "RR");
    }

    #[test]
    fn region_labels_carry_the_share() {
        let bars = region_totals(&sample());
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].label, "Sudeste (87.0%)");
        assert_eq!(bars[1].label, "Norte (13.0%)");
        assert_eq!(bars[0].value + bars[1].value, 3_465_198);
    }

    #[test]
    fn region_totals_of_nothing_is_empty() {
        assert!(region_totals(&[]).is_empty());
    }

    #[test]
    fn top_lists_select_and_order() {
        let largest = top_largest(&sample(), 2);
        assert_eq!(largest[0].label, "Belo Horizonte - MG");
        assert_eq!(largest[1].label, "Contagem - MG");

        let smallest = top_smallest(&sample(), 2);
        assert_eq!(smallest[0].label, "Amajari - RR");
        assert_eq!(smallest[1].label, "Boa Vista - RR");
    }

    #[test]
    fn top_lists_break_ties_by_name() {
        let records = vec![
            rec("Beta", "SP", "Sudeste", 10),
            rec("Alfa", "SP", "Sudeste", 10),
        ];
        let bars = top_largest(&records, 2);
        assert_eq!(bars[0].label, "Alfa - SP");
    }
}
