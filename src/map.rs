//! Choropleth of municipal population over the IBGE boundary mesh.
//!
//! Boundaries come in as a GeoJSON feature collection whose features carry
//! the municipality code in a `codarea` property. Shapes with no matching
//! population row are painted grey rather than dropped, and the counts of
//! both kinds are reported back to the caller.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection};
use plotters::prelude::*;

use municipio::MergedRecord;

use crate::config;

const NO_DATA_COLOR: RGBColor = RGBColor(204, 204, 204);
const RAMP_LOW: RGBColor = RGBColor(70, 130, 180);
const RAMP_MID: RGBColor = RGBColor(255, 215, 0);
const RAMP_HIGH: RGBColor = RGBColor(200, 30, 30);

/// One drawable municipality boundary.
pub struct Shape {
    pub code: i64,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MapStats {
    pub matched: usize,
    pub no_data: usize,
}

/// Pulls the drawable shapes out of a boundary collection, skipping
/// features without a usable code or geometry.
pub fn shapes(fc: &FeatureCollection) -> Vec<Shape> {
    let mut out = Vec::with_capacity(fc.features.len());
    for feature in &fc.features {
        let Some(code) = feature_code(feature) else {
            tracing::warn!(property = config::BOUNDARY_CODE_PROPERTY, "boundary feature without a municipality code, skipping");
            continue;
        };
        let Some(geometry) = feature.geometry.as_ref().and_then(to_multipolygon) else {
            tracing::warn!(code, "boundary feature without polygon geometry, skipping");
            continue;
        };
        out.push(Shape { code, geometry });
    }
    out
}

/// Municipality code of a boundary feature. The mesh delivers it as a
/// string property, but a numeric one is accepted too.
pub fn feature_code(feature: &Feature) -> Option<i64> {
    match feature.property(config::BOUNDARY_CODE_PROPERTY)? {
        serde_json::Value::String(s) => s.trim().parse().ok(),
        serde_json::Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

fn to_multipolygon(geometry: &geojson::Geometry) -> Option<MultiPolygon<f64>> {
    match &geometry.value {
        v @ geojson::Value::Polygon(_) => {
            geo::Polygon::<f64>::try_from(v.clone()).ok().map(|p| MultiPolygon(vec![p]))
        }
        v @ geojson::Value::MultiPolygon(_) => MultiPolygon::try_from(v.clone()).ok(),
        _ => None,
    }
}

/// Population-to-color mapping on a log10 scale, so the capitals do not
/// wash out the small-town majority.
pub fn population_color(population: i64, min: i64, max: i64) -> RGBColor {
    let lo = (min.max(1)) as f64;
    let hi = (max.max(1)) as f64;
    let v = (population.max(1)) as f64;
    let t = if hi <= lo {
        0.5
    } else {
        ((v.log10() - lo.log10()) / (hi.log10() - lo.log10())).clamp(0.0, 1.0)
    };
    if t < 0.5 {
        lerp(RAMP_LOW, RAMP_MID, t * 2.0)
    } else {
        lerp(RAMP_MID, RAMP_HIGH, (t - 0.5) * 2.0)
    }
}

fn lerp(a: RGBColor, b: RGBColor, t: f64) -> RGBColor {
    let ch = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * t).round() as u8;
    RGBColor(ch(a.0, b.0), ch(a.1, b.1), ch(a.2, b.2))
}

/// Scale endpoints over the shapes that have a population figure.
fn population_range(shapes: &[Shape], population: &HashMap<i64, i64>) -> (i64, i64) {
    let matched: Vec<i64> = shapes
        .iter()
        .filter_map(|s| population.get(&s.code).copied())
        .collect();
    match (matched.iter().min(), matched.iter().max()) {
        (Some(&lo), Some(&hi)) => (lo, hi),
        _ => (0, 0),
    }
}

/// Fill color per shape, index-aligned with the input, plus the count of
/// shapes with and without a population figure.
pub fn classify(shapes: &[Shape], population: &HashMap<i64, i64>) -> (Vec<RGBColor>, MapStats) {
    let (pop_min, pop_max) = population_range(shapes, population);
    let mut stats = MapStats::default();
    let colors = shapes
        .iter()
        .map(|shape| match population.get(&shape.code) {
            Some(&pop) => {
                stats.matched += 1;
                population_color(pop, pop_min, pop_max)
            }
            None => {
                stats.no_data += 1;
                NO_DATA_COLOR
            }
        })
        .collect();
    (colors, stats)
}

/// Copies the collection, stamping name, population and year onto every
/// feature whose code appears in the merged table.
pub fn enrich(fc: &FeatureCollection, records: &[MergedRecord]) -> FeatureCollection {
    let by_code: HashMap<i64, &MergedRecord> = records.iter().map(|r| (r.code, r)).collect();
    let mut out = fc.clone();
    for feature in &mut out.features {
        let Some(rec) = feature_code(feature).and_then(|code| by_code.get(&code)) else {
            continue;
        };
        feature.set_property("nome", rec.name.clone());
        feature.set_property("populacao", rec.population);
        feature.set_property("ano", rec.year as i64);
    }
    out
}

/// Draws the choropleth PNG. Bigger shapes go down first so that enclaved
/// municipalities stay visible on top of their neighbours.
pub fn render_choropleth(
    path: &Path,
    title: &str,
    shapes: &[Shape],
    population: &HashMap<i64, i64>,
) -> Result<MapStats> {
    if shapes.is_empty() {
        bail!("no boundary shapes to draw");
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating map directory {}", dir.display()))?;
    }

    let (min_x, max_x, min_y, max_y) = bounding_box(shapes);
    let span_x = (max_x - min_x).max(f64::EPSILON);
    let span_y = (max_y - min_y).max(f64::EPSILON);
    let width = 1000u32;
    let height = ((width as f64 * span_y / span_x).round() as u32).clamp(300, 1600);

    let (pop_min, pop_max) = population_range(shapes, population);
    let (colors, stats) = classify(shapes, population);

    let root = BitMapBackend::new(path, (width, height + 60)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 22))
        .margin(10)
        .build_cartesian_2d(min_x..max_x, min_y..max_y)?;

    let mut order: Vec<usize> = (0..shapes.len()).collect();
    order.sort_by(|&a, &b| {
        bbox_area(&shapes[b].geometry)
            .total_cmp(&bbox_area(&shapes[a].geometry))
            .then(shapes[a].code.cmp(&shapes[b].code))
    });

    let mut fills = Vec::new();
    let mut outlines = Vec::new();
    for idx in order {
        let shape = &shapes[idx];
        let color = colors[idx];
        for polygon in &shape.geometry.0 {
            let ring: Vec<(f64, f64)> =
                polygon.exterior().coords().map(|c| (c.x, c.y)).collect();
            if ring.len() < 3 {
                tracing::warn!(code = shape.code, "degenerate ring, skipping");
                continue;
            }
            fills.push(Polygon::new(ring.clone(), color.filled()));
            outlines.push(PathElement::new(ring, BLACK.mix(0.35).stroke_width(1)));
        }
    }
    chart.draw_series(fills)?;
    chart.draw_series(outlines)?;

    if pop_max > 0 {
        draw_legend(&root, pop_min, pop_max, height)?;
    }

    root.present()
        .with_context(|| format!("writing map to {}", path.display()))?;
    Ok(stats)
}

/// Gradient strip with the scale endpoints, in pixel coordinates under
/// the map proper.
fn draw_legend(
    root: &DrawingArea<BitMapBackend, plotters::coord::Shift>,
    pop_min: i64,
    pop_max: i64,
    map_height: u32,
) -> Result<()> {
    const STEPS: i32 = 40;
    const STEP_W: i32 = 6;
    let y0 = map_height as i32 + 20;
    let x0 = 40;

    for step in 0..STEPS {
        let t = step as f64 / (STEPS - 1) as f64;
        let pseudo = (pop_min.max(1) as f64).log10()
            + t * ((pop_max.max(1) as f64).log10() - (pop_min.max(1) as f64).log10());
        let color = population_color(10f64.powf(pseudo).round() as i64, pop_min, pop_max);
        let x = x0 + step * STEP_W;
        root.draw(&Rectangle::new(
            [(x, y0), (x + STEP_W, y0 + 16)],
            color.filled(),
        ))?;
    }
    root.draw(&Text::new(
        format!("{pop_min}"),
        (x0, y0 + 20),
        ("sans-serif", 14),
    ))?;
    root.draw(&Text::new(
        format!("{pop_max}"),
        (x0 + STEPS * STEP_W - 30, y0 + 20),
        ("sans-serif", 14),
    ))?;
    Ok(())
}

fn bounding_box(shapes: &[Shape]) -> (f64, f64, f64, f64) {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for shape in shapes {
        for polygon in &shape.geometry.0 {
            for c in polygon.exterior().coords() {
                min_x = min_x.min(c.x);
                max_x = max_x.max(c.x);
                min_y = min_y.min(c.y);
                max_y = max_y.max(c.y);
            }
        }
    }
    (min_x, max_x, min_y, max_y)
}

fn bbox_area(mp: &MultiPolygon<f64>) -> f64 {
    let mut min_x = f64::INFINITY;
    let mut max_x = f64::NEG_INFINITY;
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for polygon in &mp.0 {
        for c in polygon.exterior().coords() {
            min_x = min_x.min(c.x);
            max_x = max_x.max(c.x);
            min_y = min_y.min(c.y);
            max_y = max_y.max(c.y);
        }
    }
    if min_x > max_x {
        return 0.0;
    }
    (max_x - min_x) * (max_y - min_y)
}
