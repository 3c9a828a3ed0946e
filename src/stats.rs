//! Descriptive statistics over the merged population table.

use std::collections::HashMap;

use municipio::MergedRecord;

/// Summary of one numeric series. Quantiles use linear interpolation
/// between the two nearest ranks, the standard deviation is the sample
/// one (n - 1), and outliers are values beyond 1.5 IQR of the quartiles.
#[derive(Clone, Debug, PartialEq)]
pub struct Descriptive {
    pub count: usize,
    pub sum: i64,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: i64,
    pub max: i64,
    pub q1: f64,
    pub q3: f64,
    pub outliers: usize,
}

impl Descriptive {
    /// Rows for the metric/value report, counts as integers and the
    /// rest with two decimals.
    pub fn report_rows(&self) -> Vec<(String, String)> {
        vec![
            ("municipios".into(), self.count.to_string()),
            ("soma".into(), self.sum.to_string()),
            ("media".into(), format!("{:.2}", self.mean)),
            ("mediana".into(), format!("{:.2}", self.median)),
            ("desvio_padrao".into(), format!("{:.2}", self.std_dev)),
            ("minimo".into(), self.min.to_string()),
            ("maximo".into(), self.max.to_string()),
            ("q1".into(), format!("{:.2}", self.q1)),
            ("q3".into(), format!("{:.2}", self.q3)),
            ("outliers".into(), self.outliers.to_string()),
        ]
    }
}

pub fn describe(values: &[i64]) -> Option<Descriptive> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let count = sorted.len();
    let sum: i64 = sorted.iter().sum();
    let mean = sum as f64 / count as f64;

    let variance = if count < 2 {
        0.0
    } else {
        sorted
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / (count - 1) as f64
    };

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);
    let outliers = sorted
        .iter()
        .filter(|&&v| (v as f64) < lo_fence || (v as f64) > hi_fence)
        .count();

    Some(Descriptive {
        count,
        sum,
        mean,
        median: quantile(&sorted, 0.5),
        std_dev: variance.sqrt(),
        min: sorted[0],
        max: sorted[count - 1],
        q1,
        q3,
        outliers,
    })
}

/// Quantile of an already sorted slice, 0.0 <= q <= 1.0.
fn quantile(sorted: &[i64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] as f64 + frac * (sorted[hi] - sorted[lo]) as f64
}

/// Per-state rollup of the merged table.
#[derive(Clone, Debug, PartialEq)]
pub struct UfSummary {
    pub uf: String,
    pub municipalities: usize,
    pub total: i64,
    pub mean: f64,
}

/// Aggregates by state, largest total first, ties broken by abbreviation.
pub fn by_uf(records: &[MergedRecord]) -> Vec<UfSummary> {
    let mut acc: HashMap<&str, (usize, i64)> = HashMap::new();
    for r in records {
        let e = acc.entry(r.uf.as_str()).or_default();
        e.0 += 1;
        e.1 += r.population;
    }
    let mut out: Vec<UfSummary> = acc
        .into_iter()
        .map(|(uf, (municipalities, total))| UfSummary {
            uf: uf.to_string(),
            municipalities,
            total,
            mean: total as f64 / municipalities as f64,
        })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total).then(a.uf.cmp(&b.uf)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(code: i64, uf: &str, population: i64) -> MergedRecord {
        MergedRecord {
            code,
            name: format!("m{code}"),
            uf: uf.into(),
            region: "Norte".into(),
            population,
            year: 2025,
        }
    }

    #[test]
    fn describe_small_series() {
        let d = describe(&[300, 100, 200]).unwrap();
        assert_eq!(d.count, 3);
        assert_eq!(d.sum, 600);
        assert_eq!(d.mean, 200.0);
        assert_eq!(d.median, 200.0);
        assert_eq!(d.std_dev, 100.0);
        assert_eq!(d.min, 100);
        assert_eq!(d.max, 300);
        assert_eq!(d.q1, 150.0);
        assert_eq!(d.q3, 250.0);
        assert_eq!(d.outliers, 0);
    }

    #[test]
    fn describe_empty_and_singleton() {
        assert_eq!(describe(&[]), None);
        let d = describe(&[42]).unwrap();
        assert_eq!(d.median, 42.0);
        assert_eq!(d.std_dev, 0.0);
        assert_eq!(d.q1, 42.0);
        assert_eq!(d.q3, 42.0);
    }

    #[test]
    fn fences_catch_the_stray_value() {
        let d = describe(&[10, 11, 12, 12, 13, 100]).unwrap();
        assert_eq!(d.outliers, 1);
    }

    #[test]
    fn report_rows_format() {
        let d = describe(&[100, 200, 300]).unwrap();
        let rows = d.report_rows();
        assert_eq!(rows[0], ("municipios".to_string(), "3".to_string()));
        assert!(rows.iter().any(|(m, v)| m == "media" && v == "200.00"));
    }

    #[test]
    fn by_uf_orders_by_total() {
        let records = vec![
            rec(1100015, "RO", 90_000),
            rec(3106200, "MG", 2_315_560),
            rec(3170206, "MG", 700_000),
            rec(1400100, "RR", 436_591),
        ];
        let got = by_uf(&records);
        let ufs: Vec<&str> = got.iter().map(|s| s.uf.as_str()).collect();
        assert_eq!(ufs, vec!["MG", "RR", "RO"]);
        assert_eq!(got[0].municipalities, 2);
        assert_eq!(got[0].total, 3_015_560);
        assert_eq!(got[0].mean, 1_507_780.0);
    }
}
