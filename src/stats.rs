use std::collections::HashSet;
use std::fmt;

use chrono::NaiveDate;
use itertools::Itertools;

use crate::record::LinkRecord;

/// Headline numbers for a set of links.
#[derive(Clone, Debug, PartialEq)]
pub struct Summary {
    pub total_links: usize,
    pub unique_stations: usize,
    /// Mean circuit length in km over links with derived geometry; 0 when there are none.
    pub avg_distance: f64,
    pub expired: usize,
}

impl Summary {
    pub fn of<'a, I>(records: I, today: NaiveDate) -> Summary
    where
        I: IntoIterator<Item = &'a LinkRecord>,
    {
        let mut total_links = 0;
        let mut stations = HashSet::new();
        let mut expired = 0;
        let mut lengths = Vec::new();
        for r in records {
            total_links += 1;
            stations.insert(r.station_name.as_str());
            if r.is_expired(today) {
                expired += 1;
            }
            lengths.extend(r.circuit_len());
        }
        let avg_distance = if lengths.is_empty() {
            0.0
        } else {
            lengths.iter().sum::<f64>() / lengths.len() as f64
        };
        Summary {
            total_links,
            unique_stations: stations.len(),
            avg_distance,
            expired,
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Total links:     {}", self.total_links)?;
        writeln!(f, "Unique stations: {}", self.unique_stations)?;
        writeln!(f, "Mean distance:   {:.1} km", self.avg_distance)?;
        write!(f, "Expired:         {}", self.expired)
    }
}

/// Descriptive statistics of a sample, percentiles by linear interpolation.
#[derive(Clone, Debug, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; needs at least two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub max: f64,
}

impl Describe {
    pub fn of<I: IntoIterator<Item = f64>>(values: I) -> Option<Describe> {
        let sorted = values
            .into_iter()
            .filter(|v| !v.is_nan())
            .sorted_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .collect::<Vec<_>>();
        let count = sorted.len();
        if count == 0 {
            return None;
        }

        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let ss = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
            Some((ss / (count - 1) as f64).sqrt())
        } else {
            None
        };
        let quantile = |q: f64| {
            let pos = q * (count - 1) as f64;
            let (lo, hi) = (pos.floor() as usize, pos.ceil() as usize);
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        };

        Some(Describe {
            count,
            mean,
            std,
            min: sorted[0],
            q25: quantile(0.25),
            q50: quantile(0.5),
            q75: quantile(0.75),
            max: sorted[count - 1],
        })
    }

    pub fn circuit_lengths<'a, I>(records: I) -> Option<Describe>
    where
        I: IntoIterator<Item = &'a LinkRecord>,
    {
        Describe::of(records.into_iter().filter_map(LinkRecord::circuit_len))
    }
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let std = self
            .std
            .map(|s| format!("{:.3}", s))
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "count {}  mean {:.3}  std {}  min {:.3}  25% {:.3}  50% {:.3}  75% {:.3}  max {:.3}",
            self.count, self.mean, std, self.min, self.q25, self.q50, self.q75, self.max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::LinkDataset;
    use crate::record::tests::{row, table};
    use approx::assert_abs_diff_eq;

    #[test]
    fn summary_counts() {
        let mut old = row("A-2", "Padang", "Pariaman", 30.0, "S");
        old[5] = "2020-01-01".into();
        let ds = LinkDataset::from_table(&table(vec![
            row("A-1", "Padang", "Solok", 1.0, "N"),
            old,
            row("A-3", "Painan", "Muaro", 2.0, "N"),
        ]))
        .unwrap();
        let s = Summary::of(ds.records(), NaiveDate::from_ymd_opt(2026, 10, 18).unwrap());
        assert_eq!(s.total_links, 3);
        assert_eq!(s.unique_stations, 2);
        assert_eq!(s.expired, 1);
        assert_abs_diff_eq!(s.avg_distance, (0.031 + 0.927 + 0.062) / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn empty_summary() {
        let s = Summary::of(&[], NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(s.total_links, 0);
        assert_eq!(s.avg_distance, 0.0);
    }

    #[test]
    fn describe_matches_linear_percentiles() {
        let d = Describe::of(vec![4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(d.count, 4);
        assert_eq!(d.mean, 2.5);
        assert_abs_diff_eq!(d.std.unwrap(), 1.290_994_448_7, epsilon = 1e-9);
        assert_eq!((d.min, d.max), (1.0, 4.0));
        assert_eq!((d.q25, d.q50, d.q75), (1.75, 2.5, 3.25));
    }

    #[test]
    fn describe_edge_cases() {
        assert!(Describe::of(Vec::new()).is_none());
        let one = Describe::of(vec![7.5, f64::NAN]).unwrap();
        assert_eq!(one.count, 1);
        assert_eq!(one.std, None);
        assert_eq!(one.q75, 7.5);
    }
}
