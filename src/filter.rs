use chrono::NaiveDate;
use itertools::Itertools;

use crate::record::LinkRecord;

/// Inclusive numeric range. Either bound may be left open.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Range { min, max }
    }

    pub fn is_open(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// A missing value only passes an open range.
    pub fn contains(&self, value: Option<f64>) -> bool {
        if self.is_open() {
            return true;
        }
        match value {
            Some(v) => self.min.map_or(true, |m| v >= m) && self.max.map_or(true, |m| v <= m),
            None => false,
        }
    }
}

/// Which links to show. Empty lists and open ranges match everything.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkFilter {
    pub appl_ids: Vec<String>,
    pub station_names: Vec<String>,
    pub opposite_names: Vec<String>,
    pub freq: Range,
    pub distance: Range,
    pub from: Option<NaiveDate>,
    /// Inclusive: the whole of this day is in range.
    pub to: Option<NaiveDate>,
    pub expired_only: bool,
    pub today: NaiveDate,
}

impl LinkFilter {
    /// A filter that lets everything through, judging expiry against `today`.
    pub fn new(today: NaiveDate) -> Self {
        LinkFilter {
            appl_ids: Vec::new(),
            station_names: Vec::new(),
            opposite_names: Vec::new(),
            freq: Range::default(),
            distance: Range::default(),
            from: None,
            to: None,
            expired_only: false,
            today,
        }
    }

    pub fn matches(&self, record: &LinkRecord) -> bool {
        fn listed(wanted: &[String], value: Option<&str>) -> bool {
            wanted.is_empty() || value.map_or(false, |v| wanted.iter().any(|w| w == v))
        }

        listed(&self.appl_ids, record.appl_id.as_deref())
            && listed(&self.station_names, Some(record.station_name.as_str()))
            && listed(&self.opposite_names, Some(record.opposite_station.as_str()))
            && self.freq.contains(record.freq)
            && self.distance.contains(record.circuit_len())
            && self.date_matches(record)
            && (!self.expired_only || record.is_expired(self.today))
    }

    fn date_matches(&self, record: &LinkRecord) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        match record.expiry {
            Some(date) => {
                self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
            }
            None => false,
        }
    }

    pub fn apply<'a>(&self, records: &'a [LinkRecord]) -> Vec<&'a LinkRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Sorted, de-duplicated values of one text field, for building pick lists.
pub fn distinct_values<'a, I, F>(records: I, field: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a LinkRecord>,
    F: Fn(&'a LinkRecord) -> Option<&'a str>,
{
    records
        .into_iter()
        .filter_map(field)
        .map(str::to_string)
        .sorted()
        .dedup()
        .collect()
}
