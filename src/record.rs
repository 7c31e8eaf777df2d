use chrono::{NaiveDate, NaiveDateTime};
use derive_builder::Builder;
use log::warn;

use crate::columns::{self, DmsColumns};
use crate::error::{CoordError, Error, Result};
use crate::geo::{great_circle_distance, Dms, Hemisphere, LatLon};
use crate::table::{Cell, Row};
use crate::xlsx::date_from_serial;

/// One end of a link, as surveyed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Endpoint {
    pub lat: Dms,
    pub lon: Dms,
}

impl Endpoint {
    pub fn new(lat: Dms, lon: Dms) -> Self {
        Endpoint { lat, lon }
    }

    pub fn to_latlon(&self) -> std::result::Result<LatLon, CoordError> {
        LatLon::new(self.lat.latitude()?, self.lon.longitude()?)
    }
}

/// Decimal positions of both stations and the distance between them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkGeometry {
    pub origin: LatLon,
    pub destination: LatLon,
    /// Kilometres, rounded to three decimals.
    pub circuit_len: f64,
}

pub fn derive_geometry(
    origin: &Endpoint,
    destination: &Endpoint,
) -> std::result::Result<LinkGeometry, CoordError> {
    let origin = origin.to_latlon()?;
    let destination = destination.to_latlon()?;
    Ok(LinkGeometry {
        origin,
        destination,
        circuit_len: great_circle_distance(origin, destination),
    })
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExpiryStatus {
    Expired,
    Valid,
    Unknown,
}

#[derive(Clone, Debug, Builder, PartialEq)]
#[builder(setter(into))]
pub struct LinkRecord {
    pub station_name: String,
    pub opposite_station: String,
    #[builder(default)]
    pub appl_id: Option<String>,
    #[builder(default)]
    pub freq: Option<f64>,
    #[builder(default)]
    pub freq_pair: Option<f64>,
    #[builder(default)]
    pub expiry: Option<NaiveDate>,
    pub origin: Endpoint,
    pub destination: Endpoint,
    /// Columns that are not part of the link contract, kept for export.
    #[builder(default)]
    pub extra: Vec<(String, Cell)>,
    /// Cells as read for the parsed optional columns.
    #[builder(default)]
    source: Vec<(String, Cell)>,
    /// One-based row in the sheet this record was read from.
    #[builder(default)]
    sheet_row: Option<usize>,
    #[builder(setter(skip))]
    geometry: Option<LinkGeometry>,
}

const PARSED_COLUMNS: [&str; 4] = [
    columns::APPL_ID,
    columns::FREQ,
    columns::FREQ_PAIR,
    columns::MASA_LAKU,
];

impl LinkRecord {
    /// Reads a record from a sheet row and derives its geometry.
    pub fn from_row(row: &Row) -> Result<LinkRecord> {
        let mut record = LinkRecordBuilder::default();
        record
            .station_name(required_text(row, columns::STN_NAME)?)
            .opposite_station(required_text(row, columns::STASIUN_LAWAN)?)
            .appl_id(row.get(columns::APPL_ID).text())
            .freq(optional_number(row, columns::FREQ))
            .freq_pair(optional_number(row, columns::FREQ_PAIR))
            .expiry(optional_date(row, columns::MASA_LAKU))
            .origin(Endpoint::new(
                read_dms(row, columns::LAT)?,
                read_dms(row, columns::LONG)?,
            ))
            .destination(Endpoint::new(
                read_dms(row, columns::TO_LAT)?,
                read_dms(row, columns::TO_LONG)?,
            ))
            .extra(
                row.named_cells()
                    .filter(|(name, _)| !is_contract_column(name))
                    .map(|(name, cell)| (name.to_string(), cell.clone()))
                    .collect::<Vec<_>>(),
            )
            .source(
                PARSED_COLUMNS
                    .iter()
                    .map(|&c| (c.to_string(), row.get(c).clone()))
                    .collect::<Vec<_>>(),
            )
            .sheet_row(row.sheet_row());

        let mut record = record.build().map_err(|e| Error::Build {
            message: e.to_string(),
        })?;
        record.derive_geometry()?;
        Ok(record)
    }

    /// Recomputes decimal positions and circuit length from the DMS fields.
    ///
    /// On failure the previous geometry is discarded, so a record never carries
    /// numbers that disagree with its DMS fields.
    pub fn derive_geometry(&mut self) -> std::result::Result<&LinkGeometry, CoordError> {
        self.geometry = None;
        let geometry = derive_geometry(&self.origin, &self.destination)?;
        Ok(self.geometry.get_or_insert(geometry))
    }

    pub fn sheet_row(&self) -> Option<usize> {
        self.sheet_row
    }

    pub fn geometry(&self) -> Option<&LinkGeometry> {
        self.geometry.as_ref()
    }

    pub fn circuit_len(&self) -> Option<f64> {
        self.geometry.map(|g| g.circuit_len)
    }

    pub fn expiry_status(&self, today: NaiveDate) -> ExpiryStatus {
        match self.expiry {
            Some(date) if date < today => ExpiryStatus::Expired,
            Some(_) => ExpiryStatus::Valid,
            None => ExpiryStatus::Unknown,
        }
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_status(today) == ExpiryStatus::Expired
    }

    /// Value of the named column, for export and option lists.
    pub fn cell(&self, column: &str) -> Cell {
        let dms = |d: &Dms, c: &DmsColumns| -> Option<Cell> {
            Some(match column {
                x if x == c.deg => Cell::Number(d.degrees),
                x if x == c.min => Cell::Number(d.minutes),
                x if x == c.sec => Cell::Number(d.seconds),
                x if x == c.dir => Cell::Text(d.hemisphere.to_string()),
                _ => return None,
            })
        };
        let dms_cell = dms(&self.origin.lat, &columns::LAT)
            .or_else(|| dms(&self.origin.lon, &columns::LONG))
            .or_else(|| dms(&self.destination.lat, &columns::TO_LAT))
            .or_else(|| dms(&self.destination.lon, &columns::TO_LONG));
        if let Some(cell) = dms_cell {
            return cell;
        }

        let g = self.geometry.as_ref();
        match column {
            columns::STN_NAME => self.station_name.as_str().into(),
            columns::STASIUN_LAWAN => self.opposite_station.as_str().into(),
            columns::APPL_ID => {
                self.source_or(column, self.appl_id.clone(), Cell::text, Cell::from)
            }
            columns::FREQ => self.source_or(column, self.freq, Cell::as_f64, Cell::from),
            columns::FREQ_PAIR => {
                self.source_or(column, self.freq_pair, Cell::as_f64, Cell::from)
            }
            columns::MASA_LAKU => self.source_or(column, self.expiry, parse_date, |d| {
                d.map(|d| d.format("%Y-%m-%d").to_string()).into()
            }),
            columns::LAT_DEC => g.map(|g| g.origin.lat()).into(),
            columns::LONG_DEC => g.map(|g| g.origin.lon()).into(),
            columns::TO_LAT_DEC => g.map(|g| g.destination.lat()).into(),
            columns::TO_LONG_DEC => g.map(|g| g.destination.lon()).into(),
            columns::CIRCUIT_LEN => g.map(|g| g.circuit_len).into(),
            other => self
                .extra
                .iter()
                .find(|(name, _)| name.trim() == other)
                .map(|(_, cell)| cell.clone())
                .unwrap_or(Cell::Empty),
        }
    }

    /// The cell as read while it still means `value`, so unreadable text and
    /// the sheet's own cell types survive export. Edited values are rendered
    /// by `fresh`.
    fn source_or<T, R, F>(&self, column: &str, value: T, read: R, fresh: F) -> Cell
    where
        T: PartialEq,
        R: Fn(&Cell) -> T,
        F: FnOnce(T) -> Cell,
    {
        match self.source.iter().find(|(name, _)| name == column) {
            Some((_, cell)) if read(cell) == value => cell.clone(),
            _ => fresh(value),
        }
    }
}

fn is_contract_column(name: &str) -> bool {
    let name = name.trim();
    columns::required().contains(&name)
        || columns::DERIVED.contains(&name)
        || PARSED_COLUMNS.contains(&name)
}

fn required_text(row: &Row, column: &str) -> Result<String> {
    row.get(column).text().ok_or_else(|| Error::MissingCell {
        row: row.sheet_row(),
        column: column.to_string(),
    })
}

fn required_number(row: &Row, column: &str) -> Result<f64> {
    let cell = row.get(column);
    if cell.is_empty() {
        return Err(Error::MissingCell {
            row: row.sheet_row(),
            column: column.to_string(),
        });
    }
    cell.as_f64().ok_or_else(|| Error::BadCell {
        row: row.sheet_row(),
        column: column.to_string(),
        value: cell.to_string(),
    })
}

fn read_dms(row: &Row, c: DmsColumns) -> Result<Dms> {
    let hemisphere: Hemisphere = required_text(row, c.dir)?.parse()?;
    Ok(Dms::new(
        required_number(row, c.deg)?,
        required_number(row, c.min)?,
        required_number(row, c.sec)?,
        hemisphere,
    ))
}

fn optional_number(row: &Row, column: &str) -> Option<f64> {
    let cell = row.get(column);
    if cell.is_empty() {
        return None;
    }
    let value = cell.as_f64();
    if value.is_none() {
        warn!(
            "Row {}: {} '{}' is not a number, treating as missing",
            row.sheet_row(),
            column,
            cell
        );
    }
    value
}

fn optional_date(row: &Row, column: &str) -> Option<NaiveDate> {
    let cell = row.get(column);
    if cell.is_empty() {
        return None;
    }
    let value = parse_date(cell);
    if value.is_none() {
        warn!(
            "Row {}: {} '{}' is not a date, treating as missing",
            row.sheet_row(),
            column,
            cell
        );
    }
    value
}

/// Reads a date from a sheet serial number or common day-first text layouts.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y"];
    const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    match cell {
        Cell::Number(serial) => date_from_serial(*serial),
        Cell::Text(text) => {
            let text = text.trim();
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .or_else(|| {
                    DATETIME_FORMATS
                        .iter()
                        .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
                        .map(|dt| dt.date())
                })
        }
        _ => None,
    }
}
