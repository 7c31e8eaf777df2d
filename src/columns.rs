//! Column names of the link sheet. These are fixed by the license database
//! export and shared with anything that reads the edited workbook back.

pub const STN_NAME: &str = "STN_NAME";
pub const STASIUN_LAWAN: &str = "STASIUN_LAWAN";
pub const APPL_ID: &str = "APPL_ID";
pub const FREQ: &str = "FREQ";
pub const FREQ_PAIR: &str = "FREQ_PAIR";
pub const MASA_LAKU: &str = "MASA_LAKU";
pub const CIRCUIT_LEN: &str = "CIRCUIT_LEN";

pub const LAT_DEC: &str = "LAT_DEC";
pub const LONG_DEC: &str = "LONG_DEC";
pub const TO_LAT_DEC: &str = "TO_LAT_DEC";
pub const TO_LONG_DEC: &str = "TO_LONG_DEC";

/// Degree, minute, second and hemisphere columns of one angle.
#[derive(Clone, Copy, Debug)]
pub struct DmsColumns {
    pub deg: &'static str,
    pub min: &'static str,
    pub sec: &'static str,
    pub dir: &'static str,
}

pub const LAT: DmsColumns = DmsColumns {
    deg: "LAT_DEG",
    min: "LAT_MIN",
    sec: "LAT_SEC",
    dir: "LAT_DIR_IND",
};

pub const LONG: DmsColumns = DmsColumns {
    deg: "LONG_DEG",
    min: "LONG_MIN",
    sec: "LONG_SEC",
    dir: "LONG_DIR_IND",
};

pub const TO_LAT: DmsColumns = DmsColumns {
    deg: "TO_LAT_DEG",
    min: "TO_LAT_MIN",
    sec: "TO_LAT_SEC",
    dir: "TO_LAT_DIR_IND",
};

pub const TO_LONG: DmsColumns = DmsColumns {
    deg: "TO_LONG_DEG",
    min: "TO_LONG_MIN",
    sec: "TO_LONG_SEC",
    dir: "TO_LONG_DIR_IND",
};

impl DmsColumns {
    pub fn names(&self) -> [&'static str; 4] {
        [self.deg, self.min, self.sec, self.dir]
    }
}

/// Columns a sheet must carry for its rows to be turned into links.
pub fn required() -> Vec<&'static str> {
    let mut cols = vec![STN_NAME, STASIUN_LAWAN];
    for dms in [LAT, LONG, TO_LAT, TO_LONG].iter() {
        cols.extend_from_slice(&dms.names());
    }
    cols
}

/// Columns computed from the DMS fields, in output order.
pub const DERIVED: [&str; 5] = [LAT_DEC, LONG_DEC, TO_LAT_DEC, TO_LONG_DEC, CIRCUIT_LEN];
