use custom_error::custom_error;

pub type Result<T> = std::result::Result<T, Error>;

custom_error! {#[derive(Clone, PartialEq)] pub CoordError
    InvalidCoordinateIndicator{indicator: String} = "invalid hemisphere indicator '{indicator}'",
    InvalidCoordinateComponent{component: &'static str, value: f64} = "{component} out of bounds: {value}",
    InvalidCoordinateRange{axis: &'static str, value: f64} = "{axis} out of range: {value}"
}

custom_error! {pub Error
    Io{source: std::io::Error} = "I/O error",
    Zip{source: zip::result::ZipError} = "zip archive error",
    XML{quick_xml: quick_xml::Error} = "XML error",
    Sql{source: rusqlite::Error} = "database error",
    Json{source: serde_json::Error} = "JSON error",
    Coord{source: CoordError} = "{source}",
    Build{message: String} = "could not assemble record: {message}",
    NotAWorkbook{member: String} = "not a workbook, {member} is missing",
    MissingSheet{name: String} = "worksheet '{name}' not found",
    MissingColumn{column: String} = "column '{column}' missing from header",
    MissingCell{row: usize, column: String} = "row {row}: {column} is empty",
    BadCell{row: usize, column: String, value: String} = "row {row}: unreadable {column} '{value}'",
    InvalidTableName{name: String} = "'{name}' is not a valid table name"
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Error {
        Error::XML { quick_xml: e }
    }
}
