use std::io::prelude::*;
use std::io::Cursor;
use zip::read::ZipArchive;
use zip::result::ZipError;

use crate::error::Result;

pub type PseudoFile = Cursor<Vec<u8>>;

/// Reads one archive member fully into memory. A missing member is `None`.
pub fn entry_to_pseudofile<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<PseudoFile>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut tmp = Cursor::new(Vec::with_capacity(entry.size() as usize));
    entry.read_to_end(tmp.get_mut())?;
    Ok(Some(tmp))
}
