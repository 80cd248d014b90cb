//! Plain UTF-8 text reader and writer.

use crate::error::{AppResult, ContractError};
use crate::stream::{Params, Payload, Reader, Writer};
use std::fs;
use std::path::{Path, PathBuf};

/// Parameters for [`text_reader`] and [`text_writer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextParams {
    /// File to read or write.
    pub path: PathBuf,
}

impl TextParams {
    /// Text file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Params for TextParams {
    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

/// Reader named `text` producing [`Payload::Text`].
pub fn text_reader() -> Reader<Payload> {
    Reader::new("text", |params: &TextParams| {
        Ok(Payload::Text(fs::read_to_string(&params.path)?))
    })
}

/// Writer named `text` accepting [`Payload::Text`].
pub fn text_writer() -> Writer<Payload> {
    Writer::new("text", |data: &Payload, params: &TextParams| {
        let text = data.as_text().ok_or_else(|| {
            ContractError::Source(format!("Text writer expects text, got {}", data.type_name()))
        })?;
        write_text(text, params)
    })
}

/// Writes `text` as UTF-8, replacing any existing file.
pub fn write_text(text: &str, params: &TextParams) -> AppResult<()> {
    fs::write(&params.path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_utf8_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        let err = text_reader().read(&TextParams::new(&path)).unwrap_err();
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::InvalidData));
    }
}
