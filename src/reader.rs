use crate::error::{GameError, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use zstd::stream::read::Decoder as ZstdDecoder;

type PgnInput = Box<dyn Read>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    Plain,
    Zstd,
}

impl CompressionMode {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = raw.trim();
        if normalized.is_empty() || normalized.eq_ignore_ascii_case("none") {
            Ok(Self::Plain)
        } else if normalized.eq_ignore_ascii_case("zstd") {
            Ok(Self::Zstd)
        } else {
            Err(GameError::Codec(format!(
                "Invalid compression value '{normalized}'. Supported values: 'zstd' or 'none'."
            )))
        }
    }

    /// `.zst` files are read through zstd, anything else as plain text.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("zst") => Self::Zstd,
            _ => Self::Plain,
        }
    }
}

fn open_input_stream(path: &Path, compression: CompressionMode) -> Result<PgnInput> {
    let file = File::open(path)?;

    match compression {
        CompressionMode::Plain => Ok(Box::new(BufReader::new(file))),
        CompressionMode::Zstd => Ok(Box::new(ZstdDecoder::new(file)?)),
    }
}

/// Reads a `.pgn` (or `.pgn.zst`) file into memory.
pub fn open_pgn_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    open_pgn_file_with(path, CompressionMode::from_path(path))
}

pub fn open_pgn_file_with(path: impl AsRef<Path>, compression: CompressionMode) -> Result<String> {
    let path = path.as_ref();
    let mut input = open_input_stream(path, compression)?;

    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    log::debug!("read {} bytes from '{}'", bytes.len(), path.display());

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// A single path, or every match of a glob pattern (`*` / `?`) in sorted
/// order.
pub fn expand_paths(pattern: &str) -> Result<Vec<PathBuf>> {
    if pattern.contains('*') || pattern.contains('?') {
        let mut paths: Vec<PathBuf> = glob::glob(pattern)?
            .filter_map(|entry| entry.ok())
            .collect();
        paths.sort();
        Ok(paths)
    } else {
        Ok(vec![PathBuf::from(pattern)])
    }
}

/// Reads every file matched by `pattern`, paired with its path.
pub fn open_pgn_files(pattern: &str) -> Result<Vec<(PathBuf, String)>> {
    expand_paths(pattern)?
        .into_iter()
        .map(|path| {
            let text = open_pgn_file(&path)?;
            Ok((path, text))
        })
        .collect()
}
