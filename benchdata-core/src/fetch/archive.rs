//! Decoders for the compressed formats served by dataset mirrors.

use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
    path::Path,
};

use bzip2::read::MultiBzDecoder;
use flate2::read::{DeflateDecoder, MultiGzDecoder};

use crate::error::{BenchdataError, Result};

const ZIP_LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;
const ZIP_LOCAL_HEADER_LEN: usize = 30;
const ZIP_METHOD_STORED: u16 = 0;
const ZIP_METHOD_DEFLATE: u16 = 8;
const ZIP_FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// Compression scheme, chosen by file extension.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Codec {
    Gzip,
    Bzip2,
    /// The first entry of a zip archive, located through its local file
    /// header alone. Stored entries must carry their size in that header, so
    /// entries written with a trailing data descriptor are rejected. Zip64
    /// sizes are not read.
    Zip,
}

impl Codec {
    pub(crate) fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("gz") => Ok(Self::Gzip),
            Some("bz2") => Ok(Self::Bzip2),
            Some("zip") => Ok(Self::Zip),
            _ => Err(BenchdataError::UnsupportedCompression {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Streams the decoded contents of `source` into `sink`.
    ///
    /// Zip archives yield their first entry only.
    pub(crate) fn decompress(self, source: &Path, sink: &mut dyn Write) -> Result<u64> {
        let file = File::open(source).map_err(|error| BenchdataError::io(source, error))?;
        let reader = BufReader::new(file);
        let copied = match self {
            Self::Gzip => io::copy(&mut MultiGzDecoder::new(reader), sink),
            Self::Bzip2 => io::copy(&mut MultiBzDecoder::new(reader), sink),
            Self::Zip => copy_first_zip_entry(reader, sink, source)?,
        };
        copied.map_err(|error| decompress_error(source, &error.to_string()))
    }
}

fn copy_first_zip_entry(
    mut reader: impl Read,
    sink: &mut dyn Write,
    source: &Path,
) -> Result<io::Result<u64>> {
    let mut header = [0_u8; ZIP_LOCAL_HEADER_LEN];
    reader
        .read_exact(&mut header)
        .map_err(|error| decompress_error(source, &format!("truncated zip header: {error}")))?;
    let signature = read_u32_le(header.get(0..4));
    if signature != Some(ZIP_LOCAL_HEADER_SIGNATURE) {
        return Err(decompress_error(source, "missing zip local file header"));
    }
    let flags = read_u16_le(header.get(6..8)).unwrap_or_default();
    let method = read_u16_le(header.get(8..10)).unwrap_or_default();
    let compressed_size = read_u32_le(header.get(18..22)).unwrap_or_default();
    let name_len = read_u16_le(header.get(26..28)).unwrap_or_default();
    let extra_len = read_u16_le(header.get(28..30)).unwrap_or_default();

    let skip = u64::from(name_len) + u64::from(extra_len);
    io::copy(&mut (&mut reader).take(skip), &mut io::sink())
        .map_err(|error| decompress_error(source, &error.to_string()))?;

    match method {
        ZIP_METHOD_DEFLATE => Ok(io::copy(&mut DeflateDecoder::new(reader), sink)),
        ZIP_METHOD_STORED if flags & ZIP_FLAG_DATA_DESCRIPTOR == 0 => {
            Ok(io::copy(&mut reader.take(u64::from(compressed_size)), sink))
        }
        ZIP_METHOD_STORED => Err(decompress_error(
            source,
            "stored zip entry without a size in its local header",
        )),
        other => Err(decompress_error(
            source,
            &format!("unsupported zip compression method {other}"),
        )),
    }
}

fn read_u16_le(bytes: Option<&[u8]>) -> Option<u16> {
    bytes.map(|slice| {
        slice
            .iter()
            .rev()
            .fold(0_u16, |acc, byte| (acc << 8) | u16::from(*byte))
    })
}

fn read_u32_le(bytes: Option<&[u8]>) -> Option<u32> {
    bytes.map(|slice| {
        slice
            .iter()
            .rev()
            .fold(0_u32, |acc, byte| (acc << 8) | u32::from(*byte))
    })
}

fn decompress_error(path: &Path, message: &str) -> BenchdataError {
    BenchdataError::Decompress {
        path: path.to_path_buf(),
        message: message.to_owned(),
    }
}
