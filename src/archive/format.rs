use crate::archive::entry::Directory;
use crate::error::{AsarError, Result};
use std::io::{self, Read};

/// Value of the first preamble field
pub const FORMAT_MARKER: u32 = 4;

/// Fixed preamble size in bytes
pub const PREAMBLE_SIZE: usize = 16;

/// Largest file the 32-bit size fields can address
pub const MAX_FILE_SIZE: u64 = u32::MAX as u64;

/// Round `size` up to the next multiple of 4
pub fn align4(size: usize) -> usize {
    size + (4 - size % 4) % 4
}

pub fn read_u32(buf: &[u8]) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[..4]);
    u32::from_le_bytes(bytes)
}

pub fn write_u32(buf: &mut [u8], value: u32) {
    buf[..4].copy_from_slice(&value.to_le_bytes());
}

/// The 16-byte framing in front of the metadata blob
///
/// Layout (little-endian u32s):
/// - `[0..4]`   format marker, always 4
/// - `[4..8]`   header size, `8 + padded_size`
/// - `[8..12]`  pickle size, `4 + padded_size`
/// - `[12..16]` metadata length before padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preamble {
    pub header_size: u32,
    pub pickle_size: u32,
    pub json_size: u32,
}

impl Preamble {
    /// Build the framing for a metadata blob of `json_size` bytes
    pub fn for_json_size(json_size: usize) -> Result<Self> {
        let padded = align4(json_size);
        let too_large = || AsarError::Header(format!("Metadata too large: {} bytes", json_size));

        let header_size = u32::try_from(padded + 8).map_err(|_| too_large())?;
        let pickle_size = u32::try_from(padded + 4).map_err(|_| too_large())?;
        let json_size = u32::try_from(json_size).map_err(|_| too_large())?;

        Ok(Self {
            header_size,
            pickle_size,
            json_size,
        })
    }

    pub fn padded_size(&self) -> usize {
        align4(self.json_size as usize)
    }

    /// Absolute offset of the data region in the archive
    pub fn data_offset(&self) -> u64 {
        self.header_size as u64 + 8
    }

    pub fn to_bytes(&self) -> [u8; PREAMBLE_SIZE] {
        let mut buf = [0u8; PREAMBLE_SIZE];
        write_u32(&mut buf[0..4], FORMAT_MARKER);
        write_u32(&mut buf[4..8], self.header_size);
        write_u32(&mut buf[8..12], self.pickle_size);
        write_u32(&mut buf[12..16], self.json_size);
        buf
    }

    /// Parse and cross-check the framing fields
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < PREAMBLE_SIZE {
            return Err(AsarError::Header(format!(
                "Truncated preamble: {} of {} bytes",
                buf.len(),
                PREAMBLE_SIZE
            )));
        }

        let marker = read_u32(&buf[0..4]);
        if marker != FORMAT_MARKER {
            return Err(AsarError::Header(format!(
                "Unexpected format marker {} (expected {})",
                marker, FORMAT_MARKER
            )));
        }

        let preamble = Self {
            header_size: read_u32(&buf[4..8]),
            pickle_size: read_u32(&buf[8..12]),
            json_size: read_u32(&buf[12..16]),
        };

        let padded = preamble.padded_size() as u64;
        if preamble.data_offset() != PREAMBLE_SIZE as u64 + padded
            || preamble.pickle_size as u64 != padded + 4
        {
            return Err(AsarError::Header(format!(
                "Inconsistent framing: header size {}, pickle size {}, metadata size {}",
                preamble.header_size, preamble.pickle_size, preamble.json_size
            )));
        }

        Ok(preamble)
    }
}

/// Serialize the entry tree into preamble + zero-padded metadata
pub fn encode(root: &Directory) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(root)
        .map_err(|e| AsarError::Header(format!("Failed to serialize metadata: {}", e)))?;
    let preamble = Preamble::for_json_size(json.len())?;

    let mut out = Vec::with_capacity(PREAMBLE_SIZE + preamble.padded_size());
    out.extend_from_slice(&preamble.to_bytes());
    out.extend_from_slice(&json);
    out.resize(PREAMBLE_SIZE + preamble.padded_size(), 0);
    Ok(out)
}

/// Decode an in-memory header, returning the data-region offset and root
pub fn decode(bytes: &[u8]) -> Result<(u64, Directory)> {
    let preamble = Preamble::parse(bytes)?;

    let json_end = PREAMBLE_SIZE + preamble.json_size as usize;
    if bytes.len() < json_end {
        return Err(AsarError::Header(format!(
            "Metadata declares {} bytes but only {} are present",
            preamble.json_size,
            bytes.len() - PREAMBLE_SIZE
        )));
    }

    let root = parse_metadata(&bytes[PREAMBLE_SIZE..json_end])?;
    Ok((preamble.data_offset(), root))
}

/// Read the header from the start of a stream
pub fn read_from<R: Read>(mut reader: R) -> Result<(u64, Directory)> {
    let mut buf = [0u8; PREAMBLE_SIZE];
    reader.read_exact(&mut buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => {
            AsarError::Header("Archive is shorter than the 16-byte preamble".to_string())
        }
        _ => AsarError::Filesystem(e),
    })?;
    let preamble = Preamble::parse(&buf)?;

    // take() keeps a bogus json_size from driving a huge allocation
    let mut json = Vec::new();
    reader
        .take(preamble.json_size as u64)
        .read_to_end(&mut json)?;
    if json.len() != preamble.json_size as usize {
        return Err(AsarError::Header(format!(
            "Metadata declares {} bytes but only {} are present",
            preamble.json_size,
            json.len()
        )));
    }

    let root = parse_metadata(&json)?;
    Ok((preamble.data_offset(), root))
}

fn parse_metadata(json: &[u8]) -> Result<Directory> {
    serde_json::from_slice(json)
        .map_err(|e| AsarError::Header(format!("Failed to parse metadata: {}", e)))
}
