//! Binary envelope: header plus bincode payload.

use std::io::{Read, Write};

use crate::error::WireError;
use crate::state::WireState;
use crate::Result;

/// Magic bytes identifying a constraint-state stream.
pub const STATE_MAGIC: [u8; 4] = *b"FEC1";

/// Current state format version.
pub const STATE_VERSION: u32 = 1;

/// Header size in bytes (magic + version + flags).
pub const STATE_HEADER_SIZE: usize = 12;

/// State stream header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHeader {
    /// Magic bytes (must be `FEC1`).
    pub magic: [u8; 4],
    /// Format version.
    pub version: u32,
    /// Flags (reserved for future use).
    pub flags: u32,
}

impl StateHeader {
    /// Create a new header with default values.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: STATE_MAGIC,
            version: STATE_VERSION,
            flags: 0,
        }
    }

    /// Write the header to a writer.
    fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_all(&self.version.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;
        Ok(())
    }

    /// Read the header from a reader.
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;

        let mut version_bytes = [0u8; 4];
        reader.read_exact(&mut version_bytes)?;
        let version = u32::from_le_bytes(version_bytes);

        let mut flags_bytes = [0u8; 4];
        reader.read_exact(&mut flags_bytes)?;
        let flags = u32::from_le_bytes(flags_bytes);

        Ok(Self {
            magic,
            version,
            flags,
        })
    }

    /// Validate the header.
    fn validate(&self) -> Result<()> {
        if self.magic != STATE_MAGIC {
            return Err(WireError::BadMagic(self.magic));
        }
        if self.version != STATE_VERSION {
            return Err(WireError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

impl Default for StateHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a [`WireState`] to a writer as header plus bincode payload.
///
/// # Errors
///
/// Returns an error if the header write or payload serialization
/// fails.
pub fn save_state_writer<W: Write>(state: &WireState, writer: &mut W) -> Result<()> {
    let header = StateHeader::new();
    header
        .write_to(writer)
        .map_err(|e| WireError::Serialize(e.to_string()))?;

    bincode::serialize_into(writer, state).map_err(|e| WireError::Serialize(e.to_string()))?;

    Ok(())
}

/// Encode a [`WireState`] to a byte vector.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn save_state_bytes(state: &WireState) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    save_state_writer(state, &mut buffer)?;
    Ok(buffer)
}

/// Read a [`WireState`] from a reader.
///
/// # Errors
///
/// Returns an error if:
/// - The header cannot be read
/// - The magic bytes are wrong
/// - The version is unsupported
/// - Payload deserialization fails
pub fn load_state_reader<R: Read>(reader: &mut R) -> Result<WireState> {
    let header = StateHeader::read_from(reader)?;
    header.validate()?;

    bincode::deserialize_from(reader).map_err(|e| WireError::Deserialize(e.to_string()))
}

/// Decode a [`WireState`] from a byte slice.
///
/// # Errors
///
/// See [`load_state_reader`].
pub fn load_state_bytes(mut bytes: &[u8]) -> Result<WireState> {
    load_state_reader(&mut bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn empty_state() -> WireState {
        WireState {
            sps: Vec::new(),
            mps: Vec::new(),
            mrmps: Vec::new(),
            load_case_tags: None,
            lock_case_tags: None,
        }
    }

    #[test]
    fn test_header_prefix() {
        let bytes = save_state_bytes(&empty_state()).unwrap();
        assert!(bytes.len() > STATE_HEADER_SIZE);
        assert_eq!(&bytes[..4], b"FEC1");
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut bytes = save_state_bytes(&empty_state()).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            load_state_bytes(&bytes),
            Err(WireError::BadMagic(_))
        ));
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut bytes = save_state_bytes(&empty_state()).unwrap();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        assert!(matches!(
            load_state_bytes(&bytes),
            Err(WireError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn test_truncated_stream_rejected() {
        let bytes = save_state_bytes(&empty_state()).unwrap();
        assert!(load_state_bytes(&bytes[..6]).is_err());
    }
}
