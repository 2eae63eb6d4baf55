//! Principal references.
//!
//! A principal is an opaque byte string naming a remote service. Its text
//! form is `ic:` followed by the uppercase hex of the bytes and a trailing
//! CRC-8 checksum byte, e.g. `ic:000000000000000107`.

use core::fmt;
use core::str::FromStr;

const TEXT_PREFIX: &str = "ic:";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalError {
    #[error("principal `{text}` must start with `ic:`")]
    MissingPrefix { text: String },

    #[error("principal `{text}` is not valid hex")]
    InvalidHex { text: String },

    #[error("principal `{text}` is missing its checksum")]
    TooShort { text: String },

    #[error("principal `{text}` has checksum {found:02X}, expected {expected:02X}")]
    ChecksumMismatch { text: String, expected: u8, found: u8 },
}

/// An opaque identity of a remote service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Principal(Vec<u8>);

impl Principal {
    pub fn from_slice(bytes: &[u8]) -> Self {
        Principal(bytes.to_vec())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    /// Parse the `ic:` text form, validating the checksum.
    pub fn from_text(text: &str) -> Result<Self, PrincipalError> {
        let Some(digits) = text.strip_prefix(TEXT_PREFIX) else {
            return Err(PrincipalError::MissingPrefix { text: text.into() });
        };
        let mut bytes = hex::decode(digits).map_err(|_| PrincipalError::InvalidHex {
            text: text.into(),
        })?;
        let Some(found) = bytes.pop() else {
            return Err(PrincipalError::TooShort { text: text.into() });
        };
        let expected = crc8(&bytes);
        if expected != found {
            return Err(PrincipalError::ChecksumMismatch {
                text: text.into(),
                expected,
                found,
            });
        }
        Ok(Principal(bytes))
    }

    pub fn to_text(&self) -> String {
        format!(
            "{}{}{:02X}",
            TEXT_PREFIX,
            hex::encode_upper(&self.0),
            crc8(&self.0)
        )
    }
}

impl From<Vec<u8>> for Principal {
    fn from(bytes: Vec<u8>) -> Self {
        Principal(bytes)
    }
}

impl FromStr for Principal {
    type Err = PrincipalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Principal::from_text(s)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

/// CRC-8 with polynomial 0x07, zero initial value, MSB first.
fn crc8(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |crc, &byte| {
        (0..8).fold(crc ^ byte, |c, _| {
            if c & 0x80 != 0 { (c << 1) ^ 0x07 } else { c << 1 }
        })
    })
}
