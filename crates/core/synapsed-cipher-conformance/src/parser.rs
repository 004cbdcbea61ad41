//! Vector decoding
//!
//! Turns a [`RawVector`] into a [`VectorRecord`]: hex fields are decoded,
//! AEAD fields are split on `|` and SIV headers on `-`, and the parameter map
//! becomes a [`ModeConfiguration`].

use crate::error::{ConformanceError, Field, Result};
use crate::mode::ModeConfiguration;
use crate::vector::{Payload, RawVector, VectorRecord};

/// Block size of AES, the cipher the bundled corpus targets
pub const AES_BLOCK_SIZE: usize = 16;

/// Separates associated data, payload and tag in AEAD fields
pub const FIELD_DELIMITER: char = '|';

/// Separates SIV header components
pub const COMPONENT_DELIMITER: char = '-';

/// Decode a hex field, reporting which field was bad
pub fn decode_hex(field: Field, text: &str) -> Result<Vec<u8>> {
    hex::decode(text).map_err(|e| ConformanceError::malformed(field, e))
}

/// Parses raw corpus records for a cipher of a given block size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorParser {
    block_size: usize,
}

impl Default for VectorParser {
    fn default() -> Self {
        Self::new(AES_BLOCK_SIZE)
    }
}

impl VectorParser {
    /// Create a parser for the given block size
    pub fn new(block_size: usize) -> Self {
        Self { block_size }
    }

    /// Block size in bytes
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Decode and validate one record
    pub fn parse(&self, index: usize, raw: &RawVector) -> Result<VectorRecord> {
        let description = raw
            .description
            .clone()
            .unwrap_or_else(|| format!("vector #{index}"));

        let mode = ModeConfiguration::from_raw(raw.params.as_ref(), self.block_size)?;

        let key = decode_hex(Field::Key, &raw.key)?;
        if key.is_empty() {
            return Err(ConformanceError::malformed(Field::Key, "empty key"));
        }

        let payload = if mode.is_aead() {
            Self::parse_aead(&mode, &raw.plaintext, &raw.ciphertext)?
        } else {
            Self::parse_plain(&raw.plaintext, &raw.ciphertext)?
        };

        Ok(VectorRecord {
            index,
            description,
            key,
            mode,
            payload,
        })
    }

    fn parse_plain(plaintext: &str, ciphertext: &str) -> Result<Payload> {
        for (field, text) in [(Field::Plaintext, plaintext), (Field::Ciphertext, ciphertext)] {
            if text.contains(FIELD_DELIMITER) {
                return Err(ConformanceError::malformed(
                    field,
                    "delimiter `|` in a non-AEAD vector",
                ));
            }
        }
        let plaintext = decode_hex(Field::Plaintext, plaintext)?;
        let ciphertext = decode_hex(Field::Ciphertext, ciphertext)?;
        if plaintext.len() != ciphertext.len() {
            return Err(ConformanceError::malformed(
                Field::Ciphertext,
                format!(
                    "length {} does not match plaintext length {}",
                    ciphertext.len(),
                    plaintext.len()
                ),
            ));
        }
        Ok(Payload::Cipher {
            plaintext,
            ciphertext,
        })
    }

    fn parse_aead(mode: &ModeConfiguration, plaintext: &str, ciphertext: &str) -> Result<Payload> {
        let pt_parts: Vec<&str> = plaintext.split(FIELD_DELIMITER).collect();
        let [pt_header, pt_body] = pt_parts.as_slice() else {
            return Err(ConformanceError::malformed(
                Field::Plaintext,
                format!("expected `<ad>|<plaintext>`, found {} part(s)", pt_parts.len()),
            ));
        };
        let ct_parts: Vec<&str> = ciphertext.split(FIELD_DELIMITER).collect();
        let [ct_header, ct_body, ct_tag] = ct_parts.as_slice() else {
            return Err(ConformanceError::malformed(
                Field::Ciphertext,
                format!(
                    "expected `<ad>|<ciphertext>|<tag>`, found {} part(s)",
                    ct_parts.len()
                ),
            ));
        };

        let associated_data = Self::split_header(mode, pt_header)?;
        if Self::split_header(mode, ct_header)? != associated_data {
            return Err(ConformanceError::malformed(
                Field::AssociatedData,
                "associated data differs between plaintext and ciphertext fields",
            ));
        }

        let plaintext = decode_hex(Field::Plaintext, pt_body)?;
        let ciphertext = decode_hex(Field::Ciphertext, ct_body)?;
        let tag = decode_hex(Field::Tag, ct_tag)?;
        if plaintext.len() != ciphertext.len() {
            return Err(ConformanceError::malformed(
                Field::Ciphertext,
                format!(
                    "length {} does not match plaintext length {}",
                    ciphertext.len(),
                    plaintext.len()
                ),
            ));
        }
        if tag.is_empty() {
            return Err(ConformanceError::malformed(Field::Tag, "empty tag"));
        }

        Ok(Payload::Aead {
            associated_data,
            plaintext,
            ciphertext,
            tag,
        })
    }

    /// SIV headers are an ordered list of components; every other AEAD mode
    /// takes the header as a single (possibly empty) component.
    fn split_header(mode: &ModeConfiguration, header: &str) -> Result<Vec<Vec<u8>>> {
        if matches!(mode, ModeConfiguration::Siv { .. }) {
            header
                .split(COMPONENT_DELIMITER)
                .map(|c| decode_hex(Field::AssociatedData, c))
                .collect()
        } else {
            Ok(vec![decode_hex(Field::AssociatedData, header)?])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ModeId;
    use crate::vector::RawParams;

    fn parser() -> VectorParser {
        VectorParser::default()
    }

    #[test]
    fn test_parse_ecb_default() {
        let raw = RawVector::new("00112233", "44556677", "000102030405060708090a0b0c0d0e0f");
        let record = parser().parse(3, &raw).unwrap();
        assert_eq!(record.description, "vector #3");
        assert_eq!(record.mode, ModeConfiguration::Ecb);
        assert_eq!(record.payload.plaintext(), &[0x00, 0x11, 0x22, 0x33]);
        assert!(record.payload.tag().is_none());
    }

    #[test]
    fn test_odd_hex_is_malformed() {
        let raw = RawVector::new("001", "445", "00");
        let err = parser().parse(0, &raw).unwrap_err();
        assert!(matches!(
            err,
            ConformanceError::MalformedVector {
                field: Field::Plaintext,
                ..
            }
        ));
    }

    #[test]
    fn test_non_hex_key_is_malformed() {
        let raw = RawVector::new("00", "11", "zz");
        let err = parser().parse(0, &raw).unwrap_err();
        assert!(matches!(
            err,
            ConformanceError::MalformedVector { field: Field::Key, .. }
        ));
    }

    #[test]
    fn test_length_mismatch() {
        let raw = RawVector::new("0011", "22", "00");
        assert!(parser().parse(0, &raw).is_err());
    }

    #[test]
    fn test_empty_associated_data_is_one_component() {
        let raw = RawVector::new("|", "||58e2fccefa7e3061367f1d57a4e7455a", "00000000000000000000000000000000")
            .with_params(RawParams::for_mode(ModeId::Gcm).nonce("000000000000000000000000"));
        let record = parser().parse(0, &raw).unwrap();
        let ad = record.payload.associated_data().unwrap();
        assert_eq!(ad.len(), 1);
        assert!(ad[0].is_empty());
        assert!(record.payload.plaintext().is_empty());
        assert_eq!(record.payload.tag().unwrap().len(), 16);
    }

    #[test]
    fn test_siv_header_components_keep_order() {
        let raw = RawVector::new("aa-bb01-|00", "aa-bb01-|11|22", "00".repeat(32))
            .with_params(RawParams::for_mode(ModeId::Siv));
        let record = parser().parse(0, &raw).unwrap();
        assert_eq!(
            record.payload.associated_data().unwrap(),
            &[vec![0xaa], vec![0xbb, 0x01], vec![]]
        );
    }

    #[test]
    fn test_dash_is_not_split_outside_siv() {
        let raw = RawVector::new("aa-bb|00", "aa-bb|11|22", "00".repeat(16))
            .with_params(RawParams::for_mode(ModeId::Eax).nonce("00"));
        assert!(parser().parse(0, &raw).is_err());
    }

    #[test]
    fn test_aead_part_counts() {
        let gcm = RawParams::for_mode(ModeId::Gcm).nonce("00");
        let missing_tag = RawVector::new("|00", "|11", "00".repeat(16)).with_params(gcm.clone());
        assert!(matches!(
            parser().parse(0, &missing_tag).unwrap_err(),
            ConformanceError::MalformedVector { field: Field::Ciphertext, .. }
        ));
        let empty_tag = RawVector::new("|00", "|11|", "00".repeat(16)).with_params(gcm.clone());
        assert!(matches!(
            parser().parse(0, &empty_tag).unwrap_err(),
            ConformanceError::MalformedVector { field: Field::Tag, .. }
        ));
        let header_mismatch = RawVector::new("01|00", "02|11|22", "00".repeat(16)).with_params(gcm);
        assert!(matches!(
            parser().parse(0, &header_mismatch).unwrap_err(),
            ConformanceError::MalformedVector { field: Field::AssociatedData, .. }
        ));
    }

    #[test]
    fn test_delimiter_in_plain_vector() {
        let raw = RawVector::new("|00", "|11|22", "00".repeat(16));
        assert!(parser().parse(0, &raw).is_err());
    }
}
