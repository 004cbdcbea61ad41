//! Vector corpus loading
//!
//! A corpus file is a JSON array of [`RawVector`]s. The AES corpus is
//! embedded at compile time.

use std::io::Read;
use std::path::Path;

use crate::error::{ConformanceError, Result};
use crate::vector::RawVector;

const AES_CORPUS: &str = include_str!("../vectors/aes.json");

/// A named list of raw vectors
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    name: String,
    vectors: Vec<RawVector>,
}

impl Corpus {
    /// Corpus from vectors already in memory
    pub fn new(name: impl Into<String>, vectors: Vec<RawVector>) -> Self {
        Self {
            name: name.into(),
            vectors,
        }
    }

    /// Parse a JSON array of vectors
    pub fn from_json_str(name: impl Into<String>, text: &str) -> Result<Self> {
        let name = name.into();
        let vectors = serde_json::from_str(text)
            .map_err(|e| ConformanceError::corpus(format!("{name}: {e}")))?;
        Ok(Self { name, vectors })
    }

    /// Read a JSON array of vectors
    pub fn from_reader(name: impl Into<String>, reader: impl Read) -> Result<Self> {
        let name = name.into();
        let vectors = serde_json::from_reader(reader)
            .map_err(|e| ConformanceError::corpus(format!("{name}: {e}")))?;
        Ok(Self { name, vectors })
    }

    /// Load a corpus file, named after its file stem
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| ConformanceError::corpus(format!("{}: {e}", path.display())))?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_reader(name, std::io::BufReader::new(file))
    }

    /// The bundled AES corpus
    ///
    /// FIPS-197, the Rijndael ecb_tbl set, NIST SP 800-38A (CFB-1 included),
    /// RFC 3686, GnuPG OpenPGP-CFB, SP 800-38C, RFC 3610, the EAX paper,
    /// RFC 5297 and the GCM specification.
    pub fn aes() -> Result<Self> {
        Self::from_json_str("aes", AES_CORPUS)
    }

    /// Corpus name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Vectors in corpus order
    pub fn vectors(&self) -> &[RawVector] {
        &self.vectors
    }

    /// Number of vectors
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// True if there are no vectors
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_corpus_loads() {
        let corpus = Corpus::aes().unwrap();
        assert_eq!(corpus.name(), "aes");
        assert_eq!(corpus.len(), 479);
    }

    #[test]
    fn test_bad_arity_is_corpus_error() {
        let err = Corpus::from_json_str("t", r#"[["00", "00"]]"#).unwrap_err();
        assert!(matches!(err, ConformanceError::Corpus(ref msg) if msg.starts_with("t: ")));
    }

    #[test]
    fn test_from_reader() {
        let text = br#"[["00112233445566778899aabbccddeeff", "69c4e0d86a7b0430d8cdb78070b4c55a", "000102030405060708090a0b0c0d0e0f"]]"#;
        let corpus = Corpus::from_reader("one", &text[..]).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.vectors()[0].description, None);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Corpus::from_path("/nonexistent/vectors.json"),
            Err(ConformanceError::Corpus(_))
        ));
    }
}
