//! The artifact container format and the reference compiler.
//!
//! Compiled bytes are framed with a binary header carrying magic bytes, a
//! format version, the source digest captured at compile time, and a payload
//! checksum. Decoding validates all four and fails closed, so a corrupted or
//! incompatible entry becomes a cache miss instead of a crash.

use kiln_common::SourceDigest;
use serde::{Deserialize, Serialize};

use crate::compiler::{CompileError, SourceCompiler};
use crate::error::DecodeError;

/// Magic bytes identifying a kiln artifact.
const IMAGE_MAGIC: [u8; 4] = *b"KILN";

/// Current container format version. Increment on breaking changes to the
/// header or payload layout.
const IMAGE_FORMAT_VERSION: u32 = 1;

/// Header prepended to every serialized artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ImageHeader {
    /// Magic bytes: must be `b"KILN"`.
    magic: [u8; 4],

    /// Container format version.
    format_version: u32,

    /// Digest of the source the payload was compiled from (audit metadata).
    source_digest: SourceDigest,

    /// Digest of the payload itself (integrity check).
    checksum: SourceDigest,
}

/// A decoded artifact: the payload plus the audit digest of the source it
/// was compiled from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactImage {
    /// Digest of the originating source, captured at compile time.
    pub source_digest: SourceDigest,

    /// The compiled payload bytes.
    pub payload: Vec<u8>,
}

impl ArtifactImage {
    /// Serializes the image: 4-byte header length (little-endian), bincode
    /// header, payload.
    pub fn encode(&self) -> Result<Vec<u8>, CompileError> {
        let header = ImageHeader {
            magic: IMAGE_MAGIC,
            format_version: IMAGE_FORMAT_VERSION,
            source_digest: self.source_digest,
            checksum: SourceDigest::from_bytes(&self.payload),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CompileError::new(format!("artifact header serialization: {e}")))?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + self.payload.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(&self.payload);
        Ok(output)
    }

    /// Decodes and validates serialized bytes.
    ///
    /// Every validation failure maps to its own [`DecodeError`] variant so
    /// callers can report why an entry was rejected.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 4 {
            return Err(DecodeError::Truncated);
        }
        let header_len =
            u32::from_le_bytes(bytes[..4].try_into().map_err(|_| DecodeError::Truncated)?) as usize;
        if bytes.len() < 4 + header_len {
            return Err(DecodeError::Truncated);
        }

        let header: ImageHeader =
            bincode::serde::decode_from_slice(&bytes[4..4 + header_len], bincode::config::standard())
                .map_err(|e| DecodeError::Malformed {
                    reason: e.to_string(),
                })?
                .0;

        if header.magic != IMAGE_MAGIC {
            return Err(DecodeError::BadMagic);
        }
        if header.format_version != IMAGE_FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion {
                expected: IMAGE_FORMAT_VERSION,
                actual: header.format_version,
            });
        }

        let payload = &bytes[4 + header_len..];
        let actual = SourceDigest::from_bytes(payload);
        if actual != header.checksum {
            return Err(DecodeError::ChecksumMismatch {
                expected: header.checksum.to_string(),
                actual: actual.to_string(),
            });
        }

        Ok(Self {
            source_digest: header.source_digest,
            payload: payload.to_vec(),
        })
    }
}

/// The reference [`SourceCompiler`]: wraps source bytes unchanged in the
/// artifact container.
///
/// Used by the CLI's cache-management commands and the test suite, where the
/// point is exercising the cache rather than lowering a language. Real
/// compilers implement [`SourceCompiler`] over their own payload and reuse
/// [`ArtifactImage`] framing if it suits them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotCompiler;

impl SourceCompiler for SnapshotCompiler {
    type Artifact = ArtifactImage;

    fn compile(&self, source: &[u8], digest: &SourceDigest) -> Result<Vec<u8>, CompileError> {
        ArtifactImage {
            source_digest: *digest,
            payload: source.to_vec(),
        }
        .encode()
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<ArtifactImage, DecodeError> {
        ArtifactImage::decode(bytes)
    }

    fn source_digest(&self, bytes: &[u8]) -> Option<SourceDigest> {
        ArtifactImage::decode(bytes).ok().map(|i| i.source_digest)
    }
}
