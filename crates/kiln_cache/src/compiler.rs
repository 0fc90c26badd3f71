//! The compiler collaborator boundary.

use kiln_common::SourceDigest;

use crate::error::DecodeError;

/// A compiler rejected a source unit.
///
/// The cache surfaces the reason verbatim and never stores anything for a
/// failed compilation.
#[derive(Debug, thiserror::Error)]
#[error("{reason}")]
pub struct CompileError {
    /// The compiler's own description of the failure.
    pub reason: String,
}

impl CompileError {
    /// Creates a compile error with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The deterministic compiler the cache wraps.
///
/// `compile` must be a pure function of the source bytes (and the compiler's
/// own fixed configuration): identical input bytes produce identical output
/// bytes. `deserialize` is its inverse, producing the usable artifact, and
/// must reject bytes not produced by a compatible `compile` with a
/// [`DecodeError`] rather than misbehaving.
///
/// The source digest is handed to `compile` so implementations can embed it
/// in their output as audit metadata; `source_digest` extracts it back out
/// for verification tooling. Embedding is optional — the default extraction
/// reports unsupported.
pub trait SourceCompiler {
    /// The in-memory, directly usable result of compilation.
    type Artifact;

    /// Compiles source bytes into the serialized artifact form.
    fn compile(&self, source: &[u8], digest: &SourceDigest) -> Result<Vec<u8>, CompileError>;

    /// Reconstructs an artifact from serialized bytes.
    fn deserialize(&self, bytes: &[u8]) -> Result<Self::Artifact, DecodeError>;

    /// Extracts the audit digest embedded in serialized bytes, if this
    /// compiler embeds one and the bytes decode.
    fn source_digest(&self, _bytes: &[u8]) -> Option<SourceDigest> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_error_display_is_verbatim() {
        let err = CompileError::new("unexpected token `}` at 4:12");
        assert_eq!(err.to_string(), "unexpected token `}` at 4:12");
    }

    #[test]
    fn default_digest_extraction_is_unsupported() {
        struct Opaque;
        impl SourceCompiler for Opaque {
            type Artifact = ();
            fn compile(&self, _: &[u8], _: &SourceDigest) -> Result<Vec<u8>, CompileError> {
                Ok(Vec::new())
            }
            fn deserialize(&self, _: &[u8]) -> Result<(), DecodeError> {
                Ok(())
            }
        }
        assert!(Opaque.source_digest(b"anything").is_none());
    }
}
