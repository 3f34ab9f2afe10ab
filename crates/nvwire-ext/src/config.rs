/// Default maximum document size: 16 MiB.
pub const DEFAULT_MAX_DOCUMENT: usize = 16 * 1024 * 1024;

/// Controls how an [`ExtModule`](crate::module::ExtModule) encodes and decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Encode structs as maps keyed by field name instead of positional arrays.
    pub struct_map: bool,
    /// When true, bytes left after the top-level value fail the decode.
    pub reject_trailing_bytes: bool,
    /// Maximum document size in bytes, applied to both directions.
    pub max_document_size: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            struct_map: true,
            reject_trailing_bytes: true,
            max_document_size: DEFAULT_MAX_DOCUMENT,
        }
    }
}
