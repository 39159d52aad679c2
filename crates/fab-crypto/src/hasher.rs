use fab_types::ContentKey;

/// BLAKE3 in key-derivation mode, keyed by a context string.
///
/// Content keys are derived under their own context, so a key can never
/// equal a BLAKE3 digest taken over the same bytes for another purpose.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContentHasher {
    context: &'static str,
}

impl ContentHasher {
    /// Keys for stored blobs: document bodies and anonymous posts alike.
    pub const BLOB: Self = Self::new("fab-blob-v1");

    pub const fn new(context: &'static str) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &'static str {
        self.context
    }

    /// The key of `data` under this context.
    pub fn hash(&self, data: &[u8]) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key(self.context);
        hasher.update(data);
        ContentKey::from_hash(*hasher.finalize().as_bytes())
    }
}
