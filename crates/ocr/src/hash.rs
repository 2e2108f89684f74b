use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Content digest of a receipt image. Two URLs serving the same bytes
/// share a digest, which is how a batch spots duplicate uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReceiptDigest([u8; 32]);

impl ReceiptDigest {
    pub fn of(image_bytes: &[u8]) -> Self {
        Self(Sha256::digest(image_bytes).into())
    }
}

impl fmt::Display for ReceiptDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.iter().try_for_each(|b| write!(f, "{b:02x}"))
    }
}
