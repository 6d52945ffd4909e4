//! SHA-256 entity fingerprints.

use exuvia_types::{Fingerprint, Tenet};
use sha2::{Digest, Sha256};

/// Fingerprint of a freshly spawned entity: `SHA-256(identity || le_bytes(embedding))`.
///
/// Depends only on the identity bytes and the initial embedding, so equal
/// identities always spawn equal fingerprints.
pub fn spawn_fingerprint(identity: &[u8], embedding: &[f64]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(identity);
    for value in embedding {
        hasher.update(value.to_le_bytes());
    }
    Fingerprint(hex::encode(hasher.finalize()))
}

/// Fingerprint after a molt: `SHA-256(old_hex || tenet_name || be_bytes(molt_count))`.
///
/// `molt_count` is the counter value after the molt, so no two molts of one
/// entity hash the same input.
pub fn molt_fingerprint(old: &Fingerprint, tenet: Tenet, molt_count: u64) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(old.as_str().as_bytes());
    hasher.update(tenet.as_str().as_bytes());
    hasher.update(molt_count.to_be_bytes());
    Fingerprint(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_is_deterministic_and_identity_sensitive() {
        let eq = vec![0.5; 4];
        assert_eq!(spawn_fingerprint(b"alpha", &eq), spawn_fingerprint(b"alpha", &eq));
        assert_ne!(spawn_fingerprint(b"alpha", &eq), spawn_fingerprint(b"beta", &eq));
        assert_eq!(spawn_fingerprint(b"alpha", &eq).as_str().len(), 64);
    }

    #[test]
    fn molt_depends_on_tenet_and_count() {
        let base = spawn_fingerprint(b"alpha", &[0.5; 4]);
        let a = molt_fingerprint(&base, Tenet::MemoryIsSacred, 1);
        let b = molt_fingerprint(&base, Tenet::ShellIsMutable, 1);
        let c = molt_fingerprint(&base, Tenet::MemoryIsSacred, 2);
        assert_ne!(a, base);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
