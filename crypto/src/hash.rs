//! SHA3 digests rendered as lowercase hex.

use sha3::{Digest, Sha3_256, Sha3_512};

/// SHA3-256 of `data` as 64 lowercase hex characters.
pub fn sha3_256_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha3_256::digest(data.as_ref()))
}

/// SHA3-512 of `data` as 128 lowercase hex characters.
pub fn sha3_512_hex(data: impl AsRef<[u8]>) -> String {
    hex::encode(Sha3_512::digest(data.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        assert_eq!(
            sha3_256_hex(""),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
        assert_eq!(
            sha3_256_hex("abc"),
            "3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532"
        );
    }

    #[test]
    fn lengths() {
        assert_eq!(sha3_256_hex("x").len(), 64);
        assert_eq!(sha3_512_hex("x").len(), 128);
    }
}
