//! Wallet address derivation from public keys.
//!
//! Address format: `Q` + body (40 hex) + checksum (6 hex), 47 characters.
//!
//! Body: first 40 chars of SHA3-256(public_key hex).
//! Checksum: first 6 chars of SHA3-256(body).

use qnode_types::{Address, PublicKey};

use crate::{sha3_256_hex, CryptoError};

fn checksum(body: &str) -> String {
    sha3_256_hex(body)[..Address::CHECKSUM_LEN].to_string()
}

/// Derive a `Q`-prefixed wallet address from a public key.
pub fn derive_address(public_key: &PublicKey) -> Address {
    let digest = sha3_256_hex(public_key.as_str());
    let body = &digest[..Address::BODY_LEN];
    Address::new(format!("{}{}{}", Address::PREFIX, body, checksum(body)))
}

/// Parse and checksum-verify a wallet address.
pub fn parse_address(raw: &str) -> Result<Address, CryptoError> {
    if !raw.starts_with(Address::PREFIX) {
        return Err(CryptoError::BadPrefix);
    }
    if raw.len() != Address::LEN {
        return Err(CryptoError::BadLength {
            expected: Address::LEN,
            actual: raw.len(),
        });
    }
    let rest = &raw[Address::PREFIX.len()..];
    if !rest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(CryptoError::NotHex);
    }
    let (body, sum) = rest.split_at(Address::BODY_LEN);
    if checksum(body) != sum {
        return Err(CryptoError::ChecksumMismatch);
    }
    Ok(Address::new(raw))
}

/// Whether `raw` is a well-formed address with a correct checksum.
pub fn validate_address(raw: &str) -> bool {
    parse_address(raw).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn derive_and_validate() {
        let kp = generate_keypair();
        let addr = derive_address(&kp.public_key);
        assert!(addr.as_str().starts_with('Q'));
        assert_eq!(addr.as_str().len(), 47);
        assert!(validate_address(addr.as_str()));
    }

    #[test]
    fn derive_is_deterministic() {
        let kp = keypair_from_seed(&[9u8; 32]);
        assert_eq!(derive_address(&kp.public_key), derive_address(&kp.public_key));
    }

    #[test]
    fn invalid_checksum_rejected() {
        let kp = generate_keypair();
        let mut bad = derive_address(&kp.public_key).as_str().to_string();
        let last = bad.pop().unwrap();
        bad.push(if last == '0' { '1' } else { '0' });
        assert_eq!(parse_address(&bad), Err(CryptoError::ChecksumMismatch));
    }

    #[test]
    fn wrong_prefix_and_length_rejected() {
        assert_eq!(parse_address("Xabc"), Err(CryptoError::BadPrefix));
        assert!(matches!(
            parse_address("Qabc"),
            Err(CryptoError::BadLength { expected: 47, actual: 4 })
        ));
        assert_eq!(
            parse_address(&format!("Q{}", "z".repeat(46))),
            Err(CryptoError::NotHex)
        );
    }

    #[test]
    fn system_is_not_a_wallet_address() {
        assert!(!validate_address("SYSTEM"));
    }
}
