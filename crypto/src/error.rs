use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("address must start with 'Q'")]
    BadPrefix,

    #[error("address must be {expected} characters, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("address body is not hex")]
    NotHex,

    #[error("address checksum mismatch")]
    ChecksumMismatch,

    #[error("private key must be {expected} hex characters")]
    MalformedPrivateKey { expected: usize },
}
