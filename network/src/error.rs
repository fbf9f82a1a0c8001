use qnode_types::Address;
use thiserror::Error;

/// Transport-level failure talking to a peer.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with status {status}")]
    Status { url: String, status: u16 },
}

impl NetworkError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http { source, .. } if source.is_timeout())
    }
}

/// Why a peer could not be added to the registry.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum PeerError {
    #[error("peer url is empty")]
    EmptyUrl,

    #[error("peer {0} is flagged malicious")]
    Malicious(String),

    #[error("peer {0} is already registered")]
    AlreadyRegistered(String),

    #[error("peer {peer} reports treasury {reported:?}, official treasury is {official}")]
    UntrustedTreasury {
        peer: String,
        reported: Option<Address>,
        official: Address,
    },

    #[error("peer {peer} could not be verified: {reason}")]
    Unreachable { peer: String, reason: String },
}
