//! Server-to-server plumbing: request signing, remote key lookup and the
//! outbound client used to query profiles on other homeservers.

pub mod client;
pub mod keyring;
pub mod signing;

use thiserror::Error;

pub use client::FederationClient;
pub use keyring::KeyRing;
pub use signing::ServerKey;

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("no route to server '{0}'")]
    UnknownDestination(String),

    #[error("remote server has no such resource")]
    NotFound,

    #[error("remote server answered {0}")]
    Status(u16),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid key: {0}")]
    InvalidKey(String),
}
