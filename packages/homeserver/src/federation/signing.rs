//! Ed25519 request signing for server-to-server calls.
//!
//! A request is signed over the canonical JSON of its method, uri, origin
//! and destination (keys sorted, no whitespace). The signature travels in an
//! `Authorization: X-Matrix origin=..,destination=..,key=..,sig=..` header.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::Rng;
use serde::Serialize;

use super::FederationError;
use crate::config::FederationConfig;

/// This server's signing key.
pub struct ServerKey {
    key_id: String,
    signing_key: SigningKey,
}

impl ServerKey {
    /// Load the configured seed, or generate a fresh key when none is set.
    pub fn from_config(config: &FederationConfig) -> Result<Self, FederationError> {
        let signing_key = match &config.signing_key {
            Some(seed) => SigningKey::from_bytes(&decode_fixed::<32>(seed)?),
            None => {
                tracing::warn!("No federation signing key configured; generating an ephemeral one");
                SigningKey::from_bytes(&rand::rng().random::<[u8; 32]>())
            }
        };
        Ok(Self {
            key_id: config.key_id.clone(),
            signing_key,
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Hex-encoded public half, as published at `/_matrix/key/v2/server`.
    pub fn verify_key_hex(&self) -> String {
        hex::encode(self.verifying_key().as_bytes())
    }

    /// Sign a request and build the `Authorization` header value for it.
    pub fn authorize(&self, request: &RequestToSign<'_>) -> String {
        let sig = self.signing_key.sign(&request.canonical_bytes());
        XMatrix {
            origin: request.origin.to_owned(),
            destination: request.destination.to_owned(),
            key_id: self.key_id.clone(),
            sig: hex::encode(sig.to_bytes()),
        }
        .to_header_value()
    }
}

/// The signed portion of a federation request. Field order is the
/// canonical (sorted) key order.
#[derive(Serialize)]
pub struct RequestToSign<'a> {
    pub destination: &'a str,
    pub method: &'a str,
    pub origin: &'a str,
    pub uri: &'a str,
}

impl RequestToSign<'_> {
    fn canonical_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }
}

pub fn verify_request(key: &VerifyingKey, request: &RequestToSign<'_>, sig_hex: &str) -> bool {
    let Ok(sig) = decode_fixed::<64>(sig_hex) else {
        return false;
    };
    key.verify(&request.canonical_bytes(), &Signature::from_bytes(&sig))
        .is_ok()
}

pub fn parse_verify_key(key_hex: &str) -> Result<VerifyingKey, FederationError> {
    VerifyingKey::from_bytes(&decode_fixed::<32>(key_hex)?)
        .map_err(|e| FederationError::InvalidKey(e.to_string()))
}

fn decode_fixed<const N: usize>(value: &str) -> Result<[u8; N], FederationError> {
    hex::decode(value)
        .map_err(|e| FederationError::InvalidKey(e.to_string()))?
        .try_into()
        .map_err(|_| FederationError::InvalidKey(format!("expected {N} bytes")))
}

/// Parsed `X-Matrix` authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XMatrix {
    pub origin: String,
    pub destination: String,
    pub key_id: String,
    pub sig: String,
}

impl XMatrix {
    pub fn parse(header: &str) -> Option<Self> {
        let params = header.strip_prefix("X-Matrix ")?;

        let (mut origin, mut destination, mut key_id, mut sig) = (None, None, None, None);
        for param in params.split(',') {
            let (name, value) = param.trim().split_once('=')?;
            let value = value.trim_matches('"').to_owned();
            match name {
                "origin" => origin = Some(value),
                "destination" => destination = Some(value),
                "key" => key_id = Some(value),
                "sig" => sig = Some(value),
                _ => {}
            }
        }

        Some(Self {
            origin: origin?,
            destination: destination?,
            key_id: key_id?,
            sig: sig?,
        })
    }

    pub fn to_header_value(&self) -> String {
        format!(
            "X-Matrix origin=\"{}\",destination=\"{}\",key=\"{}\",sig=\"{}\"",
            self.origin, self.destination, self.key_id, self.sig
        )
    }
}
