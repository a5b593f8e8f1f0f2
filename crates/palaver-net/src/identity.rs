//! File-backed transport identity.
//!
//! The local peer id is derived from an Ed25519 keypair stored on disk, so
//! the same id is claimed on every session. Establishing the identity is
//! idempotent: an existing key file is always reused.

use std::fs;
use std::path::Path;

use libp2p::identity::Keypair;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Key file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Key file is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("Invalid key bytes")]
    InvalidKeyBytes,
}

/// Load the transport keypair from `path`, generating and persisting a new
/// one if the file does not exist yet.
pub fn ensure_identity(path: &Path) -> Result<Keypair, IdentityError> {
    if path.exists() {
        let encoded = fs::read_to_string(path)?;
        let bytes = hex::decode(encoded.trim())?;
        let keypair =
            Keypair::ed25519_from_bytes(bytes).map_err(|_| IdentityError::InvalidKeyBytes)?;
        return Ok(keypair);
    }

    let keypair = Keypair::generate_ed25519();
    // Persist only the 32 secret-key bytes; that is the form
    // `ed25519_from_bytes` accepts on the next load.
    let secret = keypair
        .clone()
        .try_into_ed25519()
        .map_err(|_| IdentityError::InvalidKeyBytes)?
        .secret();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, hex::encode(secret.as_ref()))?;

    info!(
        path = %path.display(),
        peer_id = %keypair.public().to_peer_id(),
        "Generated new transport identity"
    );
    Ok(keypair)
}
