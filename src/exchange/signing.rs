//! Request signing and per-bet client seeds.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// Length in hex chars of the client seed sent with each bet.
pub const CLIENT_SEED_LEN: usize = 16;

/// Hex HMAC-SHA256 of `payload` under `secret`. The payload must be the
/// exact bytes put on the wire.
pub fn sign_payload(secret: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| ExchangeError::Signing)?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Fresh client seed: SHA-256 of 32 random bytes, truncated.
pub fn client_seed<R: RngCore + ?Sized>(rng: &mut R) -> String {
    let mut entropy = [0u8; 32];
    rng.fill_bytes(&mut entropy);
    let digest = Sha256::digest(entropy);
    let mut seed = hex::encode(digest);
    seed.truncate(CLIENT_SEED_LEN);
    seed
}
