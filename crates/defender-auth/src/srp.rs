//! SRP-6a arithmetic for the Cognito `USER_SRP_AUTH` flow.
//!
//! Flow: random a → A = g^a → (server: salt, B, secret block) → S → HKDF key
//! → claim signature

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use num_bigint::BigUint;
use rand::RngCore;
use sha2::{Digest, Sha256};
use defender_types::{DefenderError, Result};

type HmacSha256 = Hmac<Sha256>;

/// RFC 3526 3072-bit MODP group prime.
const N_HEX: &str = concat!(
    "FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD1",
    "29024E088A67CC74020BBEA63B139B22514A08798E3404DD",
    "EF9519B3CD3A431B302B0A6DF25F14374FE1356D6D51C245",
    "E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED",
    "EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3D",
    "C2007CB8A163BF0598DA48361C55D39A69163FA8FD24CF5F",
    "83655D23DCA3AD961C62F356208552BB9ED529077096966D",
    "670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B",
    "E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9",
    "DE2BCBF6955817183995497CEA956AE515D2261898FA0510",
    "15728E5A8AAAC42DAD33170D04507A33A85521ABDF1CBA64",
    "ECFB850458DBEF0A8AEA71575D060C7DB3970F85A6E1E4C7",
    "ABF5AE8CDB0933D71E8C94E04A25619DCEE3D2261AD2EE6B",
    "F12FFA06D98A0864D87602733EC86A64521F2B18177B200C",
    "BBE117577A615D6C770988C0BAD946E208E24FA074E5AB31",
    "43DB5BFCE0FD108E4B82D120A93AD2CAFFFFFFFFFFFFFFFF",
);

const G_HEX: &str = "2";

const DERIVED_KEY_INFO: &[u8] = b"Caldera Derived Key";

/// Size of the private exponent in bytes.
const SMALL_A_LEN: usize = 128;

fn auth_err(msg: impl Into<String>) -> DefenderError {
    DefenderError::Auth(msg.into())
}

fn parse_hex(hex_str: &str) -> Result<BigUint> {
    BigUint::parse_bytes(hex_str.as_bytes(), 16)
        .ok_or_else(|| auth_err(format!("invalid hex value: {}", hex_str)))
}

/// Left-pad a hex string so it decodes to a positive big-endian integer.
pub fn pad_hex(hex_str: &str) -> String {
    if hex_str.len() % 2 == 1 {
        format!("0{}", hex_str)
    } else if hex_str.starts_with(|c: char| "89ABCDEFabcdef".contains(c)) {
        format!("00{}", hex_str)
    } else {
        hex_str.to_string()
    }
}

fn is_zero(value: &BigUint) -> bool {
    value.bits() == 0
}

fn pad_big(value: &BigUint) -> String {
    pad_hex(&value.to_str_radix(16))
}

/// SHA-256 over the bytes encoded by a hex string.
fn hash_hex(hex_str: &str) -> Result<BigUint> {
    let bytes = hex::decode(hex_str).map_err(|e| auth_err(e.to_string()))?;
    Ok(BigUint::from_bytes_be(&Sha256::digest(&bytes)))
}

/// Cognito timestamp: `Mon Oct 5 09:03:07 UTC 2026` (day of month unpadded).
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%a %b %-d %H:%M:%S UTC %Y").to_string()
}

/// Client side of one SRP exchange. Built fresh for every login.
pub struct SrpSession {
    big_n: BigUint,
    g: BigUint,
    k: BigUint,
    small_a: BigUint,
    large_a: BigUint,
}

impl SrpSession {
    /// Start a session with a random private exponent.
    pub fn new() -> Result<Self> {
        let mut bytes = [0u8; SMALL_A_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self::with_private_value(BigUint::from_bytes_be(&bytes))
    }

    pub(crate) fn with_private_value(a: BigUint) -> Result<Self> {
        let big_n = parse_hex(N_HEX)?;
        let g = parse_hex(G_HEX)?;
        let k = hash_hex(&format!("00{}0{}", N_HEX, G_HEX))?;

        let small_a = a % &big_n;
        let large_a = g.modpow(&small_a, &big_n);
        if is_zero(&(&large_a % &big_n)) {
            return Err(auth_err("safety check for A failed"));
        }

        Ok(Self {
            big_n,
            g,
            k,
            small_a,
            large_a,
        })
    }

    /// Public value A, lowercase hex without padding (`SRP_A`).
    pub fn large_a_hex(&self) -> String {
        self.large_a.to_str_radix(16)
    }

    /// Derive the 16-byte password authentication key from the server challenge.
    pub fn password_authentication_key(
        &self,
        pool_name: &str,
        username: &str,
        password: &str,
        server_b_hex: &str,
        salt_hex: &str,
    ) -> Result<[u8; 16]> {
        let server_b = parse_hex(server_b_hex)?;
        if is_zero(&(&server_b % &self.big_n)) {
            return Err(auth_err("safety check for B failed"));
        }

        let u = hash_hex(&format!("{}{}", pad_big(&self.large_a), pad_big(&server_b)))?;
        if is_zero(&u) {
            return Err(auth_err("U cannot be zero"));
        }

        let credentials_hash =
            Sha256::digest(format!("{}{}:{}", pool_name, username, password).as_bytes());
        let x = hash_hex(&format!("{}{}", pad_hex(salt_hex), hex::encode(credentials_hash)))?;

        // (B - k * g^x) mod N, kept non-negative
        let kgx = (&self.k * self.g.modpow(&x, &self.big_n)) % &self.big_n;
        let base = ((&server_b % &self.big_n) + &self.big_n - kgx) % &self.big_n;
        let exponent = &self.small_a + &u * &x;
        let s = base.modpow(&exponent, &self.big_n);

        let ikm = hex::decode(pad_big(&s)).map_err(|e| auth_err(e.to_string()))?;
        let salt = hex::decode(pad_big(&u)).map_err(|e| auth_err(e.to_string()))?;

        let hk = Hkdf::<Sha256>::new(Some(salt.as_slice()), &ikm);
        let mut okm = [0u8; 16];
        hk.expand(DERIVED_KEY_INFO, &mut okm)
            .map_err(|e| auth_err(e.to_string()))?;
        Ok(okm)
    }
}

/// `PASSWORD_CLAIM_SIGNATURE`: base64 HMAC-SHA256 over pool name, user id,
/// decoded secret block, and timestamp.
pub fn claim_signature(
    key: &[u8],
    pool_name: &str,
    user_id: &str,
    secret_block_b64: &str,
    timestamp: &str,
) -> Result<String> {
    let secret_block = STANDARD
        .decode(secret_block_b64)
        .map_err(|e| auth_err(format!("invalid secret block: {}", e)))?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| auth_err(e.to_string()))?;
    mac.update(pool_name.as_bytes());
    mac.update(user_id.as_bytes());
    mac.update(&secret_block);
    mac.update(timestamp.as_bytes());

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
