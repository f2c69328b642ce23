//! Fingerprint encoding for numeric behavioral sequences.
//!
//! A fingerprint is an opaque, displayable token:
//!
//! ```text
//! CRID_<hex payload>_<base36 millis>
//! CRID_FALLBACK_<random base36>_<base36 millis>
//! ```
//!
//! The payload is a deterministic function of the input values. It carries no
//! cryptographic guarantee and must not be treated as a secret or a signature.

use crate::core::clock::{system_clock, SharedClock};
use rand::Rng;
use statrs::statistics::Statistics;

/// Leading tag of every fingerprint.
pub const SIGNATURE_TAG: &str = "CRID";

/// Payload marker used in place of an encoded payload.
pub const FALLBACK_MARKER: &str = "FALLBACK";

/// Symbol alphabet indexed by `|normalized| mod 10`.
const STAR_ALPHABET: [char; 10] = ['✦', '✧', '✩', '✪', '✫', '✬', '✭', '✮', '✯', '✰'];

/// Per-position multiplier in the symbol hash.
const POSITION_MULTIPLIER: u64 = 1337;

/// Modulus of the symbol hash.
const HASH_MODULUS: u64 = 2048;

/// Scale applied to z-scores before rounding.
const Z_SCORE_SCALE: f64 = 100.0;

/// Length of the random segment in fallback tokens.
const FALLBACK_RANDOM_LEN: usize = 11;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Internal encoding failures. Never surfaced to callers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CipherError {
    NonFinite { index: usize },
}

impl std::fmt::Display for CipherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CipherError::NonFinite { index } => {
                write!(f, "value at index {index} does not normalize to a finite number")
            }
        }
    }
}

impl std::error::Error for CipherError {}

/// Encodes numeric sequences into fingerprint tokens.
#[derive(Clone)]
pub struct FingerprintEncoder {
    clock: SharedClock,
}

impl FingerprintEncoder {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }

    /// Encode `values` into a fingerprint. Always returns a token.
    pub fn encode(&self, values: &[f64]) -> String {
        if values.is_empty() {
            return self.fallback();
        }

        match encode_payload(values) {
            Ok(payload) => format!("{SIGNATURE_TAG}_{payload}_{}", self.timestamp_suffix()),
            Err(e) => {
                tracing::warn!(error = %e, "fingerprint encoding failed, using fallback");
                self.fallback()
            }
        }
    }

    /// A fallback token with a random segment.
    pub fn fallback(&self) -> String {
        let mut rng = rand::thread_rng();
        let random: String = (0..FALLBACK_RANDOM_LEN)
            .map(|_| BASE36_DIGITS[rng.gen_range(0..BASE36_DIGITS.len())] as char)
            .collect();
        format!(
            "{SIGNATURE_TAG}_{FALLBACK_MARKER}_{random}_{}",
            self.timestamp_suffix()
        )
    }

    fn timestamp_suffix(&self) -> String {
        let millis = self.clock.now().timestamp_millis().max(0) as u64;
        to_base36(millis)
    }
}

impl Default for FingerprintEncoder {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

/// Encode with the system clock.
pub fn encode(values: &[f64]) -> String {
    FingerprintEncoder::default().encode(values)
}

/// Check the token shape: leading tag and at least three `_` segments.
pub fn is_well_formed(signature: &str) -> bool {
    signature.starts_with(SIGNATURE_TAG)
        && signature[SIGNATURE_TAG.len()..].starts_with('_')
        && signature.split('_').count() >= 3
}

/// Positional similarity of two fingerprints' payload segments, in [0, 1].
///
/// Characters are compared at equal offsets over the shorter payload and the
/// match count is divided by the longer length. No alignment is attempted, so
/// a single leading insertion can drop the score close to 0.
pub fn tolerance(a: &str, b: &str) -> f64 {
    if !is_well_formed(a) || !is_well_formed(b) {
        return 0.0;
    }

    let (payload_a, payload_b) = match (payload_segment(a), payload_segment(b)) {
        (Some(pa), Some(pb)) => (pa, pb),
        _ => return 0.0,
    };

    if payload_a == payload_b {
        return 1.0;
    }

    let chars_a: Vec<char> = payload_a.chars().collect();
    let chars_b: Vec<char> = payload_b.chars().collect();
    let max_len = chars_a.len().max(chars_b.len());
    if max_len == 0 {
        return 0.0;
    }

    let matches = chars_a
        .iter()
        .zip(chars_b.iter())
        .filter(|(ca, cb)| ca == cb)
        .count();

    matches as f64 / max_len as f64
}

/// Check whether a token came from the fallback path.
pub fn is_fallback(signature: &str) -> bool {
    payload_segment(signature) == Some(FALLBACK_MARKER)
}

fn payload_segment(signature: &str) -> Option<&str> {
    signature.split('_').nth(1)
}

/// Steps 2-5: normalize, map to symbols, hash per position, XOR to hex.
pub(crate) fn encode_payload(values: &[f64]) -> Result<String, CipherError> {
    let normalized = normalize(values)?;
    let symbols = map_symbols(&normalized);
    let hashed = hash_symbols(&symbols);
    Ok(xor_hex(&hashed))
}

/// Z-score each value against the sequence itself, scale and round half-up.
fn normalize(values: &[f64]) -> Result<Vec<i64>, CipherError> {
    let mean = values.iter().mean();
    let std_dev = values.iter().population_std_dev();
    let divisor = if std_dev == 0.0 { 1.0 } else { std_dev };

    values
        .iter()
        .enumerate()
        .map(|(index, &v)| {
            let scaled = (v - mean) / divisor * Z_SCORE_SCALE;
            if !scaled.is_finite() {
                return Err(CipherError::NonFinite { index });
            }
            Ok((scaled + 0.5).floor() as i64)
        })
        .collect()
}

fn map_symbols(normalized: &[i64]) -> Vec<char> {
    normalized
        .iter()
        .map(|n| STAR_ALPHABET[(n.unsigned_abs() % 10) as usize])
        .collect()
}

fn hash_symbols(symbols: &[char]) -> String {
    symbols
        .iter()
        .enumerate()
        .map(|(i, &symbol)| {
            let position = i as u64 + 1;
            let hash = (symbol as u64)
                .wrapping_mul(position)
                .wrapping_mul(POSITION_MULTIPLIER)
                % HASH_MODULUS;
            to_base36(hash)
        })
        .collect()
}

fn xor_hex(input: &str) -> String {
    input
        .bytes()
        .enumerate()
        .map(|(i, byte)| format!("{:02x}", byte ^ (i % 256) as u8))
        .collect()
}

/// Lowercase base-36 rendering.
pub fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE36_DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
