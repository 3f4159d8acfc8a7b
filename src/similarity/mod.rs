//! Fuzzy hashing and similarity analysis (CTPH implementation).
//!
//! Context-triggered piecewise hashing in the ssdeep digest format
//! `<blocksize>:<digest1>:<digest2>`. A rolling hash over a 7-byte window picks
//! chunk boundaries; each chunk contributes one base64 character of an
//! FNV-style piece hash. `digest1` uses the block size and `digest2` twice the
//! block size, so digests of neighbouring block sizes stay comparable.

use thiserror::Error;

const ROLLING_WINDOW: usize = 7;
const MIN_BLOCKSIZE: u32 = 3;
const SPAMSUM_LENGTH: usize = 64;
const HASH_PRIME: u32 = 0x0100_0193;
const HASH_INIT: u32 = 0x2802_1967;
const B64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Fuzzy hashing failures. Callers computing an import hash treat these as
/// "no fuzzy digest" rather than as errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FuzzyError {
    #[error("input of {len} bytes is below the {min} byte minimum")]
    InputTooSmall { len: usize, min: usize },

    #[error("input of {0} bytes exceeds the maximum fuzzy hash input size")]
    InputTooLarge(usize),

    #[error("invalid fuzzy digest: {0}")]
    InvalidDigest(String),
}

/// Rolling hash used to find chunk boundaries.
mod rolling {
    use super::ROLLING_WINDOW;

    pub struct RollingHash {
        window: [u8; ROLLING_WINDOW],
        pos: usize,
        h1: u32,
        h2: u32,
        h3: u32,
    }

    impl RollingHash {
        pub fn new() -> Self {
            Self {
                window: [0; ROLLING_WINDOW],
                pos: 0,
                h1: 0,
                h2: 0,
                h3: 0,
            }
        }

        pub fn update(&mut self, byte: u8) {
            let c = byte as u32;
            self.h2 = self
                .h2
                .wrapping_sub(self.h1)
                .wrapping_add(ROLLING_WINDOW as u32 * c);
            self.h1 = self
                .h1
                .wrapping_add(c)
                .wrapping_sub(self.window[self.pos] as u32);
            self.window[self.pos] = byte;
            self.pos = (self.pos + 1) % ROLLING_WINDOW;
            self.h3 = (self.h3 << 5) ^ c;
        }

        pub fn hash(&self) -> u32 {
            self.h1.wrapping_add(self.h2).wrapping_add(self.h3)
        }
    }
}

fn sum_hash(byte: u8, h: u32) -> u32 {
    h.wrapping_mul(HASH_PRIME) ^ byte as u32
}

fn b64(h: u32) -> u8 {
    B64[(h % 64) as usize]
}

fn filled(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Both digests at `block_size`, plus the number of triggered chunks of
/// `digest1` before the trailing character.
fn digest_at(data: &[u8], block_size: u32) -> (String, String, usize) {
    let mut roll = rolling::RollingHash::new();
    let mut h1 = HASH_INIT;
    let mut h2 = HASH_INIT;
    let mut d1 = [0u8; SPAMSUM_LENGTH];
    let mut d2 = [0u8; SPAMSUM_LENGTH / 2];
    let mut j = 0usize;
    let mut k = 0usize;
    let double = block_size * 2;

    for &b in data {
        h1 = sum_hash(b, h1);
        h2 = sum_hash(b, h2);
        roll.update(b);
        let rh = roll.hash();
        if rh % block_size == block_size - 1 {
            d1[j] = b64(h1);
            if j < SPAMSUM_LENGTH - 1 {
                h1 = HASH_INIT;
                j += 1;
            }
        }
        if rh % double == double - 1 {
            d2[k] = b64(h2);
            if k < SPAMSUM_LENGTH / 2 - 1 {
                h2 = HASH_INIT;
                k += 1;
            }
        }
    }
    if roll.hash() != 0 {
        d1[j] = b64(h1);
        d2[k] = b64(h2);
    }
    (filled(&d1), filled(&d2), j)
}

/// Compute the CTPH digest of `data`.
///
/// Inputs shorter than `min_input_size` are rejected; pass 0 to hash any
/// input.
pub fn fuzzy_hash(data: &[u8], min_input_size: usize) -> Result<String, FuzzyError> {
    if data.len() < min_input_size {
        return Err(FuzzyError::InputTooSmall {
            len: data.len(),
            min: min_input_size,
        });
    }
    if data.len() > u32::MAX as usize {
        return Err(FuzzyError::InputTooLarge(data.len()));
    }

    let mut block_size = MIN_BLOCKSIZE;
    while (block_size as usize) * SPAMSUM_LENGTH < data.len() {
        block_size *= 2;
    }
    loop {
        let (d1, d2, chunks) = digest_at(data, block_size);
        if block_size > MIN_BLOCKSIZE && chunks < SPAMSUM_LENGTH / 2 {
            block_size /= 2;
            continue;
        }
        return Ok(format!("{}:{}:{}", block_size, d1, d2));
    }
}

struct ParsedDigest<'a> {
    block_size: u64,
    d1: &'a str,
    d2: &'a str,
}

fn parse_digest(digest: &str) -> Result<ParsedDigest<'_>, FuzzyError> {
    let invalid = || FuzzyError::InvalidDigest(digest.to_string());
    let mut parts = digest.splitn(3, ':');
    let block_size = parts
        .next()
        .and_then(|bs| bs.parse::<u64>().ok())
        .filter(|&bs| bs > 0)
        .ok_or_else(invalid)?;
    let d1 = parts.next().ok_or_else(invalid)?;
    let rest = parts.next().ok_or_else(invalid)?;
    // ssdeep output may append `,"filename"`
    let d2 = rest.split(',').next().unwrap_or_default();
    if d1.len() > SPAMSUM_LENGTH || d2.len() > SPAMSUM_LENGTH {
        return Err(invalid());
    }
    Ok(ParsedDigest { block_size, d1, d2 })
}

/// Drop characters that extend a run of identical characters beyond three.
fn eliminate_sequences(s: &str) -> Vec<u8> {
    let b = s.as_bytes();
    let mut out = Vec::with_capacity(b.len());
    for (i, &c) in b.iter().enumerate() {
        if i < 3 || c != b[i - 1] || c != b[i - 2] || c != b[i - 3] {
            out.push(c);
        }
    }
    out
}

fn has_common_substring(a: &[u8], b: &[u8]) -> bool {
    if a.len() < ROLLING_WINDOW || b.len() < ROLLING_WINDOW {
        return false;
    }
    a.windows(ROLLING_WINDOW)
        .any(|wa| b.windows(ROLLING_WINDOW).any(|wb| wa == wb))
}

/// Levenshtein distance with insert/delete cost 1 and substitution cost 2.
fn edit_distance(a: &[u8], b: &[u8]) -> usize {
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitute = prev[j] + if ca == cb { 0 } else { 2 };
            cur[j + 1] = substitute.min(prev[j + 1] + 1).min(cur[j] + 1);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

fn score_strings(a: &[u8], b: &[u8], block_size: u64) -> u32 {
    if a.len() > SPAMSUM_LENGTH || b.len() > SPAMSUM_LENGTH {
        return 0;
    }
    if !has_common_substring(a, b) {
        return 0;
    }
    let dist = edit_distance(a, b);
    let scaled = (dist * SPAMSUM_LENGTH) / (a.len() + b.len());
    let scaled = (100 * scaled) / SPAMSUM_LENGTH;
    if scaled >= 100 {
        return 0;
    }
    let score = (100 - scaled) as u64;
    // Small block sizes cannot support high confidence on short digests
    let cap_threshold =
        ((99 + ROLLING_WINDOW as u64) / ROLLING_WINDOW as u64) * MIN_BLOCKSIZE as u64;
    if block_size >= cap_threshold {
        return score as u32;
    }
    let cap = block_size / MIN_BLOCKSIZE as u64 * a.len().min(b.len()) as u64;
    score.min(cap) as u32
}

/// Compare two CTPH digests, returning a match score from 0 to 100.
///
/// Digests whose block sizes are neither equal nor a factor of two apart
/// always score 0.
pub fn compare(a: &str, b: &str) -> Result<u32, FuzzyError> {
    let a = parse_digest(a)?;
    let b = parse_digest(b)?;
    let (bs1, bs2) = (a.block_size, b.block_size);
    if bs1 != bs2 && bs1.checked_mul(2) != Some(bs2) && bs2.checked_mul(2) != Some(bs1) {
        return Ok(0);
    }

    let a1 = eliminate_sequences(a.d1);
    let a2 = eliminate_sequences(a.d2);
    let b1 = eliminate_sequences(b.d1);
    let b2 = eliminate_sequences(b.d2);

    if bs1 == bs2 && a1 == b1 {
        return Ok(100);
    }
    let score = if bs1 == bs2 {
        score_strings(&a1, &b1, bs1).max(score_strings(&a2, &b2, bs1.saturating_mul(2)))
    } else if bs1.checked_mul(2) == Some(bs2) {
        score_strings(&b1, &a2, bs2)
    } else {
        score_strings(&a1, &b2, bs1)
    };
    Ok(score)
}
