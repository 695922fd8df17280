use crate::error::{CsrfError, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

/// Draw `bytes` random bytes from the operating system and encode them as
/// URL-safe base64 without padding.
pub fn generate_token(bytes: usize) -> Result<String> {
    let mut buf = vec![0u8; bytes];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|e| CsrfError::GenerationFailed(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(buf))
}

/// Compare two tokens in constant time.
///
/// Both inputs are padded to the longer length with different fill bytes, so
/// neither the position of the first difference nor a length difference
/// shows up in the timing.
pub fn tokens_match(expected: &str, submitted: &str) -> bool {
    let max_len = expected.len().max(submitted.len());

    let mut a = vec![0u8; max_len];
    let mut b = vec![0xFFu8; max_len];
    a[..expected.len()].copy_from_slice(expected.as_bytes());
    b[..submitted.len()].copy_from_slice(submitted.as_bytes());

    let lengths_equal = expected.len().ct_eq(&submitted.len());
    let contents_equal = a.ct_eq(&b);

    (lengths_equal & contents_equal).into()
}
