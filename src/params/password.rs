use base64::{engine::general_purpose::STANDARD, Engine};
use rand::{rngs::OsRng, RngCore};

pub const PASSWORD_LEN: usize = 16;

// 12 bytes is 96 bits, exactly 16 base64 symbols with no padding.
const RAW_LEN: usize = PASSWORD_LEN / 4 * 3;

/// A fresh 16-character password. It decodes to 12 bytes, which is not a
/// valid key length for the 2022 methods (see [`super::Method::needs_raw_key`]).
pub fn generate_password() -> String {
    let mut raw = [0u8; RAW_LEN];
    OsRng.fill_bytes(&mut raw);
    STANDARD.encode(raw)
}
