use sha2::{Digest, Sha512};

/// Length in bytes of a SHA-512 digest
pub const SHA512_LEN: usize = 64;

/// Calculate the SHA-512 digest of `data`
pub fn sha512(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Calculate the SHA-512 digest of `data` as a lowercase hex string
pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(sha512(data))
}
