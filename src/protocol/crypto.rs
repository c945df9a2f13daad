//! Credential-block decryption.
//!
//! Password-change payloads carry a 516-byte block encrypted with an RC4
//! keystream whose key is the MD4 digest of the UTF-16LE encoding of the
//! account's current password. The trailing 4 bytes of the plaintext are a
//! little-endian byte length; a value of at most 512 is taken as evidence
//! that decryption succeeded. That bound is a plausibility heuristic, not
//! an integrity check: there is no authenticated tag, so a wrong key can
//! in principle still produce a small length.

use log::debug;
use md4::{Digest, Md4};
use rc4::{consts::U16, KeyInit, Rc4, StreamCipher};

use crate::common::error::CodecError;
use crate::metrics::METRICS;
use crate::protocol::codec::get_fixed;
use crate::protocol::tree::Node;

/// Size of the encrypted credential block on the wire.
pub const CRYPT_BLOCK_LEN: usize = 516;

/// Maximum plausible password length in bytes (the validity threshold).
pub const CRYPT_MAX_PASSWORD_BYTES: usize = 512;

/// An encrypted credential block exactly as received.
#[derive(Clone)]
pub struct EncryptedBlock(pub [u8; CRYPT_BLOCK_LEN]);

/// Password recovered from a valid plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPassword {
    /// Bytes of pseudorandom fill preceding the password.
    pub padding_len: usize,
    pub password: String,
    pub declared_len: u32,
}

/// Outcome of one decryption attempt.
#[derive(Clone)]
pub struct DecryptResult {
    pub plaintext: [u8; CRYPT_BLOCK_LEN],
    pub valid: bool,
    /// Present only when `valid`.
    pub unpacked: Option<NewPassword>,
}

fn utf16le_bytes(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Decrypt a credential block with the configured account password and
/// apply the length heuristic.
pub fn decrypt_and_unpack(block: &EncryptedBlock, secret_password: &str) -> DecryptResult {
    let key = Md4::digest(utf16le_bytes(secret_password));
    let mut plaintext = block.0;
    let mut cipher = Rc4::<U16>::new(&key);
    cipher.apply_keystream(&mut plaintext);

    let declared_len = u32::from_le_bytes(
        plaintext[CRYPT_BLOCK_LEN - 4..]
            .try_into()
            .unwrap(),
    );

    if declared_len as usize > CRYPT_MAX_PASSWORD_BYTES {
        debug!(
            "credential block failed length heuristic: declared_len={}",
            declared_len
        );
        return DecryptResult {
            plaintext,
            valid: false,
            unpacked: None,
        };
    }

    let len = declared_len as usize;
    let start = CRYPT_BLOCK_LEN - 4 - len;
    let units: Vec<u16> = plaintext[start..start + len]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    let password = String::from_utf16_lossy(&units);

    DecryptResult {
        plaintext,
        valid: true,
        unpacked: Some(NewPassword {
            padding_len: start,
            password,
            declared_len,
        }),
    }
}

/// A credential block field: raw bytes plus the decryption attempt, if
/// any. Decoding never mutates the received bytes.
#[derive(Clone)]
pub struct CryptBlock {
    pub raw: EncryptedBlock,
    pub result: Option<DecryptResult>,
}

impl CryptBlock {
    /// Read a block from the cursor and, when a secret is configured,
    /// attempt to decrypt it.
    pub fn decode(src: &mut &[u8], secret: Option<&str>) -> Result<Self, CodecError> {
        let raw_bytes = get_fixed(src, CRYPT_BLOCK_LEN)?;
        let mut raw = [0u8; CRYPT_BLOCK_LEN];
        raw.copy_from_slice(&raw_bytes);
        let raw = EncryptedBlock(raw);

        let result = secret.map(|pw| decrypt_and_unpack(&raw, pw));
        if let Some(r) = &result {
            if !r.valid {
                METRICS.inc_crypt_unverified();
            }
        }
        Ok(CryptBlock { raw, result })
    }

    /// Render the block into a field tree node.
    pub fn node(&self, name: &'static str) -> Node {
        let mut n = Node::branch(name);
        n.put_bytes("ciphertext", self.raw.0.to_vec());
        match &self.result {
            None => n.put_str("note", "no account password configured, not decrypted"),
            Some(r) if r.valid => {
                let np = r.unpacked.as_ref().unwrap();
                n.put_u32("declared_len", np.declared_len);
                n.put_str("new_password", np.password.clone());
                n.put_u32("padding_len", np.padding_len as u32);
            }
            Some(r) => {
                n.put_str("note", "decryption unverified (length heuristic failed)");
                n.put_bytes("plaintext", r.plaintext.to_vec());
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_with_trailing_len(len: u32) -> EncryptedBlock {
        // A zero ciphertext XORed with the keystream of the empty key is
        // not useful here; instead build the *plaintext* we want and
        // encrypt it with the same keystream so decryption recovers it.
        let mut plain = [0u8; CRYPT_BLOCK_LEN];
        plain[CRYPT_BLOCK_LEN - 4..].copy_from_slice(&len.to_le_bytes());
        encrypt_for_test(&plain, "s3cret")
    }

    fn encrypt_for_test(plaintext: &[u8; CRYPT_BLOCK_LEN], password: &str) -> EncryptedBlock {
        let key = Md4::digest(utf16le_bytes(password));
        let mut data = *plaintext;
        let mut cipher = Rc4::<U16>::new(&key);
        cipher.apply_keystream(&mut data);
        EncryptedBlock(data)
    }

    #[test]
    fn test_threshold_boundary_512_valid() {
        let block = block_with_trailing_len(512);
        let r = decrypt_and_unpack(&block, "s3cret");
        assert!(r.valid);
        assert_eq!(r.unpacked.as_ref().unwrap().declared_len, 512);
        assert_eq!(r.unpacked.as_ref().unwrap().padding_len, 0);
    }

    #[test]
    fn test_threshold_boundary_513_invalid() {
        let block = block_with_trailing_len(513);
        let r = decrypt_and_unpack(&block, "s3cret");
        assert!(!r.valid);
        assert!(r.unpacked.is_none());
    }

    #[test]
    fn test_password_recovered() {
        let pw_bytes = utf16le_bytes("newpw");
        let len = pw_bytes.len();
        let mut plain = [0u8; CRYPT_BLOCK_LEN];
        let start = CRYPT_BLOCK_LEN - 4 - len;
        plain[start..start + len].copy_from_slice(&pw_bytes);
        plain[CRYPT_BLOCK_LEN - 4..].copy_from_slice(&(len as u32).to_le_bytes());

        let block = encrypt_for_test(&plain, "oldpw");
        let r = decrypt_and_unpack(&block, "oldpw");
        assert!(r.valid);
        let np = r.unpacked.unwrap();
        assert_eq!(np.password, "newpw");
        assert_eq!(np.padding_len, start);
    }

    #[test]
    fn test_wrong_key_usually_fails_heuristic() {
        let pw_bytes = utf16le_bytes("newpw");
        let len = pw_bytes.len();
        let mut plain = [0u8; CRYPT_BLOCK_LEN];
        plain[CRYPT_BLOCK_LEN - 4 - len..CRYPT_BLOCK_LEN - 4].copy_from_slice(&pw_bytes);
        plain[CRYPT_BLOCK_LEN - 4..].copy_from_slice(&(len as u32).to_le_bytes());

        let block = encrypt_for_test(&plain, "rightpw");
        let r = decrypt_and_unpack(&block, "wrongpw");
        // Not guaranteed by the heuristic, but this fixed input decrypts
        // to garbage whose trailing length exceeds 512.
        assert!(!r.valid);
    }

    #[test]
    fn test_decode_without_secret_stays_opaque() {
        let raw = vec![0x5a; CRYPT_BLOCK_LEN];
        let mut p = &raw[..];
        let cb = CryptBlock::decode(&mut p, None).unwrap();
        assert!(cb.result.is_none());
        assert!(p.is_empty());
        let n = cb.node("crypt");
        assert!(n.child("note").is_some());
    }
}
