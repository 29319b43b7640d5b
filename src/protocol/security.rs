//! Payload security layer.
//!
//! Two interchangeable in-place transforms over the frame image, both keyed
//! by the 16-byte application key provisioned with `SetAppKey`:
//!
//! - **Scramble**: `out[i] = in[i] ^ key[i % 4]` over all 64 bytes.  Weak,
//!   symmetric, kept bit-exact for the deployed gateways.
//! - **Cipher**: AES-128-CBC over the first 32 bytes only, as two
//!   independent single-block operations that each start from the fixed IV.
//!   Bytes 32..64 travel in the clear.

use aes::Aes128;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use serde::{Deserialize, Serialize};

use super::frame::FrameImage;
use crate::error::SecurityError;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Application key length.
pub const KEY_LEN: usize = 16;

/// Provisioned application key.
pub type AppKey = [u8; KEY_LEN];

/// Fixed CBC initialisation vector shared with the gateway.
pub const CIPHER_IV: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
];

const BLOCK_LEN: usize = 16;

/// Leading span of the image covered by the cipher transform.
const CIPHER_SPAN: usize = 2 * BLOCK_LEN;

/// Width of the repeating scramble keystream.
const SCRAMBLE_STRIDE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionMode {
    Scramble,
    Cipher,
}

impl EncryptionMode {
    /// Mode selected at build time through the `aes-cipher` feature.
    pub const fn build_default() -> Self {
        if cfg!(feature = "aes-cipher") {
            Self::Cipher
        } else {
            Self::Scramble
        }
    }

    /// Identifier reported in the link report block.
    pub fn wire_id(self) -> u8 {
        match self {
            Self::Scramble => 1,
            Self::Cipher => 2,
        }
    }
}

/// XOR the image with the first four key bytes.  Its own inverse.
pub fn scramble(image: &mut FrameImage, key: &AppKey) {
    for (i, byte) in image.iter_mut().enumerate() {
        *byte ^= key[i % SCRAMBLE_STRIDE];
    }
}

/// Encrypt the image in place.
pub fn encrypt(mode: EncryptionMode, image: &mut FrameImage, key: &AppKey) -> Result<(), SecurityError> {
    match mode {
        EncryptionMode::Scramble => scramble(image, key),
        EncryptionMode::Cipher => {
            for block in image[..CIPHER_SPAN].chunks_exact_mut(BLOCK_LEN) {
                Aes128CbcEnc::new(key.into(), (&CIPHER_IV).into())
                    .encrypt_padded_mut::<NoPadding>(block, BLOCK_LEN)
                    .map_err(|_| SecurityError::Cipher)?;
            }
        }
    }
    Ok(())
}

/// Decrypt the image in place.
pub fn decrypt(mode: EncryptionMode, image: &mut FrameImage, key: &AppKey) -> Result<(), SecurityError> {
    match mode {
        EncryptionMode::Scramble => scramble(image, key),
        EncryptionMode::Cipher => {
            for block in image[..CIPHER_SPAN].chunks_exact_mut(BLOCK_LEN) {
                Aes128CbcDec::new(key.into(), (&CIPHER_IV).into())
                    .decrypt_padded_mut::<NoPadding>(block)
                    .map_err(|_| SecurityError::Cipher)?;
            }
        }
    }
    Ok(())
}
