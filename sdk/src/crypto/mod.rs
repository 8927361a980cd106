//! All stored file content is encrypted with AES-256-CBC and PKCS#7 padding
//! under a single process-wide key and IV. The ciphertext file is the raw
//! cipher output: no header, no per-file nonce, no authentication tag. This
//! matches the layout of files written by earlier deployments, so existing
//! stored files stay readable.
//!
//! Reusing one IV for every file is a known weakness of this format:
//! encryption is deterministic (identical uploads produce identical
//! ciphertext files), and CBC provides no integrity protection, so a
//! corrupted file is only detected when the padding check fails on
//! decryption, which is not guaranteed. Moving to a per-file random IV
//! stored as a ciphertext prefix, with an authenticated mode, would fix both
//! but breaks compatibility with already stored files.
//!
//! Encryption streams: [`EncryptingWriter`] holds at most one cipher block
//! of pending plaintext, so arbitrarily large uploads encrypt in bounded
//! memory. Decryption buffers the whole file; stored media is expected to be
//! small.

mod cipher;
mod io;

pub(crate) type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
pub(crate) type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub use self::{cipher::Cipher, io::EncryptingWriter};
