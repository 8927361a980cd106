use {
    anyhow::{Error, format_err},
    rand::{RngCore as _, rand_core, rngs::OsRng},
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::{
        borrow::Cow,
        fmt::{self, Debug},
        str::FromStr,
    },
};

pub const KEY_LENGTH: usize = 32;
pub const IV_LENGTH: usize = 16;

/// Secret used to encrypt and decrypt all stored file contents.
///
/// Supplied as a hex string in the process configuration. A value of the
/// wrong length fails config parsing, so the process never starts with
/// unusable key material.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LENGTH]);

impl EncryptionKey {
    #[must_use]
    #[inline]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LENGTH];
        rand_core::UnwrapErr(OsRng).fill_bytes(&mut bytes);
        Self(bytes)
    }

    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }

    #[must_use]
    #[inline]
    pub fn display_unmasked(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for EncryptionKey {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let array = <[u8; KEY_LENGTH]>::try_from(bytes).map_err(|bytes| {
            format_err!(
                "invalid encryption key length; got {} bytes, expected {KEY_LENGTH}",
                bytes.len()
            )
        })?;
        Ok(Self(array))
    }
}

impl<'de> Deserialize<'de> for EncryptionKey {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Cow::<'_, str>::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

impl Serialize for EncryptionKey {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex::encode(self.0).serialize(serializer)
    }
}

impl Debug for EncryptionKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey").finish()
    }
}

/// Initialization vector shared by all stored files.
///
/// The IV is part of the process configuration rather than generated per
/// file, so that existing ciphertext files remain readable. See the module
/// docs of [`crate::crypto`] for the implications.
#[derive(Clone)]
pub struct InitVector([u8; IV_LENGTH]);

impl InitVector {
    #[must_use]
    #[inline]
    pub fn generate() -> Self {
        let mut bytes = [0u8; IV_LENGTH];
        rand_core::UnwrapErr(OsRng).fill_bytes(&mut bytes);
        Self(bytes)
    }

    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8; IV_LENGTH] {
        &self.0
    }
}

impl FromStr for InitVector {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let array = <[u8; IV_LENGTH]>::try_from(bytes).map_err(|bytes| {
            format_err!(
                "invalid init vector length; got {} bytes, expected {IV_LENGTH}",
                bytes.len()
            )
        })?;
        Ok(Self(array))
    }
}

impl<'de> Deserialize<'de> for InitVector {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Cow::<'_, str>::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

impl Serialize for InitVector {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex::encode(self.0).serialize(serializer)
    }
}

impl Debug for InitVector {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitVector").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encryption_key_from_str() {
        let key = EncryptionKey::generate();
        let hex_str = key.display_unmasked();
        assert_eq!(hex_str.len(), KEY_LENGTH * 2);
        assert_eq!(
            EncryptionKey::from_str(&hex_str).unwrap().as_bytes(),
            key.as_bytes()
        );
        EncryptionKey::from_str("").unwrap_err();
        EncryptionKey::from_str("00ff").unwrap_err();
        EncryptionKey::from_str(&format!("{hex_str}00")).unwrap_err();
        EncryptionKey::from_str("zz").unwrap_err();
    }

    #[test]
    fn init_vector_from_str() {
        let iv = InitVector::generate();
        let hex_str = hex::encode(iv.as_bytes());
        assert_eq!(
            InitVector::from_str(&hex_str).unwrap().as_bytes(),
            iv.as_bytes()
        );
        InitVector::from_str("").unwrap_err();
        InitVector::from_str(&format!("{hex_str}00")).unwrap_err();
    }

    #[test]
    fn debug_is_masked() {
        let key = EncryptionKey::generate();
        assert_eq!(format!("{key:?}"), "EncryptionKey");
        let iv = InitVector::generate();
        assert_eq!(format!("{iv:?}"), "InitVector");
    }
}
