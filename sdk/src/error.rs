use {std::io, thiserror::Error as ThisError};

/// Failures of a single store, load or remove operation.
///
/// Startup failures (bad key material, unusable storage root) are not
/// represented here; they abort process initialization instead.
#[derive(Debug, ThisError)]
#[non_exhaustive]
pub enum Error {
    /// The file name is empty, a dot-name, or contains a path separator.
    /// Returned before any filesystem access happens.
    #[error("invalid file name `{0}`")]
    InvalidFileName(String),

    /// Reading the source stream failed while encrypting an upload.
    #[error("failed to read source stream")]
    SourceRead(#[source] io::Error),

    /// Writing or committing the ciphertext file failed. The caller must not
    /// persist a reference to the stored name when this is returned.
    #[error("failed to write to storage")]
    StorageWrite(#[source] io::Error),

    /// The ciphertext file exists but could not be read back.
    #[error("failed to read from storage")]
    StorageRead(#[source] io::Error),

    /// No ciphertext file with this name exists.
    #[error("file `{0}` not found")]
    NotFound(String),

    /// The cipher rejected the stored data. Either the file was corrupted or
    /// it was written under different key material. No partial plaintext is
    /// ever returned.
    #[error("failed to decrypt file contents")]
    Decrypt,
}
