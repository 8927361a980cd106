use {
    crate::{crypto::Cipher, error::Error, name::StoredFileName},
    anyhow::{Context as _, Result},
    fs_err::{create_dir_all, remove_file, rename},
    std::{
        io::{self, Read, Write},
        path::PathBuf,
    },
    tempfile::NamedTempFile,
};

const COPY_BUF_LEN: usize = 8192;

/// Flat directory of immutable ciphertext files, plus a `tmp` subdirectory
/// for files that are still being written.
///
/// Every stored file is written exactly once under a freshly generated
/// unique name and renamed into place when complete, so concurrent stores
/// never race on a path and readers never observe a partial file.
#[derive(Debug)]
pub struct Storage {
    root: PathBuf,
    tmp: PathBuf,
}

impl Storage {
    /// Opens the storage root, creating it and its `tmp` subdirectory if
    /// needed. Failures here are startup-fatal for the calling process.
    pub fn new(root: PathBuf) -> Result<Self> {
        create_dir_all(&root).context("failed to create storage root")?;
        let tmp = root.join("tmp");
        create_dir_all(&tmp)?;
        Ok(Self { root, tmp })
    }

    #[must_use]
    pub fn file_path(&self, name: &StoredFileName) -> PathBuf {
        self.root.join(name.as_str())
    }

    /// Creates a temp file that can later be passed to
    /// [`commit_file`](Self::commit_file). It lives under the storage root
    /// so the final rename stays on one filesystem.
    pub fn create_file(&self) -> Result<NamedTempFile, Error> {
        NamedTempFile::new_in(&self.tmp).map_err(Error::StorageWrite)
    }

    /// Moves a finished temp file to its final name. The file becomes
    /// visible to readers atomically; on failure the temp file is cleaned
    /// up and nothing appears under the final name.
    pub fn commit_file(&self, mut file: NamedTempFile, name: &StoredFileName) -> Result<(), Error> {
        file.flush().map_err(Error::StorageWrite)?;
        let (_, tmp_path) = file.keep().map_err(|err| Error::StorageWrite(err.into()))?;
        if let Err(err) = rename(&tmp_path, self.file_path(name)) {
            let _ = remove_file(&tmp_path);
            return Err(Error::StorageWrite(err));
        }
        Ok(())
    }

    /// Encrypts `input` into a newly named ciphertext file.
    ///
    /// The input is streamed through the cipher in fixed-size chunks, so
    /// memory use is bounded regardless of upload size. On success the
    /// returned name refers to a complete, committed file; on any failure
    /// no file exists under that name and the caller must not persist it.
    ///
    /// The caller owns the source: a successfully stored upload does not
    /// delete the temporary file it was read from.
    pub fn save_encrypted(
        &self,
        cipher: &Cipher,
        mut input: impl Read,
        original_name: &str,
    ) -> Result<StoredFileName, Error> {
        let name = StoredFileName::generate(original_name)?;
        let file = self.create_file()?;
        let mut writer = cipher.encrypt_writer(file);
        let mut buf = [0u8; COPY_BUF_LEN];
        loop {
            let len = match input.read(&mut buf) {
                Ok(0) => break,
                Ok(len) => len,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::SourceRead(err)),
            };
            writer.write_all(&buf[..len]).map_err(Error::StorageWrite)?;
        }
        let file = writer.finish().map_err(Error::StorageWrite)?;
        self.commit_file(file, &name)?;
        Ok(name)
    }

    /// Reads and decrypts a stored file, returning the original bytes.
    ///
    /// The whole file is buffered in memory, which bounds this to images
    /// and other small media; limiting the size of files that may be
    /// requested is the caller's policy.
    pub fn load_decrypted(&self, cipher: &Cipher, name: &StoredFileName) -> Result<Vec<u8>, Error> {
        let ciphertext = fs_err::read(self.file_path(name)).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::NotFound(name.as_str().to_owned())
            } else {
                Error::StorageRead(err)
            }
        })?;
        cipher.decrypt(&ciphertext)
    }

    /// Removes a stored file. Callers replacing or deleting the owning
    /// record treat this as best-effort and only log failures.
    pub fn remove(&self, name: &StoredFileName) -> Result<(), Error> {
        remove_file(self.file_path(name)).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                Error::NotFound(name.as_str().to_owned())
            } else {
                Error::StorageWrite(err)
            }
        })
    }
}
