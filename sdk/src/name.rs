use {
    crate::error::Error,
    serde::{Deserialize, Deserializer, Serialize, Serializer, de},
    std::{borrow::Cow, fmt, str::FromStr},
    uuid::Uuid,
};

/// Name of a ciphertext file inside the storage root.
///
/// Generated names have the form `<uuid>-<original file name>`, so two
/// uploads of the same file never collide and the original name (with its
/// extension) stays recoverable from the stored name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredFileName(String);

impl StoredFileName {
    /// Generates a fresh unique stored name for an uploaded file.
    ///
    /// `original_name` must be a plain base name. Anything that could change
    /// the target directory is rejected before the name is ever joined to a
    /// filesystem path.
    pub fn generate(original_name: &str) -> Result<Self, Error> {
        check_file_name(original_name)?;
        Ok(Self(format!("{}-{original_name}", Uuid::new_v4())))
    }

    #[must_use]
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension of the original file name, without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<&str> {
        let (_, ext) = self.0.rsplit_once('.')?;
        Some(ext)
    }
}

fn check_file_name(name: &str) -> Result<(), Error> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidFileName(name.into()));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(Error::InvalidFileName(name.into()));
    }
    Ok(())
}

impl FromStr for StoredFileName {
    type Err = Error;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_file_name(s)?;
        Ok(Self(s.into()))
    }
}

impl fmt::Display for StoredFileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for StoredFileName {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Cow::<'_, str>::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

impl Serialize for StoredFileName {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_names_are_unique() {
        let a = StoredFileName::generate("cat.png").unwrap();
        let b = StoredFileName::generate("cat.png").unwrap();
        assert_ne!(a, b);
        assert!(a.as_str().ends_with("-cat.png"));
        assert!(b.as_str().ends_with("-cat.png"));
    }

    #[test]
    fn traversal_is_rejected() {
        StoredFileName::generate("../etc/passwd").unwrap_err();
        StoredFileName::generate("..").unwrap_err();
        StoredFileName::generate(".").unwrap_err();
        StoredFileName::generate("").unwrap_err();
        StoredFileName::generate("a/b.png").unwrap_err();
        StoredFileName::generate("a\\b.png").unwrap_err();
        StoredFileName::generate("a\0b.png").unwrap_err();
        "../cat.png".parse::<StoredFileName>().unwrap_err();
        "a/../b.png".parse::<StoredFileName>().unwrap_err();
    }

    #[test]
    fn dots_inside_names_are_allowed() {
        // "a..b.png" cannot traverse anywhere without a separator.
        StoredFileName::generate("a..b.png").unwrap();
        "some-uuid-a..b.png".parse::<StoredFileName>().unwrap();
    }

    #[test]
    fn extension() {
        let name = StoredFileName::generate("cat.PNG").unwrap();
        assert_eq!(name.extension(), Some("PNG"));
        let name = StoredFileName::generate("archive.tar.gz").unwrap();
        assert_eq!(name.extension(), Some("gz"));
        let name = StoredFileName::generate("noext").unwrap();
        assert_eq!(name.extension(), None);
    }
}
