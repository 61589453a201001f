//! Validated value types shared by the dirstore crates.

/// Errors that can occur when validating an entity name.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The input was empty or contained only whitespace
    #[error("Entity name cannot be empty")]
    Empty,

    /// The input was `.` or `..`
    #[error("Entity name cannot be a relative directory marker: {0}")]
    DirectoryMarker(String),

    /// The input contained a path separator or a NUL byte
    #[error("Entity name must be a single path component: {0}")]
    NotSingleComponent(String),
}

/// A file name that can safely address exactly one entry inside a directory.
///
/// The input is trimmed of leading and trailing whitespace during construction,
/// matching how names arrive from the wire. After trimming the name must be
/// non-empty, must not be `.` or `..`, and must not contain `/`, `\` or NUL.
/// A name that fails these checks can never escape the directory it is joined
/// onto.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityName(String);

impl EntityName {
    /// Creates a new `EntityName` from the given input.
    ///
    /// # Arguments
    ///
    /// * `input` - Any type that can be converted to a string reference
    ///
    /// # Returns
    ///
    /// Returns `Ok(EntityName)` if the trimmed input is a single path component,
    /// or a [`NameError`] describing why it is not.
    pub fn new(input: impl AsRef<str>) -> Result<Self, NameError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(NameError::Empty);
        }
        if trimmed == "." || trimmed == ".." {
            return Err(NameError::DirectoryMarker(trimmed.to_owned()));
        }
        if trimmed.contains(['/', '\\', '\0']) {
            return Err(NameError::NotSingleComponent(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EntityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EntityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for EntityName {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl std::str::FromStr for EntityName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for EntityName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EntityName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntityName::new(&s).map_err(serde::de::Error::custom)
    }
}
