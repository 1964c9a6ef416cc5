// ABOUTME: Validated name of a managed image.
// ABOUTME: Doubles as the remote lookup key and the status store key.

use std::fmt;
use thiserror::Error;

/// Maximum length accepted for an image name.
pub const MAX_IMAGE_NAME_LEN: usize = 253;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImageNameError {
    #[error("image name cannot be empty")]
    Empty,

    #[error("image name exceeds maximum length of {MAX_IMAGE_NAME_LEN} characters")]
    TooLong,

    #[error("image name must start and end with a letter or digit")]
    BadBoundary,

    #[error("image name must be lowercase")]
    NotLowercase,

    #[error("invalid character in image name: '{0}'")]
    InvalidChar(char),
}

/// DNS-1123 subdomain style name: lowercase alphanumerics, `-` and `.`.
///
/// The remote side matches images purely on this name, so it is fixed for the
/// lifetime of a managed image. The character set also keeps it safe to use as
/// a file name in the file-backed store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageName(String);

impl ImageName {
    pub fn new(value: &str) -> Result<Self, ImageNameError> {
        if value.is_empty() {
            return Err(ImageNameError::Empty);
        }

        if value.len() > MAX_IMAGE_NAME_LEN {
            return Err(ImageNameError::TooLong);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ImageNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '.' {
                return Err(ImageNameError::InvalidChar(c));
            }
        }

        let boundary_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
        if !boundary_ok(value.chars().next()) || !boundary_ok(value.chars().last()) {
            return Err(ImageNameError::BadBoundary);
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for ImageName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ImageName {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        ImageName::new(&s).map_err(serde::de::Error::custom)
    }
}
