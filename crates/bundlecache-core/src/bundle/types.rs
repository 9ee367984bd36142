//! Bundle data types and structural validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::MalformedBundleError;

/// A named, ordered set of remote files tracked as one loadable unit.
///
/// Values of this type handed to clients are always copies; mutating them
/// never affects the registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundle {
    /// Unique bundle name.
    pub name: String,
    /// Remote file identifiers, in load order.
    pub files: Vec<String>,
    /// Optional byte-size hints, parallel to `files`.
    #[serde(rename = "fileSizes", default, skip_serializing_if = "Option::is_none")]
    pub file_sizes: Option<Vec<u64>>,
    /// Whether every file has been verified present locally.
    pub loaded: bool,
}

impl Bundle {
    /// Per-file progress weights.
    ///
    /// Size hints are used when present and non-zero in total; otherwise
    /// every file weighs 1.
    #[allow(clippy::cast_precision_loss)]
    pub fn file_weights(&self) -> Vec<f64> {
        match &self.file_sizes {
            Some(sizes) if sizes.iter().any(|s| *s > 0) => {
                sizes.iter().map(|s| *s as f64).collect()
            }
            _ => vec![1.0; self.files.len()],
        }
    }
}

/// Client input for registering a bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBundle {
    /// Unique bundle name.
    pub name: String,
    /// Remote file identifiers, in load order.
    pub files: Vec<String>,
    /// Optional byte-size hints, parallel to `files`.
    #[serde(rename = "fileSizes", default, skip_serializing_if = "Option::is_none")]
    pub file_sizes: Option<Vec<u64>>,
}

impl NewBundle {
    /// Create a bundle request without size hints.
    pub fn new<I, S>(name: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            files: files.into_iter().map(Into::into).collect(),
            file_sizes: None,
        }
    }

    /// Attach byte-size hints.
    #[must_use]
    pub fn with_file_sizes(mut self, sizes: Vec<u64>) -> Self {
        self.file_sizes = Some(sizes);
        self
    }

    /// Check the invariants the type system cannot express.
    pub fn validate(&self) -> Result<(), MalformedBundleError> {
        if let Some(sizes) = &self.file_sizes {
            if sizes.len() != self.files.len() {
                return Err(MalformedBundleError::SizeCountMismatch {
                    files: self.files.len(),
                    sizes: sizes.len(),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<&Value> for NewBundle {
    type Error = MalformedBundleError;

    /// Structural validation of untyped input, e.g. a JSON request body.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        let object = value.as_object().ok_or(MalformedBundleError::NotAnObject)?;

        let name = object
            .get("name")
            .and_then(Value::as_str)
            .ok_or(MalformedBundleError::NameNotString)?
            .to_string();

        let raw_files = object
            .get("files")
            .and_then(Value::as_array)
            .ok_or(MalformedBundleError::FilesNotArray)?;
        let files = raw_files
            .iter()
            .enumerate()
            .map(|(index, f)| {
                f.as_str()
                    .map(str::to_string)
                    .ok_or(MalformedBundleError::FileNotString { index })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let file_sizes = match object.get("fileSizes") {
            None | Some(Value::Null) => None,
            Some(Value::Array(raw_sizes)) => {
                if raw_sizes.len() != files.len() {
                    return Err(MalformedBundleError::SizeCountMismatch {
                        files: files.len(),
                        sizes: raw_sizes.len(),
                    });
                }
                let sizes = raw_sizes
                    .iter()
                    .enumerate()
                    .map(|(index, s)| {
                        s.as_u64()
                            .ok_or(MalformedBundleError::SizeNotInteger { index })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Some(sizes)
            }
            Some(_) => return Err(MalformedBundleError::SizesNotArray),
        };

        Ok(Self {
            name,
            files,
            file_sizes,
        })
    }
}

/// Stored form of a bundle; the name is the registry key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRecord {
    /// Remote file identifiers, in load order.
    pub files: Vec<String>,
    /// Optional byte-size hints, parallel to `files`.
    #[serde(rename = "fileSizes", default, skip_serializing_if = "Option::is_none")]
    pub file_sizes: Option<Vec<u64>>,
    /// Whether every file has been verified present locally.
    #[serde(default)]
    pub loaded: bool,
}

impl BundleRecord {
    /// Copy this record out as a client-facing `Bundle`.
    pub fn to_bundle(&self, name: &str) -> Bundle {
        Bundle {
            name: name.to_string(),
            files: self.files.clone(),
            file_sizes: self.file_sizes.clone(),
            loaded: self.loaded,
        }
    }
}

impl From<NewBundle> for BundleRecord {
    fn from(bundle: NewBundle) -> Self {
        Self {
            files: bundle.files,
            file_sizes: bundle.file_sizes,
            loaded: false,
        }
    }
}
