//! Document identifiers.
//!
//! Object ids are opaque strings: callers may choose their own (domains use
//! their name as id), otherwise the store assigns one. Generated ids are
//! ULIDs, so they sort by creation time and need no coordination.
//!
//! # Example
//!
//! ```rust
//! use schemata_core::id::ObjectId;
//!
//! let generated = ObjectId::generate();
//! let chosen = ObjectId::new("sampleSchema").unwrap();
//! assert_ne!(generated, chosen);
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

/// Maximum id length, matching the document store's `_id` limit.
const MAX_ID_BYTES: usize = 512;

/// Identity of a catalog document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Creates an id from a caller-supplied string.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty, blank, or longer than 512 bytes.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(Error::InvalidId {
                message: "object id cannot be empty".to_string(),
            });
        }
        if id.len() > MAX_ID_BYTES {
            return Err(Error::InvalidId {
                message: format!("object id is too long ({} > {MAX_ID_BYTES} bytes)", id.len()),
            });
        }
        Ok(Self(id))
    }

    /// Generates a new unique id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ObjectId {
    fn borrow(&self) -> &str {
        &self.0
    }
}
