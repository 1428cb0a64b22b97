//! Object type tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CatalogError;

/// The kind of payload a catalog document carries.
///
/// Declaration order is the binary ordinal. New kinds are appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    /// Sentinel for "no payload recognized". Never registered.
    None,
    /// An entity-type definition.
    SchemaEntityType,
    /// An index-provider descriptor.
    IndexProvider,
    /// A domain aggregating references to other objects.
    SchemaDomain,
    /// An ontology definition.
    Ontology,
}

const ALL: [ObjectType; 5] = [
    ObjectType::None,
    ObjectType::SchemaEntityType,
    ObjectType::IndexProvider,
    ObjectType::SchemaDomain,
    ObjectType::Ontology,
];

impl ObjectType {
    /// Returns the wire tag, which is also the structured field name of the
    /// payload.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SchemaEntityType => "schemaEntityType",
            Self::IndexProvider => "indexProvider",
            Self::SchemaDomain => "schemaDomain",
            Self::Ontology => "ontology",
        }
    }

    /// Looks up a tag, returning [`ObjectType::None`] when it is not known.
    #[must_use]
    pub fn from_tag_or_none(tag: &str) -> Self {
        ALL.into_iter()
            .find(|t| t.tag() == tag)
            .unwrap_or(Self::None)
    }

    /// Returns the binary ordinal.
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        self as u32
    }

    /// Looks up a binary ordinal.
    #[must_use]
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        ALL.get(usize::try_from(ordinal).ok()?).copied()
    }

    /// Returns true for the `none` sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Self::None)
    }

    /// Iterates every real type, excluding the sentinel.
    pub fn all() -> impl Iterator<Item = Self> {
        ALL.into_iter().filter(|t| !t.is_none())
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ObjectType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::from_tag_or_none(s.trim()) {
            Self::None => Err(CatalogError::UnknownType { tag: s.to_string() }),
            known => Ok(known),
        }
    }
}

impl Serialize for ObjectType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.tag())
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::from_tag_or_none(&tag))
    }
}
