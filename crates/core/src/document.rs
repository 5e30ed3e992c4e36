//! Document identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The two kinds of legislative document docket tracks. Both kinds move
/// through the same lifecycle graph; the kind is part of a document's
/// identity, not of its workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Ordinance,
    Resolution,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Ordinance => "ordinance",
            DocumentKind::Resolution => "resolution",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a string that names no known document kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownDocumentKind(pub String);

impl fmt::Display for UnknownDocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown document kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownDocumentKind {}

impl FromStr for DocumentKind {
    type Err = UnknownDocumentKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ordinance" => Ok(DocumentKind::Ordinance),
            "resolution" => Ok(DocumentKind::Resolution),
            other => Err(UnknownDocumentKind(other.to_string())),
        }
    }
}

/// Identity of a document: kind plus caller-assigned id. Two documents of
/// different kinds may share an id without colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: String,
}

impl DocumentRef {
    pub fn new(kind: DocumentKind, id: impl Into<String>) -> Self {
        DocumentRef {
            kind,
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_its_name() {
        for kind in [DocumentKind::Ordinance, DocumentKind::Resolution] {
            assert_eq!(kind.as_str().parse::<DocumentKind>().unwrap(), kind);
        }
        assert!("motion".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn refs_display_as_kind_slash_id() {
        let doc = DocumentRef::new(DocumentKind::Ordinance, "2024-017");
        assert_eq!(doc.to_string(), "ordinance/2024-017");
    }

    #[test]
    fn same_id_different_kind_is_a_different_document() {
        let a = DocumentRef::new(DocumentKind::Ordinance, "101");
        let b = DocumentRef::new(DocumentKind::Resolution, "101");
        assert_ne!(a, b);
    }
}
