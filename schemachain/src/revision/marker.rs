use crate::common::ROOT_MARKER;
use std::fmt::{Display, Formatter};

/// Position on the revision chain: either nothing applied or a revision id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Marker {
    Root,
    Revision(String),
}

impl Marker {
    /// Parses a user-supplied marker. `base` and the empty string denote the root.
    pub fn parse(text: &str) -> Marker {
        let text = text.trim();
        if text.is_empty() || text == ROOT_MARKER {
            Marker::Root
        } else {
            Marker::Revision(text.to_string())
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Marker::Root)
    }

    pub fn revision_id(&self) -> Option<&str> {
        match self {
            Marker::Root => None,
            Marker::Revision(id) => Some(id),
        }
    }

    pub(crate) fn from_column(value: Option<String>) -> Marker {
        match value {
            Some(id) => Marker::Revision(id),
            None => Marker::Root,
        }
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Marker::Root => write!(f, "{}", ROOT_MARKER),
            Marker::Revision(id) => write!(f, "{}", id),
        }
    }
}

impl From<&str> for Marker {
    fn from(value: &str) -> Self {
        Marker::parse(value)
    }
}

impl From<Option<&str>> for Marker {
    fn from(value: Option<&str>) -> Self {
        match value {
            Some(id) => Marker::Revision(id.to_string()),
            None => Marker::Root,
        }
    }
}
