use super::{Marker, Operation};
use crate::common::{validate_ident, HEAD_MARKER, ROOT_MARKER};
use crate::errors::{ErrorKind, SchemaError, SchemaResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One authored, immutable schema change.
///
/// A revision is identified by an opaque `id` and names the revision it follows through
/// `parent_id` (`None` for the first revision of a chain). The `forward` operation moves the
/// schema to this revision; `reverse` restores the state of the parent.
///
/// # Examples
///
/// ```rust,ignore
/// use schemachain::revision::{ColumnDef, Operation, Revision};
///
/// let r1 = Revision::reversible(
///     "r1",
///     None,
///     Operation::add_column("agents", ColumnDef::new("is_verified", "BOOLEAN").default_value(false)),
/// )?;
/// let r2 = Revision::reversible(
///     "r2",
///     Some("r1"),
///     Operation::rename_column("agents", "endpoint_url", "endpoint"),
/// )?
/// .with_label("rename endpoint column");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    id: String,
    #[serde(default)]
    parent_id: Option<String>,
    forward: Operation,
    reverse: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl Revision {
    /// Creates a revision with an explicitly authored reverse operation.
    pub fn new(id: &str, parent_id: Option<&str>, forward: Operation, reverse: Operation) -> Self {
        Revision {
            id: id.to_string(),
            parent_id: parent_id.map(|p| p.to_string()),
            forward,
            reverse,
            label: None,
            created_at: None,
        }
    }

    /// Creates a revision whose reverse operation is derived from `forward`.
    pub fn reversible(id: &str, parent_id: Option<&str>, forward: Operation) -> SchemaResult<Self> {
        let reverse = forward.inverse()?;
        Ok(Revision::new(id, parent_id, forward, reverse))
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    /// The marker this revision follows.
    pub fn parent(&self) -> Marker {
        Marker::from(self.parent_id())
    }

    /// The marker recorded once this revision is applied.
    pub fn marker(&self) -> Marker {
        Marker::Revision(self.id.clone())
    }

    pub fn forward(&self) -> &Operation {
        &self.forward
    }

    pub fn reverse(&self) -> &Operation {
        &self.reverse
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn created_at(&self) -> Option<&DateTime<Utc>> {
        self.created_at.as_ref()
    }

    /// Checks the revision in isolation: ids are usable and both operations are well formed.
    pub fn validate(&self) -> SchemaResult<()> {
        validate_ident(&self.id, "Revision")?;
        if self.id == ROOT_MARKER || self.id == HEAD_MARKER {
            return Err(SchemaError::new(
                &format!("Revision id {} is reserved", self.id),
                ErrorKind::ValidationError,
            ));
        }
        if let Some(parent) = self.parent_id() {
            validate_ident(parent, "Parent revision")?;
            if parent == self.id {
                return Err(SchemaError::new(
                    &format!("Revision {} names itself as parent", self.id),
                    ErrorKind::BrokenChain,
                ));
            }
        }
        self.forward.validate()?;
        self.reverse.validate()
    }
}
