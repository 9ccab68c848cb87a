//! Audit record data structures
//!
//! An audit record is a tree of [`AuditNode`]s. Each node maps field and
//! relationship names to [`AuditValue`]s and carries an [`AuditState`]
//! marker, except nodes for structural values which have no lifecycle of
//! their own.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::models::ActorId;
use crate::tracking::{ChangeState, KeyPart};

/// Reserved key carrying a node's state when serialized
pub const AUDIT_STATE_KEY: &str = "AuditState";

/// Classification of an audited entity or reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditState {
    Added,
    Deleted,
    Modified,
    ReferenceAdded,
    ReferenceSevered,
    Detached,
}

impl AuditState {
    /// Map a tracker state onto the audit state of an entity node
    ///
    /// An unchanged root is only emitted when something below it changed,
    /// so it is reported as `Modified`.
    pub fn from_change_state(state: ChangeState) -> Self {
        match state {
            ChangeState::Added => Self::Added,
            ChangeState::Deleted => Self::Deleted,
            ChangeState::Modified | ChangeState::Unchanged => Self::Modified,
            ChangeState::Detached => Self::Detached,
        }
    }
}

impl From<ChangeState> for AuditState {
    fn from(state: ChangeState) -> Self {
        Self::from_change_state(state)
    }
}

impl fmt::Display for AuditState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "Added"),
            Self::Deleted => write!(f, "Deleted"),
            Self::Modified => write!(f, "Modified"),
            Self::ReferenceAdded => write!(f, "ReferenceAdded"),
            Self::ReferenceSevered => write!(f, "ReferenceSevered"),
            Self::Detached => write!(f, "Detached"),
        }
    }
}

/// Transition recorded for a single scalar field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldState {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => write!(f, "Added"),
            Self::Modified => write!(f, "Modified"),
            Self::Deleted => write!(f, "Deleted"),
        }
    }
}

/// Old/new values of one changed scalar field
///
/// `Added` carries only the new value, `Deleted` only the old one and
/// `Modified` both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FieldAudit {
    #[serde(rename = "AuditState")]
    pub state: FieldState,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<ActorId>,
}

impl FieldAudit {
    pub fn added(new_value: Value) -> Self {
        Self {
            state: FieldState::Added,
            old_value: None,
            new_value: Some(new_value),
            actor_id: None,
        }
    }

    pub fn modified(old_value: Value, new_value: Value) -> Self {
        Self {
            state: FieldState::Modified,
            old_value: Some(old_value),
            new_value: Some(new_value),
            actor_id: None,
        }
    }

    pub fn deleted(old_value: Value) -> Self {
        Self {
            state: FieldState::Deleted,
            old_value: Some(old_value),
            new_value: None,
            actor_id: None,
        }
    }
}

/// One side of a foreign-key change: the reference to `id` was added or severed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReferenceTransition {
    #[serde(rename = "AuditState")]
    pub state: AuditState,
    pub id: Value,
}

impl ReferenceTransition {
    pub fn added(id: Value) -> Self {
        Self {
            state: AuditState::ReferenceAdded,
            id,
        }
    }

    pub fn severed(id: Value) -> Self {
        Self {
            state: AuditState::ReferenceSevered,
            id,
        }
    }
}

/// A value stored under a name in an [`AuditNode`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AuditValue {
    /// Primary-key value, echoed verbatim
    Key(Value),
    Field(FieldAudit),
    Node(AuditNode),
    Nodes(Vec<AuditNode>),
    References(Vec<ReferenceTransition>),
}

impl AuditValue {
    pub fn as_key(&self) -> Option<&Value> {
        match self {
            Self::Key(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&FieldAudit> {
        match self {
            Self::Field(field) => Some(field),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&AuditNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_nodes(&self) -> Option<&[AuditNode]> {
        match self {
            Self::Nodes(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn as_references(&self) -> Option<&[ReferenceTransition]> {
        match self {
            Self::References(refs) => Some(refs),
            _ => None,
        }
    }
}

/// One node of an audit record
///
/// Entries keep insertion order: key parts first, then scalars, structural
/// values and relationships in the order the tracker reports them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AuditNode {
    state: Option<AuditState>,
    entries: Vec<(String, AuditValue)>,
}

impl AuditNode {
    /// Create a node for an entity or reference
    pub fn new(state: AuditState) -> Self {
        Self {
            state: Some(state),
            entries: Vec::new(),
        }
    }

    /// Create a node for a structural value (no state marker)
    pub fn structural() -> Self {
        Self::default()
    }

    /// Create a node echoing the given key parts
    pub fn with_key(state: AuditState, key: &[KeyPart]) -> Self {
        let mut node = Self::new(state);
        for part in key {
            node.insert(part.name.clone(), AuditValue::Key(part.value.clone()));
        }
        node
    }

    pub fn state(&self) -> Option<AuditState> {
        self.state
    }

    pub fn insert(&mut self, name: impl Into<String>, value: AuditValue) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&AuditValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(String, AuditValue)] {
        &self.entries
    }

    /// Field record stored under `name`
    pub fn field(&self, name: &str) -> Option<&FieldAudit> {
        self.get(name).and_then(AuditValue::as_field)
    }

    /// Child nodes of a relationship, whether single-valued or a collection
    pub fn children(&self, name: &str) -> Vec<&AuditNode> {
        match self.get(name) {
            Some(AuditValue::Node(node)) => vec![node],
            Some(AuditValue::Nodes(nodes)) => nodes.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Whether anything beyond key parts was recorded
    pub fn has_changes(&self) -> bool {
        self.entries
            .iter()
            .any(|(_, value)| !matches!(value, AuditValue::Key(_)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for AuditNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.entries.len() + usize::from(self.state.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(state) = &self.state {
            map.serialize_entry(AUDIT_STATE_KEY, state)?;
        }
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
