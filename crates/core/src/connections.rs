use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONNECTION_NAME: &str = "[unnamed]";

/// Connection descriptor as supplied by a caller or the config file.
///
/// Every field is optional so that incomplete descriptors can be represented
/// and rejected at registration time instead of at parse time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ConnectionSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl ConnectionSpec {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: Some(kind.into()),
            url: Some(url.into()),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        non_empty(self.name.as_deref()).unwrap_or(DEFAULT_CONNECTION_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub name: String,
    pub kind: String,
    pub url: String,
}

impl Connection {
    fn same_source(&self, name: &str, kind: &str) -> bool {
        self.name == name && self.kind == kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("connection `{name}` has no url")]
    MissingUrl { name: String },
    #[error("connection `{name}` has no kind")]
    MissingKind { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted(ConnectionId),
    Duplicate(ConnectionId),
}

impl AddOutcome {
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        match self {
            Self::Inserted(id) | Self::Duplicate(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivateOutcome {
    Activated(ConnectionId),
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ConnectionId, Connection>,
    active: Option<ConnectionId>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    #[must_use]
    pub fn active_id(&self) -> Option<&ConnectionId> {
        self.active.as_ref()
    }

    /// Validates `spec` and assigns it an id without storing it.
    ///
    /// A descriptor whose name and kind match a stored entry reuses that
    /// entry's id. Otherwise the id text is `name ++ kind`, suffixed with
    /// `#2`, `#3`, ... when a different descriptor already owns that text.
    pub fn candidate(&self, spec: &ConnectionSpec) -> Result<Connection, ConfigError> {
        let name = spec.display_name().to_string();
        let url = non_empty(spec.url.as_deref())
            .ok_or_else(|| ConfigError::MissingUrl { name: name.clone() })?
            .to_string();
        let kind = non_empty(spec.kind.as_deref())
            .ok_or_else(|| ConfigError::MissingKind { name: name.clone() })?
            .to_string();

        let id = match self.find_same_source(&name, &kind) {
            Some(existing) => existing.id.clone(),
            None => self.unused_id(&name, &kind),
        };

        Ok(Connection {
            id,
            name,
            kind,
            url,
        })
    }

    #[must_use]
    pub fn contains_source(&self, connection: &Connection) -> bool {
        self.find_same_source(&connection.name, &connection.kind)
            .is_some()
    }

    /// Stores `connection`, replacing any entry with the same id.
    pub fn insert(&mut self, connection: Connection) {
        if self.active.is_none() {
            self.active = Some(connection.id.clone());
        }
        self.connections.insert(connection.id.clone(), connection);
    }

    pub fn activate_smallest(&mut self) {
        self.active = self.connections.keys().min().cloned();
    }

    pub fn set_active(&mut self, id: &str) -> ActivateOutcome {
        if id.trim().is_empty() {
            tracing::warn!("ignoring request to activate an empty connection id");
            return ActivateOutcome::Ignored;
        }

        let id = ConnectionId::from(id);
        if !self.connections.contains_key(&id) {
            tracing::warn!(connection = %id, "ignoring request to activate unknown connection");
            return ActivateOutcome::Ignored;
        }

        self.active = Some(id.clone());
        ActivateOutcome::Activated(id)
    }

    #[must_use]
    pub fn get(&self, id: &ConnectionId) -> Option<&Connection> {
        self.connections.get(id)
    }

    /// Looks up `id`, or the active connection when `id` is `None`.
    #[must_use]
    pub fn details(&self, id: Option<&str>) -> Option<&Connection> {
        match id {
            Some(id) => self.connections.get(&ConnectionId::from(id)),
            None => self
                .active
                .as_ref()
                .and_then(|active| self.connections.get(active)),
        }
    }

    #[must_use]
    pub fn list(&self) -> Vec<&Connection> {
        let mut connections = self.connections.values().collect::<Vec<_>>();
        connections.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        connections
    }

    fn find_same_source(&self, name: &str, kind: &str) -> Option<&Connection> {
        self.connections
            .values()
            .find(|connection| connection.same_source(name, kind))
    }

    fn unused_id(&self, name: &str, kind: &str) -> ConnectionId {
        let base = format!("{name}{kind}");
        let mut id = ConnectionId(base.clone());
        let mut suffix = 2_u32;
        while self.connections.contains_key(&id) {
            id = ConnectionId(format!("{base}#{suffix}"));
            suffix += 1;
        }
        id
    }
}

/// Blank values count as missing; anything else is kept verbatim.
fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|raw| !raw.trim().is_empty())
}
