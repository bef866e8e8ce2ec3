use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
    Record,
    Table,
    History,
    Scratch,
    /// Plain container such as a database folder.
    #[serde(rename = "")]
    Group,
}

/// One node of the schema/history tree a backend builds for a connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LayoutNode {
    pub name: String,
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub database: String,
    pub kind: LayoutKind,
    #[serde(default)]
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: LayoutKind) -> Self {
        Self {
            name: name.into(),
            schema: String::new(),
            database: String::new(),
            kind,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<LayoutNode>) -> Self {
        self.children = children;
        self
    }
}

pub fn parse_layout(raw: &str) -> Result<Vec<LayoutNode>, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw)
}

pub fn encode_layout(nodes: &[LayoutNode]) -> Result<String, serde_json::Error> {
    serde_json::to_string(nodes)
}
