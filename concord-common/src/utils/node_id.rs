use serde::{Deserialize, Serialize};

/// Stable identifier of a participant, unique within a network.
///
/// `NodeId` is a lightweight wrapper around `String`, designed to:
/// - Keep participant names apart from payload strings in APIs
/// - Serve as an ordered map key for stake and vote tables
/// - Print directly in log lines
#[derive(Default, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// Identifier used for the `index`-th participant of a sized network.
    pub fn numbered(index: usize) -> Self {
        NodeId(format!("node-{}", index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    /// Example:
    /// ```rust
    /// use concord_common::NodeId;
    /// let id: NodeId = "Alice".into();
    /// assert_eq!(id.as_str(), "Alice");
    /// ```
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}
