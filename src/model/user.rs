use serde::{Deserialize, Serialize};

/// Read-only view of the user collaborator's documents. Consulted only for
/// the admin fan-out list; user lifecycle is owned elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: String,
}
