use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A user project. Only the bounded subset fed to DRAFTING matters here;
/// project CRUD lives outside this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}
