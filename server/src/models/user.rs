use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Parent,
    Tutor,
    Admin,
}

/// Identity record owned by the profile service. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub role: Role,
    pub display_name: String,
    /// Set on student profiles that are managed by a parent account.
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this profile may act on the ledger account / bookings of `student`.
    pub fn manages(&self, student: &Profile) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Student => self.id == student.id,
            Role::Parent => student.parent_id == Some(self.id),
            Role::Tutor => false,
        }
    }
}
