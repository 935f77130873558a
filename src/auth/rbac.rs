/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Roles form a strict hierarchy. A route guarded by a role admits that role
 * and every role ranked above it.
 */

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

/// Role carried in a bearer token, lowest privilege first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    /// A school contact; may only reach public endpoints.
    School,
    Instructor,
    /// Back-office staff with read access.
    Staff,
    /// Back-office administrator with write access.
    Admin,
    SuperAdmin,
}

impl Role {
    /// True when this role ranks at or above `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self >= required
    }

    pub fn description(self) -> &'static str {
        match self {
            Role::School => "School contact with access to public endpoints",
            Role::Instructor => "Instructor with access to their own schedule",
            Role::Staff => "Back-office staff with read access",
            Role::Admin => "Administrator with full write access",
            Role::SuperAdmin => "Operator with unrestricted access",
        }
    }

    /// Every role admitted by a guard on `required`.
    pub fn admitted_by(required: Role) -> Vec<Role> {
        Role::iter().filter(|r| r.satisfies(required)).collect()
    }
}
