//! Actor and tenant context — who is acting, under which organisation,
//! hospital and department.
//!
//! Authentication and RBAC live outside the index; collaborating systems
//! derive the context and hand it in with every write.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The organisation/hospital/department scope attached to an identity or an
/// action. Each level is independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantScope {
  pub organization_id: Option<Uuid>,
  pub hospital_id:     Option<Uuid>,
  pub department_id:   Option<Uuid>,
}

/// The acting caller, as derived by the surrounding platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorContext {
  pub actor_id: Uuid,
  /// Ambient scope the actor is operating under.
  pub scope:    TenantScope,
  /// Departments the actor may act for; consulted only by the merge
  /// department tie-break.
  pub permitted_departments: Vec<Uuid>,
}

impl ActorContext {
  /// A context with no ambient scope and no permitted departments.
  pub fn bare(actor_id: Uuid) -> Self {
    Self {
      actor_id,
      scope: TenantScope::default(),
      permitted_departments: Vec::new(),
    }
  }
}
