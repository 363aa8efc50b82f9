//! # Appointment Lifecycle Rules
//!
//! Status transitions, barber assignment and role checks. The database layer
//! runs these inside its transactions; nothing here touches storage.
//!
//! ## State Machine
//! ```text
//!   pending ──────► confirmed
//!      │  \             │   \
//!      │   \            │    ▼
//!      │    └────────────────► completed   (terminal)
//!      ▼                ▼
//!   cancelled ◄─────────┘                  (terminal)
//! ```
//!
//! Setting the current status again is accepted and changes nothing.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{AppointmentStatus, Role, User};

// =============================================================================
// Actor
// =============================================================================

/// The authenticated user performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: i64, role: Role) -> Self {
        Actor { user_id, role }
    }

    /// Fails unless the actor is a Boss.
    pub fn require_boss(&self, action: &str) -> CoreResult<()> {
        if !self.role.is_boss() {
            return Err(CoreError::PermissionDenied(format!(
                "only the Boss can {}",
                action
            )));
        }
        Ok(())
    }

    /// Fails unless the actor is a Boss or Staff member.
    pub fn require_staff(&self, action: &str) -> CoreResult<()> {
        if !self.role.can_serve() {
            return Err(CoreError::PermissionDenied(format!(
                "only Boss or Staff can {}",
                action
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Status Transitions
// =============================================================================

/// Whether `from → to` is an edge of the lifecycle graph.
pub fn can_transition(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;

    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Completed)
            | (Confirmed, Completed)
            | (Pending, Cancelled)
            | (Confirmed, Cancelled)
    )
}

/// Checks a requested status change.
///
/// ## Returns
/// `true` if the status actually changes, `false` for a same-status no-op.
pub fn check_transition(from: AppointmentStatus, to: AppointmentStatus) -> CoreResult<bool> {
    if from == to {
        return Ok(false);
    }
    if !can_transition(from, to) {
        return Err(CoreError::InvalidStatusTransition { from, to });
    }
    Ok(true)
}

// =============================================================================
// Barber Assignment
// =============================================================================

/// A requested change to an appointment's barber.
///
/// Mirrors the request body: field absent, `null`, or an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarberChange {
    #[default]
    Keep,
    Unassign,
    Assign(i64),
}

impl From<Option<Option<i64>>> for BarberChange {
    fn from(value: Option<Option<i64>>) -> Self {
        match value {
            None => BarberChange::Keep,
            Some(None) => BarberChange::Unassign,
            Some(Some(id)) => BarberChange::Assign(id),
        }
    }
}

impl BarberChange {
    pub fn is_keep(&self) -> bool {
        matches!(self, BarberChange::Keep)
    }

    /// Any change to the barber requires a Boss or Staff actor.
    pub fn authorize(&self, actor: &Actor) -> CoreResult<()> {
        match self {
            BarberChange::Keep => Ok(()),
            BarberChange::Unassign => actor.require_staff("remove the barber"),
            BarberChange::Assign(_) => actor.require_staff("assign a barber"),
        }
    }
}

/// A user can be a barber if they are an active Boss or Staff member.
pub fn ensure_can_be_barber(user: &User) -> CoreResult<()> {
    if !user.can_serve() {
        return Err(ValidationError::NotAllowed {
            field: "barberId".to_string(),
            allowed: vec!["active Boss".to_string(), "active Staff".to_string()],
        }
        .into());
    }
    Ok(())
}

/// The barber an appointment ends up with after a status change.
///
/// Completing an appointment that has no barber assigns the acting user,
/// provided they are Boss or Staff. Every other case keeps `current`.
pub fn barber_after_transition(
    current: Option<i64>,
    new_status: AppointmentStatus,
    status_changed: bool,
    actor: &Actor,
) -> Option<i64> {
    if status_changed
        && new_status == AppointmentStatus::Completed
        && current.is_none()
        && actor.role.can_serve()
    {
        return Some(actor.user_id);
    }
    current
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn test_allowed_transitions() {
        assert!(check_transition(Pending, Confirmed).unwrap());
        assert!(check_transition(Pending, Completed).unwrap());
        assert!(check_transition(Confirmed, Completed).unwrap());
        assert!(check_transition(Pending, Cancelled).unwrap());
        assert!(check_transition(Confirmed, Cancelled).unwrap());
    }

    #[test]
    fn test_terminal_states() {
        for to in AppointmentStatus::ALL {
            if to != Completed {
                assert!(check_transition(Completed, to).is_err());
            }
            if to != Cancelled {
                assert!(check_transition(Cancelled, to).is_err());
            }
        }
        assert!(check_transition(Confirmed, Pending).is_err());
    }

    #[test]
    fn test_same_status_is_noop() {
        for status in AppointmentStatus::ALL {
            assert!(!check_transition(status, status).unwrap());
        }
    }

    #[test]
    fn test_completion_assigns_staff_actor() {
        let staff = Actor::new(7, Role::Staff);
        assert_eq!(barber_after_transition(None, Completed, true, &staff), Some(7));
        // Existing barber is kept.
        assert_eq!(
            barber_after_transition(Some(3), Completed, true, &staff),
            Some(3)
        );
        // Only completion assigns.
        assert_eq!(barber_after_transition(None, Confirmed, true, &staff), None);
        // A no-op completion does not assign.
        assert_eq!(barber_after_transition(None, Completed, false, &staff), None);
    }

    #[test]
    fn test_completion_by_client_does_not_assign() {
        let client = Actor::new(9, Role::Client);
        assert_eq!(barber_after_transition(None, Completed, true, &client), None);
    }

    #[test]
    fn test_role_checks() {
        let boss = Actor::new(1, Role::Boss);
        let staff = Actor::new(2, Role::Staff);
        let client = Actor::new(3, Role::Client);

        assert!(boss.require_boss("delete appointments").is_ok());
        assert!(matches!(
            staff.require_boss("delete appointments"),
            Err(CoreError::PermissionDenied(_))
        ));
        assert!(staff.require_staff("edit appointments").is_ok());
        assert!(client.require_staff("edit appointments").is_err());
    }

    #[test]
    fn test_barber_change() {
        assert_eq!(BarberChange::from(None), BarberChange::Keep);
        assert_eq!(BarberChange::from(Some(None)), BarberChange::Unassign);
        assert_eq!(BarberChange::from(Some(Some(4))), BarberChange::Assign(4));

        let client = Actor::new(3, Role::Client);
        assert!(BarberChange::Keep.authorize(&client).is_ok());
        assert!(BarberChange::Unassign.authorize(&client).is_err());
        assert!(BarberChange::Assign(4).authorize(&client).is_err());
    }
}
