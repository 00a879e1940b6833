// Copyright (c) 2026 walkware
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/walkware/stridekeeper-rs

//! Activation gate - permission and source-presence checks

use serde::{Deserialize, Serialize};

/// Outcome of the external authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permission {
    Unknown,
    Granted,
    Denied,
}

/// What the session is allowed to do, derived from permission and
/// source presence. Only `Active` lets the feed attach; the other
/// states are display-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationState {
    Active,
    AwaitingPermission,
    PermissionDenied,
    SensorAbsent,
}

impl ActivationState {
    pub fn is_active(&self) -> bool {
        matches!(self, ActivationState::Active)
    }
}

impl std::fmt::Display for ActivationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivationState::Active => write!(f, "active"),
            ActivationState::AwaitingPermission => write!(f, "awaiting permission"),
            ActivationState::PermissionDenied => write!(f, "permission denied"),
            ActivationState::SensorAbsent => write!(f, "step counter not available on this device"),
        }
    }
}

/// Decides whether the feed may attach. Permission is reported by an
/// external authorization flow; presence is a permanent property of the
/// device. Neither is retried automatically.
#[derive(Debug, Clone, Copy)]
pub struct ActivationGate {
    permission: Permission,
    source_present: bool,
}

impl ActivationGate {
    pub fn new(permission: Permission, source_present: bool) -> Self {
        Self {
            permission,
            source_present,
        }
    }

    /// Record the result of a re-triggered authorization prompt
    pub fn set_permission(&mut self, permission: Permission) {
        self.permission = permission;
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    pub fn state(&self) -> ActivationState {
        if !self.source_present {
            return ActivationState::SensorAbsent;
        }
        match self.permission {
            Permission::Granted => ActivationState::Active,
            Permission::Unknown => ActivationState::AwaitingPermission,
            Permission::Denied => ActivationState::PermissionDenied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_source_wins_over_grant() {
        let gate = ActivationGate::new(Permission::Granted, false);
        assert_eq!(gate.state(), ActivationState::SensorAbsent);
    }

    #[test]
    fn test_grant_activates() {
        let mut gate = ActivationGate::new(Permission::Unknown, true);
        assert_eq!(gate.state(), ActivationState::AwaitingPermission);

        gate.set_permission(Permission::Granted);
        assert!(gate.state().is_active());
    }

    #[test]
    fn test_denied_is_display_only_state() {
        let gate = ActivationGate::new(Permission::Denied, true);
        assert_eq!(gate.state(), ActivationState::PermissionDenied);
        assert!(!gate.state().is_active());
    }
}
