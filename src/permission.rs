//! Motion permission gate that sits in front of the session start.

use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::info;

use crate::input::MotionSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum_macros::Display)]
pub enum Permission {
    Granted,
    Declined,
}

#[derive(Debug)]
pub enum PermissionGate {
    /// Motion is unsupported or needs no approval.
    NotRequired,
    /// Waiting for the user to choose.
    Prompt,
    /// Request sent, answer not yet in. Input keeps flowing meanwhile.
    Pending(Receiver<bool>),
    Resolved(Permission),
}

impl PermissionGate {
    pub fn for_source(source: &dyn MotionSource) -> Self {
        if source.is_supported() && source.needs_permission() {
            PermissionGate::Prompt
        } else {
            PermissionGate::NotRequired
        }
    }

    /// Whether the game may start.
    pub fn is_open(&self) -> bool {
        matches!(self, PermissionGate::NotRequired | PermissionGate::Resolved(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, PermissionGate::Pending(_))
    }

    /// Sends the request. Only valid from `Prompt`.
    pub fn request(&mut self, source: &mut dyn MotionSource) {
        if matches!(self, PermissionGate::Prompt) {
            *self = PermissionGate::Pending(source.request_permission());
        }
    }

    /// Gives up on motion and continues with the keyboard.
    /// Returns the resolution when this call closed the gate.
    pub fn decline(&mut self) -> Option<Permission> {
        match self {
            PermissionGate::Prompt | PermissionGate::Pending(_) => {
                info!("continuing without motion");
                *self = PermissionGate::Resolved(Permission::Declined);
                Some(Permission::Declined)
            }
            _ => None,
        }
    }

    /// Checks a pending request without blocking. Returns the resolution
    /// exactly once, on the call that observes it.
    pub fn poll(&mut self) -> Option<Permission> {
        let PermissionGate::Pending(rx) = self else {
            return None;
        };

        let permission = match rx.try_recv() {
            Ok(true) => Permission::Granted,
            Ok(false) | Err(TryRecvError::Disconnected) => Permission::Declined,
            Err(TryRecvError::Empty) => return None,
        };
        info!(%permission, "motion permission resolved");
        *self = PermissionGate::Resolved(permission);
        Some(permission)
    }
}
