// SPDX-FileCopyrightText: 2026 Wabridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Process-wide session state.
//!
//! A [`Session`] is a cheap cloneable handle around a `watch` channel holding
//! the current [`SessionSnapshot`]. Readers get consistent snapshots; writes
//! are `pub(crate)` and only issued by the pairing listener and the lifecycle
//! controller.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;
use wabridge_core::{DeviceIdentity, PairingState};

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: PairingState,
    /// Present once paired. Kept across `Disconnected`.
    pub identity: Option<DeviceIdentity>,
}

impl SessionSnapshot {
    pub fn unpaired() -> Self {
        Self {
            state: PairingState::Unpaired,
            identity: None,
        }
    }
}

/// Shared handle to the session state.
#[derive(Debug, Clone)]
pub struct Session {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh, unpaired session.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionSnapshot::unpaired());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn state(&self) -> PairingState {
        self.tx.borrow().state
    }

    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.tx.borrow().identity.clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Enter `PairingInProgress`, dropping any previous identity.
    pub(crate) fn begin_pairing(&self) {
        self.replace(SessionSnapshot {
            state: PairingState::PairingInProgress,
            identity: None,
        });
    }

    /// Record a paired identity, directly as `Connected` when the link is up.
    pub(crate) fn mark_paired(&self, identity: DeviceIdentity, connected: bool) {
        let state = if connected {
            PairingState::Connected
        } else {
            PairingState::Paired
        };
        self.replace(SessionSnapshot {
            state,
            identity: Some(identity),
        });
    }

    /// Move to `Connected`. Ignored without a known identity.
    pub(crate) fn mark_connected(&self) -> bool {
        self.transition(|s| {
            if s.identity.is_some() {
                s.state = PairingState::Connected;
            }
        })
    }

    /// Move to `Disconnected`, keeping the identity. Ignored while unpaired
    /// or while a pairing attempt owns the state.
    pub(crate) fn mark_disconnected(&self) -> bool {
        self.transition(|s| {
            if s.identity.is_some() {
                s.state = PairingState::Disconnected;
            }
        })
    }

    /// Drop the identity and return to `Unpaired`.
    pub(crate) fn reset(&self) {
        self.replace(SessionSnapshot::unpaired());
    }

    /// Revert an unresolved pairing attempt to `Unpaired`.
    pub(crate) fn abandon_pairing(&self) -> bool {
        self.transition(|s| {
            if s.state == PairingState::PairingInProgress {
                *s = SessionSnapshot::unpaired();
            }
        })
    }

    fn replace(&self, next: SessionSnapshot) {
        self.transition(|s| *s = next);
    }

    /// Apply `f` atomically; returns whether the snapshot changed.
    fn transition(&self, f: impl FnOnce(&mut SessionSnapshot)) -> bool {
        self.tx.send_if_modified(|snapshot| {
            let before = snapshot.clone();
            f(snapshot);
            let changed = *snapshot != before;
            if changed {
                debug!(from = %before.state, to = %snapshot.state, "session state changed");
            }
            changed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::new("15551234567:3@s.whatsapp.net")
    }

    #[test]
    fn connected_requires_identity() {
        let session = Session::new();
        assert!(!session.mark_connected());
        assert_eq!(session.state(), PairingState::Unpaired);

        session.mark_paired(identity(), false);
        assert_eq!(session.state(), PairingState::Paired);
        assert!(session.mark_connected());
        assert_eq!(session.state(), PairingState::Connected);
    }

    #[test]
    fn disconnect_keeps_identity() {
        let session = Session::new();
        session.mark_paired(identity(), true);
        session.mark_disconnected();
        let snap = session.snapshot();
        assert_eq!(snap.state, PairingState::Disconnected);
        assert_eq!(snap.identity, Some(identity()));
    }

    #[test]
    fn abandon_only_affects_pairing_attempts() {
        let session = Session::new();
        session.mark_paired(identity(), true);
        assert!(!session.abandon_pairing());
        assert_eq!(session.state(), PairingState::Connected);

        session.begin_pairing();
        assert!(session.identity().is_none());
        assert!(session.abandon_pairing());
        assert_eq!(session.state(), PairingState::Unpaired);
    }

    #[tokio::test]
    async fn subscribers_observe_transitions() {
        let session = Session::new();
        let mut rx = session.subscribe();
        session.begin_pairing();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().state, PairingState::PairingInProgress);
    }
}
