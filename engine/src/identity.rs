//! Authentication state.

use sqlcoach_services::ServiceError;
use sqlcoach_types::{Identity, IdentityPayload, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IdentityTicket {
    pub generation: u64,
}

#[derive(Debug, Default)]
pub struct IdentityState {
    identity: Identity,
    loading: bool,
    generation: u64,
}

/// Derive an identity from a lookup payload.
///
/// Authenticated when the payload names a user or says so explicitly. An
/// authenticated payload without a recognised role gets [`Role::BASELINE`].
#[must_use]
pub fn classify(payload: &IdentityPayload) -> Identity {
    let username = payload
        .username
        .as_deref()
        .filter(|name| !name.is_empty())
        .map(str::to_string);
    let authenticated = username.is_some() || payload.authenticated == Some(true);
    if !authenticated {
        return Identity::SignedOut;
    }

    let role = payload.role.as_deref().and_then(Role::parse).unwrap_or_else(|| {
        tracing::warn!(
            role = payload.role.as_deref().unwrap_or("<missing>"),
            "Identity payload has no recognised role; assuming {}",
            Role::BASELINE
        );
        Role::BASELINE
    });
    Identity::SignedIn { username, role }
}

impl IdentityState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub(crate) fn refresh(&mut self) -> IdentityTicket {
        self.generation += 1;
        self.loading = true;
        IdentityTicket {
            generation: self.generation,
        }
    }

    /// Explicit override. Any refresh still in flight is discarded on arrival.
    pub fn set_auth(&mut self, identity: Identity) {
        self.generation += 1;
        self.loading = false;
        self.identity = identity;
    }

    pub(crate) fn apply_refresh(
        &mut self,
        ticket: IdentityTicket,
        result: Result<IdentityPayload, ServiceError>,
    ) -> bool {
        if ticket.generation != self.generation {
            tracing::debug!(generation = ticket.generation, "Discarding stale identity lookup");
            return false;
        }
        self.loading = false;
        self.identity = match result {
            Ok(payload) => classify(&payload),
            Err(e) => {
                tracing::debug!("Identity lookup failed: {e}");
                Identity::SignedOut
            }
        };
        match &self.identity {
            Identity::SignedIn { username, role } => {
                tracing::info!(username = username.as_deref().unwrap_or(""), %role, "Signed in");
            }
            Identity::SignedOut => tracing::info!("Signed out"),
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(
        authenticated: Option<bool>,
        username: Option<&str>,
        role: Option<&str>,
    ) -> IdentityPayload {
        IdentityPayload {
            authenticated,
            username: username.map(str::to_string),
            role: role.map(str::to_string),
        }
    }

    #[test]
    fn username_alone_means_signed_in_student() {
        let identity = classify(&payload(None, Some("ada"), None));
        assert_eq!(identity, Identity::signed_in("ada", Role::Student));
    }

    #[test]
    fn explicit_flag_without_username() {
        let identity = classify(&payload(Some(true), None, Some("instructor")));
        assert_eq!(
            identity,
            Identity::SignedIn {
                username: None,
                role: Role::Instructor
            }
        );
    }

    #[test]
    fn anonymous_payload_is_signed_out() {
        assert_eq!(classify(&payload(Some(false), None, None)), Identity::SignedOut);
        assert_eq!(classify(&payload(None, Some(""), Some("student"))), Identity::SignedOut);
    }

    #[test]
    fn any_non_empty_username_signs_in() {
        let identity = classify(&payload(None, Some("  "), None));
        assert_eq!(identity, Identity::signed_in("  ", Role::Student));
    }

    #[test]
    fn unknown_role_falls_back_to_baseline() {
        let identity = classify(&payload(Some(true), Some("ada"), Some("admin")));
        assert_eq!(identity.role(), Some(Role::Student));
    }

    #[test]
    fn failure_signs_out() {
        let mut state = IdentityState::new();
        state.set_auth(Identity::signed_in("ada", Role::Student));
        let ticket = state.refresh();
        assert!(state.is_loading());
        assert!(state.apply_refresh(ticket, Err(ServiceError::NotFound)));
        assert_eq!(state.identity(), &Identity::SignedOut);
        assert!(!state.is_loading());
    }

    #[test]
    fn set_auth_wins_over_in_flight_refresh() {
        let mut state = IdentityState::new();
        let ticket = state.refresh();
        state.set_auth(Identity::SignedOut);
        assert!(!state.apply_refresh(ticket, Ok(payload(Some(true), Some("ada"), None))));
        assert_eq!(state.identity(), &Identity::SignedOut);
    }

    #[test]
    fn newest_refresh_wins() {
        let mut state = IdentityState::new();
        let first = state.refresh();
        let second = state.refresh();
        assert!(state.apply_refresh(second, Ok(payload(None, Some("grace"), None))));
        assert!(!state.apply_refresh(first, Ok(payload(None, Some("ada"), None))));
        assert_eq!(state.identity().username(), Some("grace"));
    }
}
