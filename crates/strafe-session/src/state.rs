//! Session state machine values and load results.

/// Where this process is in the game lifecycle.
///
/// `None → Joining|Creating → ChangingMap → Playing → ChangingMap → … →
/// Unloading → None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not in a game.
    #[default]
    None,
    /// In a menu/idle scene, not in a game.
    Idle,
    /// Map and gamemode loaded, simulation running.
    Playing,
    /// Host: building a new session.
    Creating,
    /// Client: connecting and handshaking.
    Joining,
    /// Tearing down the current game.
    Unloading,
    /// Loading a map (first load or a switch).
    ChangingMap,
}

impl SessionState {
    /// Returns `true` while a join, create or map change is in flight.
    pub fn is_loading(self) -> bool {
        matches!(
            self,
            SessionState::Creating | SessionState::Joining | SessionState::ChangingMap
        )
    }
}

/// Terminal result of one load attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The request was refused (wrong state or role); nothing happened.
    None,
    /// [`SessionLoader::cancel`](crate::SessionLoader::cancel) was observed.
    Cancelled,
    /// The transport could not connect to the host.
    FailedToConnect,
    /// File synchronisation with the host failed.
    FailedToSync,
    /// The host never answered the session-parameters request.
    MissingMapChange,
    /// The map could not be fetched or loaded.
    FailedToLoadMap,
    /// The gamemode could not be loaded.
    FailedToLoadGamemode,
    /// Required backfill data was missing.
    MissingBackfill,
    /// The session is playing.
    Success,
}

impl LoadOutcome {
    /// Returns `true` for [`LoadOutcome::Success`].
    pub fn is_success(self) -> bool {
        self == LoadOutcome::Success
    }

    /// Returns `true` for every step failure (not success, refusal or cancel).
    pub fn is_failure(self) -> bool {
        !matches!(
            self,
            LoadOutcome::None | LoadOutcome::Cancelled | LoadOutcome::Success
        )
    }
}

/// Which side of the connection this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Authoritative host.
    Host,
    /// Connected client.
    Client,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_classification() {
        assert!(LoadOutcome::Success.is_success());
        assert!(!LoadOutcome::Success.is_failure());
        assert!(!LoadOutcome::Cancelled.is_failure());
        assert!(!LoadOutcome::None.is_failure());
        for failed in [
            LoadOutcome::FailedToConnect,
            LoadOutcome::FailedToSync,
            LoadOutcome::MissingMapChange,
            LoadOutcome::FailedToLoadMap,
            LoadOutcome::FailedToLoadGamemode,
            LoadOutcome::MissingBackfill,
        ] {
            assert!(failed.is_failure(), "{failed:?} should be a failure");
        }
    }

    #[test]
    fn test_loading_states() {
        assert!(SessionState::Joining.is_loading());
        assert!(SessionState::ChangingMap.is_loading());
        assert!(!SessionState::Playing.is_loading());
        assert!(!SessionState::None.is_loading());
    }
}
