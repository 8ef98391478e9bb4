use crate::state::{PersistedState, SessionInfo};

// Placeholder credentials, kept verbatim from the deployed configuration.
// Replacing this with real authentication is a product decision, not a
// refactor.
const USERNAME: &str = "wemanity";
const PASSWORD: &str = "wemanity";

pub fn authenticate(username: &str, password: &str) -> bool {
    username == USERNAME && password == PASSWORD
}

pub fn login(state: &mut PersistedState, username: &str) {
    state.session = Some(SessionInfo {
        username: username.to_string(),
    });
}

pub fn logout(state: &mut PersistedState) {
    state.session = None;
}

#[cfg(test)]
mod tests {
    use super::{authenticate, login, logout};
    use crate::state::PersistedState;

    #[test]
    fn authenticate_accepts_only_the_fixed_pair() {
        assert!(authenticate("wemanity", "wemanity"));
        assert!(!authenticate("wemanity", "wrong"));
        assert!(!authenticate("alice", "wemanity"));
        assert!(!authenticate("", ""));
    }

    #[test]
    fn login_and_logout_toggle_the_session() {
        let mut state = PersistedState::new();
        assert!(!state.is_authenticated());

        login(&mut state, "alice");
        assert!(state.is_authenticated());
        assert_eq!(
            state.session.as_ref().map(|s| s.username.as_str()),
            Some("alice")
        );

        logout(&mut state);
        assert!(!state.is_authenticated());
    }
}
