use std::sync::{PoisonError, RwLock};

/// Supplies the id of the signed-in user. Identity issuance lives elsewhere.
pub trait Identity: Send + Sync {
    fn current_user_id(&self) -> Option<String>;
}

/// Holds the user id handed over by the authentication layer
#[derive(Default)]
pub struct Session {
    user_id: RwLock<Option<String>>,
}

impl Session {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id: RwLock::new(user_id),
        }
    }

    pub fn sign_in(&self, user_id: impl Into<String>) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = Some(user_id.into());
    }

    pub fn sign_out(&self) {
        *self.user_id.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl Identity for Session {
    fn current_user_id(&self) -> Option<String> {
        // An empty id is as good as no id
        self.user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .filter(|id| !id.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_and_out() {
        let session = Session::default();
        assert_eq!(session.current_user_id(), None);
        session.sign_in("alice");
        assert_eq!(session.current_user_id().as_deref(), Some("alice"));
        session.sign_out();
        assert_eq!(session.current_user_id(), None);
    }

    #[test]
    fn survives_a_panicked_writer() {
        let session = std::sync::Arc::new(Session::new(Some("alice".into())));
        let poisoner = session.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.user_id.write().unwrap();
            panic!("writer died");
        })
        .join();

        assert!(session.user_id.is_poisoned());
        assert_eq!(session.current_user_id().as_deref(), Some("alice"));
        session.sign_out();
        assert_eq!(session.current_user_id(), None);
    }

    #[test]
    fn blank_user_is_signed_out() {
        assert_eq!(Session::new(Some("  ".into())).current_user_id(), None);
    }
}
