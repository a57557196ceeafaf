use serde::{Deserialize, Serialize};

/// A logged-in session, the only piece of state that survives the process.
///
/// Persistence itself is a collaborator concern (the CLI keeps this as a
/// JSON file); the core only defines the shape and the store interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Service base URL the session was created against.
    pub base_url: String,
    /// Bearer token for the `accessToken` header.
    pub access_token: String,
    /// The user's element id.
    pub user_id: String,
    /// `[listId, elementId]` pair derived from the access token; identifies
    /// the session entity server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<(String, String)>,
}

/// Where sessions are persisted between runs.
pub trait SessionStore {
    /// Read the stored session, if any. Unreadable or unparsable state
    /// counts as absent.
    fn load(&self) -> Option<Session>;

    /// Persist a session.
    fn save(&self, session: &Session) -> std::io::Result<()>;

    /// Forget the stored session. Succeeds when nothing was stored.
    fn clear(&self) -> std::io::Result<()>;
}

/// A store that never persists anything. Used when persistence is disabled
/// by the environment.
pub struct NoopSessionStore;

impl SessionStore for NoopSessionStore {
    fn load(&self) -> Option<Session> {
        None
    }

    fn save(&self, _session: &Session) -> std::io::Result<()> {
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_and_tuple_session_id() {
        let session = Session {
            base_url: "https://app.tuta.com".into(),
            access_token: "token".into(),
            user_id: "user".into(),
            session_id: Some(("list".into(), "element".into())),
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["baseUrl"], "https://app.tuta.com");
        assert_eq!(json["sessionId"], serde_json::json!(["list", "element"]));
    }

    #[test]
    fn session_id_is_optional() {
        let parsed: Session = serde_json::from_str(
            r#"{"baseUrl":"https://x","accessToken":"t","userId":"u"}"#,
        )
        .unwrap();
        assert!(parsed.session_id.is_none());
    }
}
