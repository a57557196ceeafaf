//! Session persistence as a JSON file under the user's config directory.

use std::path::PathBuf;

use tracing::debug;
use tutanota_core::{Session, SessionStore};

const SESSION_FILE: &str = "session.json";
const CONFIG_DIR: &str = "tutanota-cli";

/// Environment switch disabling both reading and writing of the session
/// file. Accepts `1`, `true` or `yes`.
pub const NO_PERSISTENCE_ENV: &str = "TUTANOTA_NO_SESSION_PERSISTENCE";

/// Whether persistence is disabled by the environment.
pub fn persistence_disabled() -> bool {
    std::env::var(NO_PERSISTENCE_ENV)
        .map(|v| {
            let v = v.to_lowercase();
            v == "1" || v == "true" || v == "yes"
        })
        .unwrap_or(false)
}

/// Stores the session at
/// `${XDG_CONFIG_HOME:-$HOME/.config}/tutanota-cli/session.json` with
/// owner-only permissions.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// A store at the default config location.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            path: config_dir()?.join(SESSION_FILE),
        })
    }

    /// The file the session lives in.
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<Session> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                debug!(error = %e, path = %self.path.display(), "ignoring unparsable session file");
                None
            }
        }
    }

    fn save(&self, session: &Session) -> std::io::Result<()> {
        let dir = self
            .path
            .parent()
            .expect("session path always has a parent");
        std::fs::create_dir_all(dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
        }

        let content = serde_json::to_string_pretty(session)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

fn config_dir() -> std::io::Result<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            return Ok(PathBuf::from(xdg).join(CONFIG_DIR));
        }
    }
    let home = std::env::var("HOME").map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "neither XDG_CONFIG_HOME nor HOME is set",
        )
    })?;
    Ok(PathBuf::from(home).join(".config").join(CONFIG_DIR))
}
