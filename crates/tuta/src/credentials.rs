//! Credential resolution: environment first, interactive prompt second.

use std::cell::RefCell;

use inquire::{Password, Text};
use tutanota_core::{ClientError, auth::CredentialSource};

const EMAIL_ENV: &str = "TUTANOTA_EMAIL";
const PASSWORD_ENV: &str = "TUTANOTA_PASSWORD";

/// Reads `TUTANOTA_EMAIL` / `TUTANOTA_PASSWORD`, prompting for whatever is
/// missing. Prompted values are cached so a login followed by an unlock
/// only asks once.
pub struct EnvCredentials {
    email: RefCell<Option<String>>,
    password: RefCell<Option<String>>,
}

impl EnvCredentials {
    pub fn new() -> Self {
        Self {
            email: RefCell::new(non_empty_env(EMAIL_ENV)),
            password: RefCell::new(non_empty_env(PASSWORD_ENV)),
        }
    }
}

impl CredentialSource for EnvCredentials {
    fn email(&self) -> Result<String, ClientError> {
        if let Some(email) = self.email.borrow().clone() {
            return Ok(email);
        }
        let email = Text::new("Email")
            .prompt()
            .map_err(|e| ClientError::Other(e.to_string()))?;
        *self.email.borrow_mut() = Some(email.clone());
        Ok(email)
    }

    fn password(&self) -> Result<String, ClientError> {
        if let Some(password) = self.password.borrow().clone() {
            return Ok(password);
        }
        let password = Password::new("Password")
            .without_confirmation()
            .prompt()
            .map_err(|e| ClientError::Other(e.to_string()))?;
        *self.password.borrow_mut() = Some(password.clone());
        Ok(password)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
