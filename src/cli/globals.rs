use crate::account::password::PasswordPolicy;
use secrecy::SecretString;

/// Runtime settings shared by the server and its handlers.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub db_password: Option<SecretString>,
    pub restricted_environment: bool,
    pub require_confirmed_email: bool,
    pub session_ttl_seconds: i64,
    pub secure_cookies: bool,
    pub password_policy: PasswordPolicy,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            db_password: None,
            restricted_environment: false,
            require_confirmed_email: true,
            session_ttl_seconds: 604_800,
            secure_cookies: false,
            password_policy: PasswordPolicy::default(),
        }
    }
}
