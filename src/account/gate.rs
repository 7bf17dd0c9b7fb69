//! Access-code gate in front of account creation.

use std::sync::Arc;
use tracing::{debug, instrument};

use super::error::AccountError;
use super::ports::{AccessCodeError, AccessCodeStore};

#[derive(Clone)]
pub struct AccessControlGate {
    restricted: bool,
    store: Arc<dyn AccessCodeStore>,
}

impl AccessControlGate {
    #[must_use]
    pub fn new(restricted: bool, store: Arc<dyn AccessCodeStore>) -> Self {
        Self { restricted, store }
    }

    #[must_use]
    pub fn is_restricted(&self) -> bool {
        self.restricted
    }

    /// Redeem `code` when the deployment is restricted.
    ///
    /// Unrestricted deployments never touch the store. A rejected code leaves
    /// no trace: the caller must abort creation on any error.
    ///
    /// # Errors
    /// `Validation` for a missing, unknown, expired or used code; `Internal`
    /// when the store itself fails.
    #[instrument(skip_all, fields(restricted = self.restricted))]
    pub async fn validate_and_consume(&self, code: Option<&str>) -> Result<(), AccountError> {
        if !self.restricted {
            return Ok(());
        }

        let Some(code) = code.map(str::trim).filter(|code| !code.is_empty()) else {
            debug!("No access code supplied");
            return Err(AccessCodeError::Missing.into());
        };

        self.store.validate_and_use(code).await.map_err(|err| {
            debug!("Access code rejected: {err}");
            AccountError::from(err)
        })
    }
}

impl std::fmt::Debug for AccessControlGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessControlGate")
            .field("restricted", &self.restricted)
            .finish_non_exhaustive()
    }
}
