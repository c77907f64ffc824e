use std::future::Future;
use std::path::Path;

use tracing::debug;

use crate::auth::credential::{AccessToken, Credential};
use crate::error::{DirectoryError, Result};
use crate::observability::metrics::get_metrics;

static OK_MSG: &'static str = "ok";
static ERROR_MSG: &'static str = "error";

/// External collaborator owning profiles, refresh and persistence.
pub trait TokenProvider {
    fn get_token(
        &self,
        profile_id: &str,
        location: Option<&Path>,
        persist: bool,
    ) -> impl Future<Output = Result<AccessToken>> + Send;
}

/// Turns a `Credential` into the bearer token for one logical operation.
///
/// Keeps no cache of its own; whatever caching exists lives in the provider.
#[derive(Debug, Clone)]
pub struct TokenResolver<P> {
    provider: P,
}

impl<P: TokenProvider + Sync> TokenResolver<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub async fn resolve(&self, credential: &Credential) -> Result<String> {
        let metrics = get_metrics().await;
        let mode = credential.mode();

        let resolved = match credential {
            // handed over verbatim, the service judges its validity
            Credential::BearerToken(token) => Ok(token.to_owned()),
            Credential::Profile { id, location, persist } => {
                debug!("resolving token for profile '{}' (persist: {})", id, persist);
                self.provider
                    .get_token(id, location.as_deref(), *persist)
                    .await
                    .map(|token| token.access_token)
                    .map_err(|err| match err {
                        DirectoryError::Auth { .. } => err,
                        other => DirectoryError::auth(format!("profile '{}': {}", id, other)),
                    })
            }
        };

        match &resolved {
            Ok(_) => metrics.token_resolutions.with_label_values(&[mode, OK_MSG]).inc(),
            Err(err) => {
                debug!("token resolution failed: {}", err);
                metrics.token_resolutions.with_label_values(&[mode, ERROR_MSG]).inc();
            }
        }
        resolved
    }
}
