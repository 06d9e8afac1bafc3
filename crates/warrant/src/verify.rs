//! Token verification.

use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, Validation};
use warrant_keys::KeyMaterial;
use warrant_store::Store;

use crate::claims::SessionClaims;
use crate::error::{ErrorCode, IssuerError, Result};
use crate::versions::BitmapVersions;

/// Verifies session tokens with the public key and decodes their permissions.
///
/// Works with public-only key material.
pub struct TokenVerifier<S: Store> {
    keys: Arc<KeyMaterial>,
    versions: BitmapVersions<S>,
    validation: Validation,
}

impl<S: Store> TokenVerifier<S> {
    pub fn new(keys: Arc<KeyMaterial>, versions: BitmapVersions<S>, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.leeway = leeway_secs;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            keys,
            versions,
            validation,
        }
    }

    /// Check signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, self.keys.decoding_key(), &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                IssuerError::rejected(ErrorCode::InvalidToken)
            })
    }

    /// Decode the permission bitmap carried in `claims`.
    pub async fn permissions_for(&self, claims: &SessionClaims) -> Result<Vec<String>> {
        self.versions.decode(&claims.pbm.vers, &claims.pbm.bits).await
    }
}
