//! Signed token claims and the session payload returned to callers.

use serde::{Deserialize, Serialize};
use warrant_core::{PermissionBits, UserId};

/// JWT claims of a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Session id.
    pub sess: String,

    /// Issued at (Unix seconds).
    pub iat: i64,

    /// Expires at (Unix seconds).
    pub exp: i64,

    pub usr: UserClaim,

    pub pbm: BitmapClaim,
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaim {
    pub id: UserId,
    pub name: String,
}

/// Permissions encoded against one bitmap version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapClaim {
    pub vers: String,

    /// On the wire a lowercase hex string (`"5"` for `0b101`, `"0"` when
    /// empty), not a JSON number, so snapshots wider than 64 permissions
    /// survive. A plain integer is still accepted when reading.
    pub bits: PermissionBits,
}

/// What a successful login or renewal returns.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    /// Session id.
    pub id: String,

    /// Signed RS256 token.
    pub token: String,

    pub secret: String,

    /// Lifetime in seconds.
    pub expires_in: u64,

    /// Issue time (Unix ms).
    pub issued_at: i64,

    pub username: String,

    /// Effective permissions, sorted.
    pub permissions: Vec<String>,
}

// Token and secret stay out of logs.
impl std::fmt::Debug for SessionPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPayload")
            .field("id", &self.id)
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .field("username", &self.username)
            .field("permissions", &self.permissions)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_shape() {
        let claims = SessionClaims {
            sess: "abc".into(),
            iat: 10,
            exp: 20,
            usr: UserClaim {
                id: UserId(7),
                name: "alice".into(),
            },
            pbm: BitmapClaim {
                vers: "Xy12Ab34".into(),
                bits: PermissionBits::from_u64(0b101),
            },
        };

        let json: serde_json::Value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "sess": "abc",
                "iat": 10,
                "exp": 20,
                "usr": {"id": 7, "name": "alice"},
                "pbm": {"vers": "Xy12Ab34", "bits": "5"}
            })
        );
    }

    #[test]
    fn test_bits_wire_format() {
        let wide: BitmapClaim =
            serde_json::from_str(r#"{"vers": "v", "bits": "10000000000000000"}"#).unwrap();
        assert!(wide.bits.bit(64));
        assert_eq!(wide.bits.to_u64(), None);

        let numeric: BitmapClaim = serde_json::from_str(r#"{"vers": "v", "bits": 5}"#).unwrap();
        assert_eq!(numeric.bits, PermissionBits::from_u64(0b101));
        assert_eq!(serde_json::to_value(&numeric).unwrap()["bits"], "5");
    }

    #[test]
    fn test_payload_is_camel_case() {
        let payload = SessionPayload {
            id: "s".into(),
            token: "t".into(),
            secret: "k".into(),
            expires_in: 3600,
            issued_at: 1,
            username: "alice".into(),
            permissions: vec!["read".into()],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["expiresIn"], 3600);
        assert_eq!(json["issuedAt"], 1);
        assert!(format!("{:?}", payload).find("token").is_none());
    }
}
