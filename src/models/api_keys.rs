use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Full token length: `pix_` plus 32 hex characters.
pub const KEY_LENGTH: usize = 36;
/// Leading slice stored in clear for indexed lookup.
pub const PREFIX_LENGTH: usize = 12;

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct ApiKey {
    pub id: String,
    pub user_id: String,
    pub key_prefix: String,
    /// Hex SHA-256 of `salt || token`. The token itself is never stored.
    pub key_hash: String,
    pub salt: String,
    pub status: String,
    pub last_used_at: Option<chrono::NaiveDateTime>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiKeyStatus {
    Active,
    Revoked,
}

impl ApiKeyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiKeyStatus::Active => "active",
            ApiKeyStatus::Revoked => "revoked",
        }
    }
}

impl ApiKey {
    pub fn is_active(&self) -> bool {
        self.status == ApiKeyStatus::Active.as_str()
    }

    pub fn verify(&self, token: &str) -> bool {
        let computed = hash_token(&self.salt, token);

        computed.as_bytes().ct_eq(self.key_hash.as_bytes()).into()
    }
}

pub fn hash_token(salt: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(token.as_bytes());

    hex::encode(hasher.finalize())
}

/// Length and character-class check, done before any storage lookup so
/// garbage tokens are rejected without touching the database.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == KEY_LENGTH
        && token.starts_with("pix_")
        && token[4..]
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "pix_0123456789abcdef0123456789abcdef";

    fn key_with(hash: String) -> ApiKey {
        ApiKey {
            id: "key-1".to_string(),
            user_id: "user-1".to_string(),
            key_prefix: TOKEN[..PREFIX_LENGTH].to_string(),
            key_hash: hash,
            salt: "s4lt".to_string(),
            status: "active".to_string(),
            last_used_at: None,
            created_at: chrono::NaiveDateTime::default(),
        }
    }

    #[test]
    fn well_formed_accepts_the_canonical_shape() {
        assert!(is_well_formed(TOKEN));
    }

    #[test]
    fn well_formed_rejects_bad_shapes() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("pix_short"));
        assert!(!is_well_formed("key_0123456789abcdef0123456789abcdef"));
        assert!(!is_well_formed("pix_0123456789ABCDEF0123456789ABCDEF"));
        assert!(!is_well_formed("pix_0123456789abcdef0123456789abcdeg"));
        assert!(!is_well_formed(&format!("{}0", TOKEN)));
    }

    #[test]
    fn verify_accepts_the_hashed_token() {
        let key = key_with(hash_token("s4lt", TOKEN));

        assert!(key.verify(TOKEN));
    }

    #[test]
    fn verify_rejects_other_tokens_and_salts() {
        let key = key_with(hash_token("s4lt", TOKEN));

        assert!(!key.verify("pix_ffffffffffffffffffffffffffffffff"));

        let other_salt = key_with(hash_token("pepper", TOKEN));
        assert!(!other_salt.verify(TOKEN));
    }

    #[test]
    fn revoked_keys_are_not_active() {
        let mut key = key_with(hash_token("s4lt", TOKEN));
        key.status = ApiKeyStatus::Revoked.as_str().to_string();

        assert!(!key.is_active());
    }
}
