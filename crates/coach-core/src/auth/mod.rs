//! Bearer token issuance and verification.
//!
//! Tokens are HMAC-SHA256 signed and carry the caller's role and user id.
//! Format: `coach_<role>_<user_id>_<hmac_hex>`, where the MAC covers
//! `<role>:<user_id>`.

pub mod guard;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use coach_db::models::Role;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_PREFIX: &str = "coach_";

/// Length of a hyphenated UUID.
const UUID_LEN: usize = 36;

/// Environment variable holding the hex-encoded signing secret.
pub const SECRET_ENV: &str = "COACH_TOKEN_SECRET";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid token format: {0}")]
    InvalidFormat(String),

    #[error("invalid role in token: {0}")]
    InvalidRole(String),

    #[error("invalid user ID in token: {0}")]
    InvalidUserId(String),

    #[error("token HMAC verification failed")]
    HmacMismatch,

    #[error("missing token secret")]
    MissingSecret,
}

/// Signing key for tokens.
#[derive(Clone)]
pub struct TokenConfig {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenConfig {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Decode a hex secret, as stored in the config file and environment.
    pub fn from_hex(secret_hex: &str) -> Result<Self, TokenError> {
        let secret_hex = secret_hex.trim();
        if secret_hex.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        let secret = hex::decode(secret_hex)
            .map_err(|e| TokenError::InvalidFormat(format!("token secret is not valid hex: {e}")))?;
        Ok(Self::new(secret))
    }

    /// Read the secret from `COACH_TOKEN_SECRET`.
    pub fn from_env() -> Result<Self, TokenError> {
        let secret_hex = std::env::var(SECRET_ENV).map_err(|_| TokenError::MissingSecret)?;
        Self::from_hex(&secret_hex)
    }
}

/// The authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
}

fn signed_message(identity: &Identity) -> String {
    format!("{}:{}", identity.role, identity.user_id)
}

/// Mint a token for `identity`.
pub fn issue_token(config: &TokenConfig, identity: &Identity) -> Result<String, TokenError> {
    let mac = compute_hmac(&config.secret, signed_message(identity).as_bytes())?;
    Ok(format!(
        "{TOKEN_PREFIX}{}_{}_{}",
        identity.role,
        identity.user_id,
        hex::encode(mac)
    ))
}

/// Verify a token and return the identity it was issued for.
pub fn verify_token(config: &TokenConfig, token: &str) -> Result<Identity, TokenError> {
    let rest = token
        .strip_prefix(TOKEN_PREFIX)
        .ok_or_else(|| TokenError::InvalidFormat("token must start with 'coach_'".to_string()))?;
    if !rest.is_ascii() {
        return Err(TokenError::InvalidFormat(
            "token must be ASCII".to_string(),
        ));
    }

    // Roles may contain '_' and hex never does: the MAC is after the last
    // underscore and the UUID is the fixed-width field before it.
    let (head, mac_hex) = rest
        .rsplit_once('_')
        .ok_or_else(|| TokenError::InvalidFormat("missing hmac".to_string()))?;
    if head.len() < UUID_LEN + 2 {
        return Err(TokenError::InvalidFormat(
            "token too short to contain a role and user ID".to_string(),
        ));
    }
    let (role_part, user_part) = head.split_at(head.len() - UUID_LEN);
    let role_str = role_part
        .strip_suffix('_')
        .ok_or_else(|| TokenError::InvalidFormat("expected underscore before user ID".to_string()))?;

    let role: Role = role_str
        .parse()
        .map_err(|_| TokenError::InvalidRole(role_str.to_string()))?;
    let user_id =
        Uuid::parse_str(user_part).map_err(|e| TokenError::InvalidUserId(e.to_string()))?;

    let provided_mac = hex::decode(mac_hex)
        .map_err(|e| TokenError::InvalidFormat(format!("invalid hex in hmac: {e}")))?;

    let identity = Identity { user_id, role };
    verify_hmac(&config.secret, signed_message(&identity).as_bytes(), &provided_mac)?;
    Ok(identity)
}

fn keyed(key: &[u8]) -> Result<HmacSha256, TokenError> {
    HmacSha256::new_from_slice(key).map_err(|_| TokenError::MissingSecret)
}

fn compute_hmac(key: &[u8], message: &[u8]) -> Result<Vec<u8>, TokenError> {
    let mut mac = keyed(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Constant-time comparison via `verify_slice`.
fn verify_hmac(key: &[u8], message: &[u8], expected_mac: &[u8]) -> Result<(), TokenError> {
    let mut mac = keyed(key)?;
    mac.update(message);
    mac.verify_slice(expected_mac)
        .map_err(|_| TokenError::HmacMismatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TokenConfig {
        TokenConfig::new(b"coach-test-secret".to_vec())
    }

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap(),
            role,
        }
    }

    #[test]
    fn issued_token_layout() {
        let token = issue_token(&config(), &identity(Role::Trainer)).unwrap();
        assert!(token.starts_with("coach_trainer_550e8400-e29b-41d4-a716-446655440000_"));
        let mac_hex = token.rsplit('_').next().unwrap();
        assert_eq!(mac_hex.len(), 64);
    }

    #[test]
    fn roundtrip_every_role() {
        for role in [Role::Client, Role::Trainer, Role::GymOwner] {
            let id = identity(role);
            let token = issue_token(&config(), &id).unwrap();
            assert_eq!(verify_token(&config(), &token).unwrap(), id);
        }
    }

    #[test]
    fn reject_role_escalation() {
        let token = issue_token(&config(), &identity(Role::Client)).unwrap();
        let forged = token.replacen("coach_client_", "coach_trainer_", 1);
        assert!(matches!(
            verify_token(&config(), &forged),
            Err(TokenError::HmacMismatch)
        ));
    }

    #[test]
    fn reject_swapped_user() {
        let token = issue_token(&config(), &identity(Role::Client)).unwrap();
        let forged = token.replace(
            "550e8400-e29b-41d4-a716-446655440000",
            "660e8400-e29b-41d4-a716-446655440000",
        );
        assert!(matches!(
            verify_token(&config(), &forged),
            Err(TokenError::HmacMismatch)
        ));
    }

    #[test]
    fn reject_wrong_secret() {
        let token = issue_token(&config(), &identity(Role::GymOwner)).unwrap();
        let other = TokenConfig::new(b"another-secret".to_vec());
        assert!(matches!(
            verify_token(&other, &token),
            Err(TokenError::HmacMismatch)
        ));
    }

    #[test]
    fn reject_malformed_tokens() {
        let cfg = config();
        assert!(matches!(verify_token(&cfg, ""), Err(TokenError::InvalidFormat(_))));
        assert!(matches!(
            verify_token(&cfg, "session_abc"),
            Err(TokenError::InvalidFormat(_))
        ));
        assert!(matches!(
            verify_token(&cfg, "coach_short_ab"),
            Err(TokenError::InvalidFormat(_))
        ));
        assert!(matches!(
            verify_token(&cfg, "coach_trainer_é50e8400-e29b-41d4-a716-44665544000_00"),
            Err(TokenError::InvalidFormat(_))
        ));
        let id = Uuid::new_v4();
        assert!(matches!(
            verify_token(&cfg, &format!("coach_admin_{id}_00")),
            Err(TokenError::InvalidRole(_))
        ));
        assert!(matches!(
            verify_token(&cfg, &format!("coach_client_{id}_zz")),
            Err(TokenError::InvalidFormat(_))
        ));
        assert!(matches!(
            verify_token(&cfg, "coach_client_not-a-valid-uuid-at-all-nooooooooooo_00"),
            Err(TokenError::InvalidUserId(_))
        ));
    }

    #[test]
    fn secret_from_hex() {
        let cfg = TokenConfig::from_hex("00ff10").unwrap();
        assert_eq!(cfg.secret, vec![0x00, 0xff, 0x10]);
        assert!(matches!(TokenConfig::from_hex("  "), Err(TokenError::MissingSecret)));
        assert!(matches!(
            TokenConfig::from_hex("xyz"),
            Err(TokenError::InvalidFormat(_))
        ));
        assert!(!format!("{cfg:?}").contains("ff"));
    }
}
