use serde::{Deserialize, Serialize};

macro_rules! newtype_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new_v4() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

newtype_id!(UserId);
newtype_id!(StoryId);
newtype_id!(ChapterId);
newtype_id!(MomentId);
newtype_id!(QuestionId);
newtype_id!(AnswerId);
newtype_id!(MediaId);
newtype_id!(NotificationId);
newtype_id!(RelationshipId);
newtype_id!(DeviceId);
newtype_id!(ReportId);
newtype_id!(SharedUrlId);

/// 紛らわしい文字（0/O, 1/I/L）を除いた招待コード用アルファベット
const INVITE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const INVITE_CODE_LEN: usize = 8;

/// Generate an opaque invite code. Uniqueness is enforced by the
/// database; callers retry on conflict.
pub fn new_invite_code() -> String {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_ALPHABET[rng.random_range(0..INVITE_ALPHABET.len())] as char)
        .collect()
}

/// Validate an email address just enough to catch obvious typos.
/// Real verification would happen out of band.
pub fn validate_email(s: &str) -> Result<(), String> {
    let Some((local, domain)) = s.split_once('@') else {
        return Err("email must contain '@'".into());
    };
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err("email is not valid".into());
    }
    if s.chars().any(char::is_whitespace) {
        return Err("email must not contain whitespace".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_code_shape() {
        let code = new_invite_code();
        assert_eq!(code.len(), INVITE_CODE_LEN);
        assert!(code.bytes().all(|b| INVITE_ALPHABET.contains(&b)));
    }

    #[test]
    fn invite_codes_differ() {
        assert_ne!(new_invite_code(), new_invite_code());
    }

    #[test]
    fn email_validation() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@nodot").is_err());
        assert!(validate_email("a lice@example.com").is_err());
    }
}
