//! Credential input validation.

use wikno_core::error::Result;
use wikno_core::WiknoError;

pub const MAX_EMAIL_LEN: usize = 255;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 32;
/// bcrypt reads at most this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Trim and lowercase an email, then validate it.
pub fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    self::email(&email)?;
    Ok(email)
}

pub fn email(email: &str) -> Result<()> {
    if email.is_empty() {
        return Err(WiknoError::invalid("email is required"));
    }
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(WiknoError::invalid(format!(
            "email must be at most {MAX_EMAIL_LEN} characters"
        )));
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(WiknoError::invalid("email must look like local@domain")),
    }
}

pub fn password(password: &str) -> Result<()> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        return Err(WiknoError::invalid(format!(
            "password must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(WiknoError::invalid(format!(
            "password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_rules() {
        assert_eq!(normalize_email("  A@X.com ").unwrap(), "a@x.com");
        assert!(email("").is_err());
        assert!(email("no-at-sign").is_err());
        assert!(email("@x.com").is_err());
        assert!(email("a@").is_err());
        assert!(email("a@b@c").is_err());

        let long = format!("{}@x.com", "a".repeat(MAX_EMAIL_LEN));
        assert!(email(&long).is_err());
    }

    #[test]
    fn test_password_bounds() {
        assert!(password("pw123456").is_ok());
        assert!(password("pw12345").is_err());
        assert!(password(&"x".repeat(32)).is_ok());
        assert!(password(&"x".repeat(33)).is_err());
    }

    #[test]
    fn test_password_byte_bound() {
        // 18 four-byte code points fill the whole bcrypt input.
        assert!(password(&"\u{1D49C}".repeat(18)).is_ok());
        let err = password(&format!("{}aaaaaaaa", "\u{1D49C}".repeat(18))).unwrap_err();
        assert_eq!(err.kind(), wikno_core::ErrorKind::InvalidRequest);
        assert!(err.to_string().contains("72 bytes"));
    }
}
