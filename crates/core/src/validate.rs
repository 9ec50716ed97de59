//! Input shape validation for app registration.

use crate::error::{Error, Result};

/// Validate an app slug: non-empty, `[A-Za-z0-9_-]+`.
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() {
        return Err(Error::InvalidSlug("slug must not be empty".to_string()));
    }
    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(Error::InvalidSlug(format!(
            "slug may only contain letters, digits, '_' and '-': {slug}"
        )));
    }
    Ok(())
}

/// Validate an owner email's shape: one `@`, non-empty local part, a dotted
/// domain without whitespace. Deliberately loose; deliverability is not our
/// concern.
pub fn validate_email(email: &str) -> Result<()> {
    let reject = |reason: &str| Err(Error::InvalidEmail(format!("{reason}: {email}")));

    if email.chars().any(char::is_whitespace) {
        return reject("email must not contain whitespace");
    }
    let Some((local, domain)) = email.split_once('@') else {
        return reject("email must contain '@'");
    };
    if local.is_empty() {
        return reject("email local part is empty");
    }
    if domain.contains('@') {
        return reject("email must contain a single '@'");
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return reject("email domain must contain '.'");
    };
    if host.is_empty() || tld.is_empty() {
        return reject("email domain is incomplete");
    }
    Ok(())
}
