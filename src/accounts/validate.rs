use lazy_static::lazy_static;
use regex::Regex;

use crate::{errors::IdentityError, users::model::NewUser};

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 128;
pub const MAX_BIOGRAPHY_CHARS: usize = 500;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{3,32}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

/// Normalizes the form in place and checks its format.
pub fn registration(form: &mut NewUser) -> Result<(), IdentityError> {
    form.username = form.username.trim().to_string();
    form.email = form.email.trim().to_lowercase();
    form.biography = form
        .biography
        .take()
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty());

    if !is_valid_username(&form.username) {
        return Err(IdentityError::validation(
            "username must be 3-32 letters, digits or underscores",
        ));
    }
    if !is_valid_email(&form.email) {
        return Err(IdentityError::validation("Invalid email"));
    }
    password(&form.password)?;
    if let Some(bio) = &form.biography {
        if bio.chars().count() > MAX_BIOGRAPHY_CHARS {
            return Err(IdentityError::validation("biography is too long"));
        }
    }
    Ok(())
}

pub fn password(password: &str) -> Result<(), IdentityError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_CHARS {
        return Err(IdentityError::validation("Password too short"));
    }
    if len > MAX_PASSWORD_CHARS {
        return Err(IdentityError::validation("Password too long"));
    }
    Ok(())
}
