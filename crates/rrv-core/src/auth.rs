//! Session context and identity-provider error presentation.
//!
//! Credentials and session persistence belong to the external identity
//! provider. This module only models the identity it asserts and turns its
//! error codes into messages a user can act on.

use serde::{Deserialize, Serialize};

use crate::CoreError;

const DISPLAY_NAME_MIN_CHARS: usize = 2;
const DISPLAY_NAME_MAX_CHARS: usize = 50;

/// The authenticated user a request or operation acts on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: None,
            email: None,
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name stamped on reviews: display name, else email, else `"Anonymous"`.
    #[must_use]
    pub fn author_name(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.email.as_deref().filter(|s| !s.trim().is_empty()))
            .unwrap_or("Anonymous")
    }
}

/// Message shown when signing in fails with the provider's `code`.
#[must_use]
pub fn sign_in_error_message(code: &str) -> &'static str {
    match code {
        "auth/invalid-credential" => {
            "Invalid email or password. Please check your credentials and try again."
        }
        "auth/user-not-found" => "No account found with this email. Please sign up first.",
        "auth/wrong-password" => "Incorrect password. Please try again.",
        "auth/invalid-email" => "Invalid email address format.",
        "auth/user-disabled" => "This account has been disabled. Please contact support.",
        "auth/too-many-requests" => "Too many failed login attempts. Please try again later.",
        _ => "Login failed. Please try again.",
    }
}

/// Message shown when creating an account fails with the provider's `code`.
#[must_use]
pub fn sign_up_error_message(code: &str) -> &'static str {
    match code {
        "auth/email-already-in-use" => {
            "This email is already registered. Please sign in or use a different email."
        }
        "auth/weak-password" => "Password is too weak. Please use at least 6 characters.",
        "auth/invalid-email" => "Invalid email address format.",
        "auth/operation-not-allowed" => {
            "Email/password sign-up is not enabled. Please contact support."
        }
        _ => "Sign up failed. Please try again.",
    }
}

/// Check a display name before account creation and return it trimmed.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] when the name is blank, shorter than
/// two characters, or longer than fifty.
pub fn validate_display_name(name: &str) -> Result<String, CoreError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        return Err(CoreError::Validation {
            field: "displayName",
            reason: "Please enter your full name".to_string(),
        });
    }
    if len < DISPLAY_NAME_MIN_CHARS {
        return Err(CoreError::Validation {
            field: "displayName",
            reason: "Name must be at least 2 characters long".to_string(),
        });
    }
    if len > DISPLAY_NAME_MAX_CHARS {
        return Err(CoreError::Validation {
            field: "displayName",
            reason: format!("Name must be at most {DISPLAY_NAME_MAX_CHARS} characters long"),
        });
    }
    Ok(trimmed.to_string())
}
