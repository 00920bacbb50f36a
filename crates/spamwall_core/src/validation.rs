//! Local credential validation, run before any request leaves the client.

const MIN_EMAIL_CHARS: usize = 3;
const MIN_LOGIN_PASSWORD_CHARS: usize = 1;
const MIN_REGISTER_PASSWORD_CHARS: usize = 6;

/// Validation error for credential forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{}", self.message())]
pub enum ValidationError {
    /// Email or password left empty.
    MissingCredentials,
    /// Email shorter than the minimum once trimmed.
    EmailTooShort,
    /// Login password empty.
    PasswordRequired,
    /// Registration or reset password shorter than the minimum.
    PasswordTooShort,
    /// Forgot-password email left blank.
    EmailRequired,
    /// Reset token blank.
    MissingResetToken,
    /// Reset password or its confirmation left empty.
    MissingResetPasswords,
    /// Reset confirmation differs from the password.
    PasswordMismatch,
}

impl ValidationError {
    /// Get human-readable error message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Email and password are required",
            Self::EmailTooShort => "Email must be at least 3 characters",
            Self::PasswordRequired => "Password is required",
            Self::PasswordTooShort => "Password must be at least 6 characters",
            Self::EmailRequired => "Email is required",
            Self::MissingResetToken => "Invalid or missing reset token",
            Self::MissingResetPasswords => "Both password fields are required",
            Self::PasswordMismatch => "Passwords do not match",
        }
    }

    /// Get the field name this error relates to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "credentials",
            Self::EmailTooShort | Self::EmailRequired => "email",
            Self::PasswordRequired
            | Self::PasswordTooShort
            | Self::MissingResetPasswords => "password",
            Self::MissingResetToken => "token",
            Self::PasswordMismatch => "confirmation",
        }
    }
}

/// Result of validating a form.
pub type ValidationResult = Result<(), ValidationError>;

fn validate_credentials(email: &str, password: &str, min_password: usize) -> ValidationResult {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingCredentials);
    }
    if email.trim().chars().count() < MIN_EMAIL_CHARS {
        return Err(ValidationError::EmailTooShort);
    }
    if password.chars().count() < min_password {
        return Err(if min_password > MIN_LOGIN_PASSWORD_CHARS {
            ValidationError::PasswordTooShort
        } else {
            ValidationError::PasswordRequired
        });
    }
    Ok(())
}

/// Validate a login form.
///
/// # Errors
///
/// Returns the first rule the input breaks.
pub fn validate_login(email: &str, password: &str) -> ValidationResult {
    validate_credentials(email, password, MIN_LOGIN_PASSWORD_CHARS)
}

/// Validate a registration form.
///
/// # Errors
///
/// Returns the first rule the input breaks.
pub fn validate_registration(email: &str, password: &str) -> ValidationResult {
    validate_credentials(email, password, MIN_REGISTER_PASSWORD_CHARS)
}

/// Validate a forgot-password request.
///
/// # Errors
///
/// Returns `EmailRequired` for a blank email.
pub fn validate_forgot_password(email: &str) -> ValidationResult {
    if email.trim().is_empty() {
        return Err(ValidationError::EmailRequired);
    }
    Ok(())
}

/// Validate a password reset form.
///
/// # Errors
///
/// Returns the first rule the input breaks.
pub fn validate_password_reset(token: &str, password: &str, confirmation: &str) -> ValidationResult {
    if token.trim().is_empty() {
        return Err(ValidationError::MissingResetToken);
    }
    if password.is_empty() || confirmation.is_empty() {
        return Err(ValidationError::MissingResetPasswords);
    }
    if password != confirmation {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_REGISTER_PASSWORD_CHARS {
        return Err(ValidationError::PasswordTooShort);
    }
    Ok(())
}
