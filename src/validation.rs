//! Request body checks shared by the handlers.

use crate::error::AppError;

const MIN_PASSWORD_LEN: usize = 6;

pub fn user_fields(email: &str, password: &str, first_name: &str, last_name: &str) -> Result<(), AppError> {
    email_address(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    non_empty("firstName", first_name)?;
    non_empty("lastName", last_name)
}

pub fn email_address(email: &str) -> Result<(), AppError> {
    non_empty("email", email)?;
    if !email.contains('@') {
        return Err(AppError::ValidationError("Email address is malformed".into()));
    }
    Ok(())
}

pub fn article(title: &str, content: &str) -> Result<(), AppError> {
    non_empty("title", title)?;
    non_empty("content", content)
}

pub fn comment(content: &str) -> Result<(), AppError> {
    non_empty("content", content)
}

fn non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::ValidationError(format!("{} is required", field)))
    } else {
        Ok(())
    }
}
