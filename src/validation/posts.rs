//! Checks for the post request shapes that `validator`'s built-in rules
//! don't cover. Minimum lengths are declared on the DTOs themselves.

use std::borrow::Cow;

use uuid::Uuid;
use validator::ValidationError;

/// Default value API explorers put in string fields; never a real title.
pub const PLACEHOLDER: &str = "string";

/// Ids accepted by updates must be time-ordered (version 7) UUIDs.
pub const REQUIRED_ID_VERSION: usize = 7;

fn failure(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

fn text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(failure("not_blank", format!("'{field}' must not be empty.")));
    }
    if value == PLACEHOLDER {
        return Err(failure(
            "placeholder",
            format!("{field} cannot be '{PLACEHOLDER}'"),
        ));
    }
    Ok(())
}

pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    text("Title", title)
}

pub fn validate_content(content: &str) -> Result<(), ValidationError> {
    text("Content", content)
}

pub fn validate_post_id(id: &Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(failure("not_blank", "'Id' must not be empty."));
    }
    if id.get_version_num() != REQUIRED_ID_VERSION {
        return Err(failure("uuid_version", "Id must be a valid Version 7 Guid"));
    }
    Ok(())
}
