//! Pre-submit title checks for workflows, states, and transitions.
//!
//! These only catch the obvious cases before a request is sent. The backend
//! stays authoritative and may still reject a title for reasons the client
//! cannot see (reserved ids, concurrent edits).

use crate::error::CoreError;
use crate::naming::slugify;

/// Minimum title length in characters, after trimming.
pub const MIN_TITLE_LEN: usize = 2;

/// Maximum title length in characters, after trimming.
pub const MAX_TITLE_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TitleError {
    #[error("Title is required")]
    Required,

    #[error("Title must be at least 2 characters")]
    TooShort,

    #[error("Title must be less than 50 characters")]
    TooLong,

    #[error("'{title}' collides with existing entry '{existing_id}'")]
    Duplicate { title: String, existing_id: String },
}

impl From<TitleError> for CoreError {
    fn from(err: TitleError) -> Self {
        CoreError::Validation(err.to_string())
    }
}

/// Validate a title against its siblings.
///
/// `siblings` yields `(id, title)` pairs of the entities that share a
/// namespace with the new title. A collision is a case-insensitive title
/// match, or the title's derived slug equalling a sibling id. `exclude_id`
/// skips the entity being renamed.
pub fn validate_title<'a, I>(
    title: &str,
    siblings: I,
    exclude_id: Option<&str>,
) -> Result<(), TitleError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TitleError::Required);
    }

    let len = trimmed.chars().count();
    if len < MIN_TITLE_LEN {
        return Err(TitleError::TooShort);
    }
    if len > MAX_TITLE_LEN {
        return Err(TitleError::TooLong);
    }

    let slug = slugify(trimmed);
    let lowered = trimmed.to_lowercase();

    for (id, existing_title) in siblings {
        if exclude_id == Some(id) {
            continue;
        }
        if id == slug || existing_title.trim().to_lowercase() == lowered {
            return Err(TitleError::Duplicate {
                title: trimmed.to_string(),
                existing_id: id.to_string(),
            });
        }
    }

    Ok(())
}
