//! Field rules for user input. Every check returns the first failing rule only.

use lazy_static::lazy_static;
use regex::Regex;

pub const FIRST_NAME_MAX: usize = 25;
pub const SECOND_NAME_MAX: usize = 50;
pub const PHONE_DIGITS: usize = 10;
pub const PASSWORD_MIN: usize = 4;
pub const SKILL_NAME_MAX: usize = 25;

const PHONE_SEPARATORS: [char; 6] = [' ', '-', '(', ')', '+', '.'];

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("You must enter a valid first name of the user.")]
    MissingFirstName,
    #[error("The first name must be 25 characters or fewer.")]
    FirstNameTooLong,
    #[error("You must enter a valid second name of the user.")]
    MissingSecondName,
    #[error("The second name must be 50 characters or fewer.")]
    SecondNameTooLong,
    #[error("You must enter a user email.")]
    MissingEmail,
    #[error("This email already exists. Use another one!")]
    EmailTaken,
    #[error("The phone number must contain exactly 10 digits.")]
    InvalidPhone,
    #[error("Entered passwords do not match.")]
    PasswordMismatch,
    #[error("The password must not contain spaces.")]
    PasswordWhitespace,
    #[error("The password must be 4 or more characters.")]
    PasswordTooShort,
    #[error("You must enter a valid skill name.")]
    MissingSkillName,
    #[error("The skill name must be 25 characters or fewer.")]
    SkillNameTooLong,
    #[error("The skill name may contain only letters, digits, '-', '/' and '''.")]
    SkillNameCharset,
    #[error("This skill is already on your list.")]
    DuplicateSkill,
}

pub type Result = std::result::Result<(), ValidationError>;

lazy_static! {
    static ref SKILL_NAME_RE: Regex = Regex::new(r"^[\p{L}\p{N}\-/']+$").unwrap();
}

/// Trims and capitalizes: first letter upper case, the rest lower case.
pub fn normalize_name(raw: &str) -> String {
    let mut chars = raw.trim().chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Strips separators, so "(541) 111-1111" is stored as "5411111111".
/// Anything else is returned trimmed and left for [`phone`] to reject.
pub fn normalize_phone(raw: &str) -> String {
    let raw = raw.trim();
    if raw.chars().all(|c| c.is_ascii_digit() || PHONE_SEPARATORS.contains(&c)) {
        raw.chars().filter(char::is_ascii_digit).collect()
    } else {
        raw.to_string()
    }
}

pub fn normalize_skill(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn first_name(name: &str) -> Result {
    if name.is_empty() {
        Err(ValidationError::MissingFirstName)
    } else if name.chars().count() > FIRST_NAME_MAX {
        Err(ValidationError::FirstNameTooLong)
    } else {
        Ok(())
    }
}

pub fn second_name(name: &str) -> Result {
    if name.is_empty() {
        Err(ValidationError::MissingSecondName)
    } else if name.chars().count() > SECOND_NAME_MAX {
        Err(ValidationError::SecondNameTooLong)
    } else {
        Ok(())
    }
}

pub fn phone(phone: &str) -> Result {
    let ok = phone.is_empty()
        || (phone.len() == PHONE_DIGITS && phone.chars().all(|c| c.is_ascii_digit()));
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

pub fn new_password(password: &str, confirmation: &str) -> Result {
    if password != confirmation {
        Err(ValidationError::PasswordMismatch)
    } else if password.chars().any(char::is_whitespace) {
        Err(ValidationError::PasswordWhitespace)
    } else if password.chars().count() < PASSWORD_MIN {
        Err(ValidationError::PasswordTooShort)
    } else {
        Ok(())
    }
}

/// Sign-up rules. `email_taken` is the result of looking the email up beforehand.
pub fn signup(
    first: &str,
    second: &str,
    email: &str,
    email_taken: bool,
    phone_number: &str,
    password: &str,
    confirmation: &str,
) -> Result {
    first_name(first)?;
    second_name(second)?;
    if email.is_empty() {
        return Err(ValidationError::MissingEmail);
    }
    if email_taken {
        return Err(ValidationError::EmailTaken);
    }
    phone(phone_number)?;
    new_password(password, confirmation)
}

/// Profile edits. `None` (or an empty name) leaves the field untouched.
pub fn profile_changes(first: Option<&str>, second: Option<&str>, phone_number: Option<&str>) -> Result {
    if let Some(name) = first.filter(|n| !n.is_empty()) {
        first_name(name)?;
    }
    if let Some(name) = second.filter(|n| !n.is_empty()) {
        second_name(name)?;
    }
    if let Some(number) = phone_number {
        phone(number)?;
    }
    Ok(())
}

/// Checks a skill the user wants to add against their current list.
pub fn new_skill(name: &str, current: &[String]) -> Result {
    if name.is_empty() {
        Err(ValidationError::MissingSkillName)
    } else if name.chars().count() > SKILL_NAME_MAX {
        Err(ValidationError::SkillNameTooLong)
    } else if !SKILL_NAME_RE.is_match(name) {
        Err(ValidationError::SkillNameCharset)
    } else if current.iter().any(|s| s == name) {
        Err(ValidationError::DuplicateSkill)
    } else {
        Ok(())
    }
}
