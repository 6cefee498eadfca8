//! Field validators used by `#[validate(custom = "...")]` attributes

use std::borrow::Cow;

use chrono::{Local, NaiveDate, NaiveTime};
use validator::ValidationError;

/// Accepted values for `gender`
pub const GENDERS: [&str; 3] = ["male", "female", "other"];

/// Accepted values for `blood_group`
pub const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Parse an `HH:MM` time of day
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    if value.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(invalid("date", "Date must be in YYYY-MM-DD format")),
    }
}

/// A date that is not in the future, e.g. a date of birth
pub fn validate_past_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(date) if date > Local::now().date_naive() => {
            Err(invalid("past_date", "Date cannot be in the future"))
        }
        Some(_) => Ok(()),
        None => Err(invalid("date", "Date must be in YYYY-MM-DD format")),
    }
}

pub fn validate_time(value: &str) -> Result<(), ValidationError> {
    match parse_time(value) {
        Some(_) => Ok(()),
        None => Err(invalid("time", "Time must be in HH:MM format")),
    }
}

/// 10 to 15 digits with an optional leading `+`
pub fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if (10..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("phone", "Phone number must have 10 to 15 digits"))
    }
}

pub fn validate_gender(value: &str) -> Result<(), ValidationError> {
    if GENDERS.contains(&value) {
        Ok(())
    } else {
        Err(invalid("gender", "Gender must be one of male, female, other"))
    }
}

pub fn validate_blood_group(value: &str) -> Result<(), ValidationError> {
    if BLOOD_GROUPS.contains(&value) {
        Ok(())
    } else {
        Err(invalid("blood_group", "Unknown blood group"))
    }
}

/// Twelve digit Aadhaar number, spaces allowed
pub fn validate_aadhaar(value: &str) -> Result<(), ValidationError> {
    let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() == 12 && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("aadhaar", "Aadhaar number must have 12 digits"))
    }
}

/// Six digit one-time password
pub fn validate_otp(value: &str) -> Result<(), ValidationError> {
    if value.len() == 6 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("otp", "OTP must have 6 digits"))
    }
}
