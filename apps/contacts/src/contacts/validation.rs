use std::sync::LazyLock;

use regex::Regex;

use crate::contacts::types::ContactInput;

pub const FIRST_NAME_ERROR: &str = "First Name Input Wrong, 1-50 Alphabetic Characters Please";
pub const LAST_NAME_ERROR: &str = "Last Name Input Wrong, 1-50 Alphabetic characters Please";
pub const EMAIL_ERROR: &str = "Email Input Wrong, example@info.com format";
pub const PHONE_ERROR: &str = "Phone Input Wrong 10/11 digit phone number";

const NAME_MAX_CHARS: usize = 50;
const EMAIL_MAX_CHARS: usize = 70;

static PATTERNS: LazyLock<Result<FieldPatterns, regex::Error>> =
    LazyLock::new(FieldPatterns::compile);

/// Whole-value patterns for the contact form fields. ASCII classes only.
#[derive(Debug)]
struct FieldPatterns {
    name: Regex,
    email: Regex,
    phone: Regex,
}

impl FieldPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            name: Regex::new(r"^[A-Za-z ]+$")?,
            email: Regex::new(r"^[A-Za-z0-9]+@[A-Za-z]+\.[A-Za-z]+$")?,
            phone: Regex::new(r"^[0-9]{10,11}$")?,
        })
    }
}

/// The compiled patterns, or `None` (logged) if they failed to build. Every
/// field is rejected in that case.
fn patterns() -> Option<&'static FieldPatterns> {
    match PATTERNS.as_ref() {
        Ok(patterns) => Some(patterns),
        Err(error) => {
            tracing::error!(reason = %error, "contact field patterns failed to compile");
            None
        }
    }
}

/// Failed field checks, in form order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("contact validation failed: {}", messages.join("; "))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

pub fn validate_name(name: &str) -> bool {
    let name = name.trim();
    (1..=NAME_MAX_CHARS).contains(&name.chars().count())
        && patterns().is_some_and(|p| p.name.is_match(name))
}

pub fn validate_email(email: &str) -> bool {
    (1..=EMAIL_MAX_CHARS).contains(&email.chars().count())
        && patterns().is_some_and(|p| p.email.is_match(email))
}

pub fn validate_phone(phone: &str) -> bool {
    let digits: String = phone.chars().filter(|c| *c != ' ' && *c != '-').collect();
    patterns().is_some_and(|p| p.phone.is_match(&digits))
}

pub fn validate_contact(input: &ContactInput) -> bool {
    validate_name(&input.first_name)
        && validate_name(&input.last_name)
        && validate_email(&input.email)
        && validate_phone(&input.phone)
}

pub fn error_messages(input: &ContactInput) -> Vec<String> {
    let checks = [
        (validate_name(&input.first_name), FIRST_NAME_ERROR),
        (validate_name(&input.last_name), LAST_NAME_ERROR),
        (validate_email(&input.email), EMAIL_ERROR),
        (validate_phone(&input.phone), PHONE_ERROR),
    ];

    checks
        .into_iter()
        .filter(|(passed, _)| !passed)
        .map(|(_, message)| message.to_string())
        .collect()
}

pub fn validate(input: &ContactInput) -> Result<(), ValidationError> {
    let messages = error_messages(input);
    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { messages })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        EMAIL_ERROR, FIRST_NAME_ERROR, FieldPatterns, LAST_NAME_ERROR, PHONE_ERROR,
        error_messages, validate, validate_contact, validate_email, validate_name,
        validate_phone,
    };
    use crate::contacts::types::ContactInput;

    // Longer than the postgres phone CHECK allows once hyphens become spaces.
    #[test]
    fn hyphenated_eleven_digit_phone_is_valid_but_normalizes_to_fourteen_chars() {
        let input = ContactInput {
            phone: "1-555-123-4567".to_string(),
            ..valid_input()
        };
        assert!(validate_phone(&input.phone));
        assert_eq!(input.normalized().phone, "1 555 123 4567");
        assert_eq!(input.normalized().phone.chars().count(), 14);
    }

    #[test]
    fn field_patterns_compile() {
        let compiled = FieldPatterns::compile();
        assert!(compiled.is_ok(), "{compiled:?}");
        assert!(super::patterns().is_some());
    }

    fn valid_input() -> ContactInput {
        ContactInput {
            first_name: "Jo".to_string(),
            last_name: "Lee".to_string(),
            email: "jo@lee.com".to_string(),
            phone: "5551234567".to_string(),
            category: "work".to_string(),
        }
    }

    #[test]
    fn name_length_bounds() {
        assert!(!validate_name(""));
        assert!(!validate_name("   "));
        assert!(validate_name("a"));
        assert!(validate_name(&"a".repeat(50)));
        assert!(!validate_name(&"a".repeat(51)));
        assert!(validate_name(&format!("  {}  ", "b".repeat(50))));
    }

    #[test]
    fn name_accepts_letters_and_inner_spaces_only() {
        assert!(validate_name("Mary Ann"));
        assert!(validate_name("  McDonald "));
        assert!(!validate_name("O'Brien"));
        assert!(!validate_name("Jo3"));
        assert!(!validate_name("Zoë"));
        assert!(!validate_name("Jo-Ann"));
        assert!(!validate_name("\u{212A}elvin"));
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("a@b.com"));
        assert!(validate_email("Jo99@Lee.COM"));
        assert!(!validate_email("a@@b.com"));
        assert!(!validate_email("a@b"));
        assert!(!validate_email("bad-email"));
        assert!(!validate_email("a@mail.b.com"));
        assert!(!validate_email("a.b@c.com"));
        assert!(!validate_email("a@b2.com"));
        assert!(!validate_email(" a@b.com"));
        assert!(!validate_email(""));
    }

    #[test]
    fn email_length_limit() {
        let at_limit = format!("{}@b.com", "a".repeat(64));
        assert_eq!(at_limit.len(), 70);
        assert!(validate_email(&at_limit));

        let over_limit = format!("{}@b.com", "a".repeat(65));
        assert!(!validate_email(&over_limit));
    }

    #[test]
    fn phone_digit_counts() {
        assert!(validate_phone("555-123-4567"));
        assert!(validate_phone("5551234567"));
        assert!(validate_phone("1 555 123 4567"));
        assert!(validate_phone("1-555-123-4567"));
        assert!(!validate_phone("123"));
        assert!(!validate_phone("555123456"));
        assert!(!validate_phone("555123456789"));
        assert!(!validate_phone("(555) 123-4567"));
        assert!(!validate_phone("555.123.4567"));
        assert!(!validate_phone(""));
    }

    #[test]
    fn error_messages_follow_form_order() {
        assert!(error_messages(&valid_input()).is_empty());
        assert!(validate_contact(&valid_input()));

        let input = ContactInput {
            first_name: "1".to_string(),
            last_name: String::new(),
            email: "nope".to_string(),
            phone: "12".to_string(),
            category: String::new(),
        };
        assert!(!validate_contact(&input));
        assert_eq!(
            error_messages(&input),
            vec![FIRST_NAME_ERROR, LAST_NAME_ERROR, EMAIL_ERROR, PHONE_ERROR]
        );
    }

    #[test]
    fn validate_reports_only_failing_fields() {
        let mut input = valid_input();
        input.email = "bad-email".to_string();

        let error = validate(&input).err().map(|error| error.messages);
        assert_eq!(error, Some(vec![EMAIL_ERROR.to_string()]));
        assert!(validate(&valid_input()).is_ok());
    }
}
