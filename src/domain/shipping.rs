use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::errors::{DomainError, FieldErrors};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingInfo {
    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<(), DomainError> {
        let mut errors = FieldErrors::new();

        let required = [
            ("name", &self.name),
            ("email", &self.email),
            ("addressLine1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.insert(field.to_string(), "is required".to_string());
            }
        }

        let email = self.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.insert("email".to_string(), "is not a valid email address".to_string());
        }

        if let Some(phone) = self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            let digits = phone.chars().filter(char::is_ascii_digit).count();
            let allowed = phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')' | '.'));
            if !allowed || !(7..=15).contains(&digits) {
                errors.insert("phone".to_string(), "is not a valid phone number".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(errors))
        }
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
