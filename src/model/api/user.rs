use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    common::{RawRegistrationNumber, RegistrationNumber},
    db::user::{Role, User, UserDraft},
};

/// Take a required text field, rejecting it if absent or blank.
fn required(value: Option<String>, field: &str) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Validation(format!("{field} is required"))),
    }
}

/// A signup request. Every field is optional at the type level so that
/// missing fields are reported by [`SignupRequest::validate`] rather than
/// by the JSON deserializer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub email: Option<String>,
    #[serde(alias = "contact")]
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub registration_number: Option<RawRegistrationNumber>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl SignupRequest {
    /// Check everything that can be checked without the database.
    pub fn validate(self) -> Result<UserDraft> {
        let registration_number = self
            .registration_number
            .as_ref()
            .ok_or_else(|| Error::Validation("registrationNumber is required".to_string()))?
            .validate()?;
        let password = match self.password {
            Some(password) if !password.is_empty() => password,
            _ => return Err(Error::Validation("password is required".to_string())),
        };
        Ok(UserDraft {
            name: required(self.name, "name")?,
            age: self.age,
            email: required(self.email, "email")?.to_lowercase(),
            mobile: required(self.mobile, "mobile")?,
            address: required(self.address, "address")?,
            registration_number,
            password,
            role: self.role.unwrap_or_default(),
        })
    }
}

/// Login credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub registration_number: Option<RawRegistrationNumber>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Both fields must be present and non-empty.
    pub fn into_parts(self) -> Result<(String, String)> {
        let number = self.registration_number.filter(|number| !number.is_blank());
        match (number, self.password) {
            (Some(number), Some(password)) if !password.is_empty() => {
                Ok((number.to_text(), password))
            }
            _ => Err(Error::Validation(
                "Registration number and password are required".to_string(),
            )),
        }
    }
}

/// A partial profile update. Absent or empty fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub email: Option<String>,
    #[serde(alias = "contact")]
    pub mobile: Option<String>,
    pub address: Option<String>,
    /// Accepted only if it matches the stored value.
    pub registration_number: Option<RawRegistrationNumber>,
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// A request to the dedicated password change endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// A user as shown to themselves. Never includes the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDescription {
    pub id: ApiId,
    pub name: String,
    pub age: Option<u32>,
    pub email: String,
    pub mobile: String,
    pub address: String,
    pub registration_number: RegistrationNumber,
    pub role: Role,
    pub has_voted: bool,
}

impl From<User> for UserDescription {
    fn from(user: User) -> Self {
        Self {
            id: user.id.into(),
            name: user.user.name,
            age: user.user.age,
            email: user.user.email,
            mobile: user.user.mobile,
            address: user.user.address,
            registration_number: user.user.registration_number,
            role: user.user.role,
            has_voted: user.user.has_voted,
        }
    }
}

/// A user as listed to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub name: String,
    pub age: Option<u32>,
    pub mobile: String,
    pub address: String,
    pub registration_number: RegistrationNumber,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            name: user.user.name,
            age: user.user.age,
            mobile: user.user.mobile,
            address: user.user.address,
            registration_number: user.user.registration_number,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub response: UserDescription,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub user: UserDescription,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdateResponse {
    pub message: String,
    pub user: UserDescription,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl SignupRequest {
        pub fn example() -> Self {
            Self {
                name: Some("Asha Verma".into()),
                age: Some(34),
                email: Some("asha@example.com".into()),
                mobile: Some("9876543210".into()),
                address: Some("12 Park Street, Kolkata".into()),
                registration_number: Some((&RegistrationNumber::example()).into()),
                password: Some("correct horse".into()),
                role: None,
            }
        }

        pub fn example2() -> Self {
            Self {
                name: Some("Vikram Singh".into()),
                age: Some(41),
                email: Some("vikram@example.com".into()),
                mobile: Some("9123456780".into()),
                address: Some("4 Lake Road, Pune".into()),
                registration_number: Some((&RegistrationNumber::example2()).into()),
                password: Some("battery staple".into()),
                role: Some(Role::Voter),
            }
        }

        pub fn example_admin() -> Self {
            Self {
                name: Some("Returning Officer".into()),
                age: Some(50),
                email: Some("officer@example.com".into()),
                mobile: Some("9000000001".into()),
                address: Some("Election Commission, Delhi".into()),
                registration_number: Some((&RegistrationNumber::example_admin()).into()),
                password: Some("supervise everything".into()),
                role: Some(Role::Admin),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rocket::serde::json::serde_json::{self, json};

    use super::*;

    #[test]
    fn signup_validation_accepts_example() {
        let draft = SignupRequest::example().validate().unwrap();
        assert_eq!(draft.registration_number, RegistrationNumber::example());
        assert_eq!(draft.role, Role::Voter);
        assert_eq!(draft.password, "correct horse");
    }

    #[test]
    fn signup_rejects_bad_registration_numbers() {
        for bad in [json!("12345"), json!("abcdefghijkl"), json!(1234567890123_u64)] {
            let request: SignupRequest = serde_json::from_value(json!({
                "name": "A",
                "email": "a@example.com",
                "mobile": "1",
                "address": "B",
                "registrationNumber": bad,
                "password": "pw",
            }))
            .unwrap();
            assert!(matches!(request.validate(), Err(Error::Validation(_))));
        }
    }

    #[test]
    fn signup_requires_fields() {
        let mut request = SignupRequest::example();
        request.email = Some("   ".into());
        assert!(matches!(request.validate(), Err(Error::Validation(_))));

        let mut request = SignupRequest::example();
        request.password = None;
        assert!(matches!(request.validate(), Err(Error::Validation(_))));

        let mut request = SignupRequest::example();
        request.registration_number = None;
        assert!(matches!(request.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn signup_accepts_contact_alias_and_admin_role() {
        let request: SignupRequest = serde_json::from_value(json!({
            "name": "A",
            "email": "A@Example.com",
            "contact": "555",
            "address": "B",
            "registrationNumber": 123456789012_u64,
            "password": "pw",
            "role": "admin",
        }))
        .unwrap();
        let draft = request.validate().unwrap();
        assert_eq!(draft.mobile, "555");
        assert_eq!(draft.email, "a@example.com");
        assert_eq!(draft.role, Role::Admin);
    }

    #[test]
    fn login_requires_both_fields() {
        let missing = LoginRequest {
            registration_number: Some((&RegistrationNumber::example()).into()),
            password: None,
        };
        assert!(matches!(missing.into_parts(), Err(Error::Validation(_))));

        let complete = LoginRequest {
            registration_number: Some((&RegistrationNumber::example()).into()),
            password: Some("pw".into()),
        };
        let (number, password) = complete.into_parts().unwrap();
        assert_eq!(number, "123456789012");
        assert_eq!(password, "pw");
    }

    #[test]
    fn login_treats_blank_registration_number_as_missing() {
        for blank in ["", "  "] {
            let request = LoginRequest {
                registration_number: Some(RawRegistrationNumber::Text(blank.into())),
                password: Some("pw".into()),
            };
            match request.into_parts() {
                Err(Error::Validation(message)) => {
                    assert_eq!(message, "Registration number and password are required")
                }
                other => panic!("{blank:?} was accepted: {other:?}"),
            }
        }
    }

    #[test]
    fn signup_rejects_padded_registration_numbers() {
        for padded in [" 123456789012", "123456789012\n", "\t123456789012  "] {
            let mut request = SignupRequest::example();
            request.registration_number = Some(RawRegistrationNumber::Text(padded.into()));
            assert!(matches!(request.validate(), Err(Error::Validation(_))));
        }
    }
}
