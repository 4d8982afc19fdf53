use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use argon2::Config;
use mongodb::bson::{doc, Document};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{common::RegistrationNumber, mongodb::Id};

/// Different privilege levels.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Voter,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voter => "voter",
            Self::Admin => "admin",
        }
    }
}

impl Display for Role {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    Ok(argon2::hash_encoded(
        password.as_bytes(),
        &salt,
        &Config::default(),
    )?)
}

/// Core user data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    pub email: String,
    pub mobile: String,
    pub address: String,
    pub registration_number: RegistrationNumber,
    /// Argon2 encoded hash, including its salt.
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    /// One-way: set by the vote recorder and never cleared.
    #[serde(default)]
    pub has_voted: bool,
}

impl UserCore {
    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> Result<bool> {
        Ok(argon2::verify_encoded(
            &self.password_hash,
            password.as_ref(),
        )?)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// A validated user awaiting insertion. The password is still plaintext,
/// so this is never written as-is.
#[derive(Debug, Clone)]
pub struct UserDraft {
    pub name: String,
    pub age: Option<u32>,
    pub email: String,
    pub mobile: String,
    pub address: String,
    pub registration_number: RegistrationNumber,
    pub password: String,
    pub role: Role,
}

impl UserDraft {
    /// Hash the password, producing the record that gets stored.
    pub fn prepare_for_write(self) -> Result<NewUser> {
        Ok(NewUser {
            password_hash: hash_password(&self.password)?,
            name: self.name,
            age: self.age,
            email: self.email,
            mobile: self.mobile,
            address: self.address,
            registration_number: self.registration_number,
            role: self.role,
            has_voted: false,
        })
    }
}

/// The set of fields that actually differ from a stored user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    /// New plaintext password; hashed in [`ProfileChanges::prepare_for_write`].
    pub password: Option<String>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Build the `$set` document for these changes. The password is hashed
    /// here and only here, so an unchanged password is never re-hashed.
    pub fn prepare_for_write(self) -> Result<Document> {
        let mut set = Document::new();
        if let Some(name) = self.name {
            set.insert("name", name);
        }
        if let Some(age) = self.age {
            set.insert("age", i64::from(age));
        }
        if let Some(email) = self.email {
            set.insert("email", email);
        }
        if let Some(mobile) = self.mobile {
            set.insert("mobile", mobile);
        }
        if let Some(address) = self.address {
            set.insert("address", address);
        }
        if let Some(password) = self.password {
            set.insert("password_hash", hash_password(&password)?);
        }
        Ok(doc! { "$set": set })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_password_is_hashed() {
        let draft = UserDraft::example();
        let plaintext = draft.password.clone();
        let user = draft.prepare_for_write().unwrap();

        assert_ne!(user.password_hash, plaintext);
        assert!(!user.password_hash.contains(&plaintext));
        assert!(user.verify_password(&plaintext).unwrap());
        assert!(!user.verify_password("correct horse!").unwrap());
        assert!(!user.verify_password("").unwrap());
        assert!(!user.has_voted);
    }

    #[test]
    fn salts_are_fresh() {
        let first = hash_password("same password").unwrap();
        let second = hash_password("same password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn unchanged_password_is_not_written() {
        let changes = ProfileChanges {
            name: Some("New Name".to_string()),
            ..Default::default()
        };
        let update = changes.prepare_for_write().unwrap();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("name").unwrap(), "New Name");
        assert!(!set.contains_key("password_hash"));
    }

    #[test]
    fn changed_password_is_hashed() {
        let changes = ProfileChanges {
            password: Some("brand new secret".to_string()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        let update = changes.prepare_for_write().unwrap();
        let hash = update
            .get_document("$set")
            .unwrap()
            .get_str("password_hash")
            .unwrap();
        assert_ne!(hash, "brand new secret");
        assert!(argon2::verify_encoded(hash, b"brand new secret").unwrap());
    }

    #[test]
    fn role_names() {
        assert_eq!(Role::default(), Role::Voter);
        assert_eq!(Role::Admin.to_string(), "admin");
        assert!(ProfileChanges::default().is_empty());
    }
}
