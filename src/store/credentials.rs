use mongodb::{
    bson::{doc, Document},
    error::Error as DbError,
    options::{FindOneAndUpdateOptions, ReturnDocument},
    Database,
};
use rocket::{
    futures::TryStreamExt,
    outcome::try_outcome,
    request::{self, FromRequest, Request},
};

use crate::error::{Error, Result};
use crate::model::{
    api::user::{PasswordChange, ProfileUpdate, SignupRequest},
    db::user::{NewUser, ProfileChanges, Role, User, UserCore},
    mongodb::{duplicate_key_message, Coll, Id, SINGLE_ADMIN_INDEX},
};

const ADMIN_EXISTS: &str = "Admin user already exists";

/// Persistent user records. Owns password hashing and verification.
pub struct Credentials {
    users: Coll<User>,
    new_users: Coll<NewUser>,
}

/// The result of a profile update.
#[derive(Debug)]
pub struct ProfileUpdateOutcome {
    pub user: User,
    /// False if every submitted field already matched, in which case nothing was written.
    pub changed: bool,
}

impl Credentials {
    pub fn from_db(db: &Database) -> Self {
        Self {
            users: Coll::from_db(db),
            new_users: Coll::from_db(db),
        }
    }

    pub async fn find(&self, id: Id) -> Result<Option<User>> {
        Ok(self.users.find_one(id.as_doc(), None).await?)
    }

    /// Like [`Credentials::find`], but a missing user is an error.
    pub async fn get(&self, id: Id) -> Result<User> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::not_found("User"))
    }

    pub async fn find_by_registration_number(&self, number: &str) -> Result<Option<User>> {
        let filter = doc! { "registration_number": number };
        Ok(self.users.find_one(filter, None).await?)
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        Ok(self.users.find(None, None).await?.try_collect().await?)
    }

    pub async fn admin_exists(&self) -> Result<bool> {
        let filter = doc! { "role": Role::Admin.as_str() };
        Ok(self.users.find_one(filter, None).await?.is_some())
    }

    /// Register a new user, hashing their password before it is stored.
    pub async fn create(&self, request: SignupRequest) -> Result<User> {
        let draft = request.validate()?;

        if draft.role == Role::Admin && self.admin_exists().await? {
            return Err(Error::Conflict(ADMIN_EXISTS.to_string()));
        }

        let clash = doc! {
            "$or": [
                { "registration_number": draft.registration_number.as_str() },
                { "email": draft.email.as_str() },
                { "mobile": draft.mobile.as_str() },
            ]
        };
        if let Some(existing) = self.users.find_one(clash, None).await? {
            let field = if existing.registration_number == draft.registration_number {
                "registration number"
            } else if existing.email == draft.email {
                "email"
            } else {
                "mobile number"
            };
            return Err(Error::Conflict(format!(
                "User with the same {field} already exists"
            )));
        }

        let new_user = draft.prepare_for_write()?;
        let inserted = self
            .new_users
            .insert_one(&new_user, None)
            .await
            .map_err(conflict_or_db)?;
        let id: Id = inserted
            .inserted_id
            .as_object_id()
            .ok_or_else(|| Error::Internal("Inserted user has a non-ObjectId ID".to_string()))?
            .into();

        info!("Created {} {id}", new_user.role);
        Ok(User { id, user: new_user })
    }

    /// Check a password against the stored hash for the given registration number.
    pub async fn verify(&self, registration_number: &str, password: &str) -> Result<bool> {
        let user = self
            .find_by_registration_number(registration_number)
            .await?
            .ok_or_else(invalid_credentials)?;
        user.verify_password(password)
    }

    /// Look up a user by their login credentials.
    pub async fn login(&self, registration_number: &str, password: &str) -> Result<User> {
        if !self.verify(registration_number, password).await? {
            return Err(invalid_credentials());
        }
        // Deleted between the two reads.
        self.find_by_registration_number(registration_number)
            .await?
            .ok_or_else(invalid_credentials)
    }

    /// Apply the fields of `update` that differ from the stored profile.
    pub async fn update_profile(&self, id: Id, update: ProfileUpdate) -> Result<ProfileUpdateOutcome> {
        let user = self.get(id).await?;

        if let Some(number) = update.registration_number.as_ref().filter(|n| !n.is_blank()) {
            if number.to_text() != user.registration_number.as_str() {
                return Err(Error::ImmutableField(
                    "Registration number cannot be updated".to_string(),
                ));
            }
        }

        let mut changes = diff_profile(&user, &update);

        if let Some(new_password) = update.new_password.filter(|p| !p.is_empty()) {
            let current = update.current_password.unwrap_or_default();
            if !user.verify_password(&current)? {
                return Err(Error::Auth("Current password is incorrect".to_string()));
            }
            changes.password = Some(new_password);
        }

        if changes.is_empty() {
            return Ok(ProfileUpdateOutcome {
                user,
                changed: false,
            });
        }

        self.check_contact_clash(id, &changes).await?;
        let updated = self.apply(id, changes).await?;
        info!("Updated profile of user {id}");
        Ok(ProfileUpdateOutcome {
            user: updated,
            changed: true,
        })
    }

    /// Replace a user's password, given their current one.
    pub async fn change_password(&self, id: Id, change: PasswordChange) -> Result<()> {
        let (current, new) = match (change.current_password, change.new_password) {
            (Some(current), Some(new)) if !current.is_empty() && !new.is_empty() => (current, new),
            _ => {
                return Err(Error::Validation(
                    "Both currentPassword and newPassword are required".to_string(),
                ))
            }
        };

        let verified = match self.find(id).await? {
            Some(user) => user.verify_password(&current)?,
            None => false,
        };
        if !verified {
            return Err(Error::Auth("Invalid current password".to_string()));
        }

        let changes = ProfileChanges {
            password: Some(new),
            ..Default::default()
        };
        self.apply(id, changes).await?;
        info!("Password updated for user {id}");
        Ok(())
    }

    /// Another user already holding the new email or mobile is a conflict.
    async fn check_contact_clash(&self, id: Id, changes: &ProfileChanges) -> Result<()> {
        let mut clauses: Vec<Document> = Vec::new();
        if let Some(email) = &changes.email {
            clauses.push(doc! { "email": email.as_str() });
        }
        if let Some(mobile) = &changes.mobile {
            clauses.push(doc! { "mobile": mobile.as_str() });
        }
        if clauses.is_empty() {
            return Ok(());
        }
        let filter = doc! { "_id": { "$ne": *id }, "$or": clauses };
        if self.users.find_one(filter, None).await?.is_some() {
            return Err(Error::Conflict(
                "Email or mobile number is already in use".to_string(),
            ));
        }
        Ok(())
    }

    /// Write prepared changes and return the updated record.
    async fn apply(&self, id: Id, changes: ProfileChanges) -> Result<User> {
        let update = changes.prepare_for_write()?;
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.users
            .find_one_and_update(id.as_doc(), update, options)
            .await
            .map_err(conflict_or_db)?
            .ok_or_else(|| Error::not_found("User"))
    }
}

/// Work out which submitted fields actually change the stored profile.
fn diff_profile(user: &UserCore, update: &ProfileUpdate) -> ProfileChanges {
    fn changed(new: &Option<String>, current: &str) -> Option<String> {
        new.as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != current)
            .map(str::to_string)
    }

    ProfileChanges {
        name: changed(&update.name, &user.name),
        age: update.age.filter(|age| Some(*age) != user.age),
        email: changed(&update.email.as_ref().map(|e| e.to_lowercase()), &user.email),
        mobile: changed(&update.mobile, &user.mobile),
        address: changed(&update.address, &user.address),
        password: None,
    }
}

fn invalid_credentials() -> Error {
    Error::Auth("Invalid registration number or password".to_string())
}

/// Turn unique index violations into conflicts; anything else stays a database error.
fn conflict_or_db(err: DbError) -> Error {
    match duplicate_key_message(&err) {
        Some(message) if message.contains(SINGLE_ADMIN_INDEX) => {
            Error::Conflict(ADMIN_EXISTS.to_string())
        }
        Some(_) => Error::Conflict(
            "User with the same email, mobile number or registration number already exists"
                .to_string(),
        ),
        None => err.into(),
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Credentials {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let users = try_outcome!(req.guard::<Coll<User>>().await);
        let new_users = try_outcome!(req.guard::<Coll<NewUser>>().await);
        request::Outcome::Success(Credentials { users, new_users })
    }
}
