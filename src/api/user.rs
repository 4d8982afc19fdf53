use rocket::{serde::json::Json, Route, State};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{current_user, require_admin, AuthToken},
            user::{
                LoginRequest, PasswordChange, ProfileResponse, ProfileUpdate,
                ProfileUpdateResponse, SignupRequest, SignupResponse, TokenResponse, UserSummary,
            },
            MessageResponse,
        },
        mongodb::Id,
    },
    store::Credentials,
    Config,
};

pub const PROFILE_UPDATED: &str = "Profile and/or password updated successfully";
pub const PROFILE_UNCHANGED: &str = "No changes were made, profile is already up to date";
pub const PASSWORD_UPDATED: &str = "Password updated successfully";

pub fn routes() -> Vec<Route> {
    routes![
        signup,
        login,
        list_users,
        profile,
        update_profile,
        change_password,
    ]
}

#[post("/user/signup", data = "<request>", format = "json")]
pub async fn signup(
    request: Json<SignupRequest>,
    credentials: Credentials,
    config: &State<Config>,
) -> Result<Json<SignupResponse>> {
    let user = credentials.create(request.into_inner()).await?;
    let token = AuthToken::issue(user.id, config)?;
    Ok(Json(SignupResponse {
        response: user.into(),
        token,
    }))
}

#[post("/user/login", data = "<request>", format = "json")]
pub async fn login(
    request: Json<LoginRequest>,
    credentials: Credentials,
    config: &State<Config>,
) -> Result<Json<TokenResponse>> {
    let (registration_number, password) = request.into_inner().into_parts()?;
    let user = credentials.login(&registration_number, &password).await?;
    let token = AuthToken::issue(user.id, config)?;
    Ok(Json(TokenResponse { token }))
}

#[get("/user")]
pub async fn list_users(
    token: AuthToken,
    credentials: Credentials,
) -> Result<Json<Vec<UserSummary>>> {
    require_admin(&token, &credentials).await?;
    let users = credentials
        .list()
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();
    Ok(Json(users))
}

#[get("/user/profile")]
pub async fn profile(token: AuthToken, credentials: Credentials) -> Result<Json<ProfileResponse>> {
    let user = current_user(&token, &credentials).await?;
    Ok(Json(ProfileResponse { user: user.into() }))
}

#[put("/user/profile/update/<user_id>", data = "<update>", format = "json")]
pub async fn update_profile(
    user_id: Id,
    token: AuthToken,
    update: Json<ProfileUpdate>,
    credentials: Credentials,
) -> Result<Json<ProfileUpdateResponse>> {
    if user_id != token.id {
        warn!("User {} attempted to update the profile of {user_id}", token.id);
        return Err(Error::Forbidden(
            "You can only update your own profile".to_string(),
        ));
    }
    let outcome = credentials.update_profile(user_id, update.into_inner()).await?;
    let message = if outcome.changed {
        PROFILE_UPDATED
    } else {
        PROFILE_UNCHANGED
    };
    Ok(Json(ProfileUpdateResponse {
        message: message.to_string(),
        user: outcome.user.into(),
    }))
}

#[put("/user/profile/password", data = "<change>", format = "json")]
pub async fn change_password(
    token: AuthToken,
    change: Json<PasswordChange>,
    credentials: Credentials,
) -> Result<Json<MessageResponse>> {
    credentials
        .change_password(token.id, change.into_inner())
        .await?;
    Ok(Json(MessageResponse::new(PASSWORD_UPDATED)))
}
