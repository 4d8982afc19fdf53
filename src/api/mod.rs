use rocket::{http::Status, serde::json::Json, Catcher, Request, Route};

use crate::error::{ErrorBody, FailureMessage, INTERNAL_ERROR_MESSAGE};

pub(crate) mod candidate;
pub(crate) mod user;

pub const WELCOME_MESSAGE: &str = "Welcome to Voting App";

pub fn routes() -> Vec<Route> {
    let mut routes = routes![index];
    routes.extend(user::routes());
    routes.extend(candidate::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![default_catcher]
}

#[get("/")]
pub fn index() -> &'static str {
    WELCOME_MESSAGE
}

/// Render every error Rocket produces itself (failed guards, unparseable
/// bodies, unknown routes) in the same JSON shape as handler errors.
#[catch(default)]
fn default_catcher(status: Status, req: &Request<'_>) -> (Status, Json<ErrorBody>) {
    // Malformed JSON is a bad request like any other validation failure.
    let status = if status == Status::UnprocessableEntity {
        Status::BadRequest
    } else {
        status
    };
    let message = match FailureMessage::get(req) {
        Some(message) => message.to_string(),
        None if status == Status::BadRequest => "Invalid request body".to_string(),
        None if status == Status::InternalServerError => INTERNAL_ERROR_MESSAGE.to_string(),
        None => status.reason_lossy().to_string(),
    };
    (status, Json(ErrorBody::new(message)))
}
