//! Helpers shared by the HTTP-level tests.

use rocket::{
    http::{ContentType, Header, Status},
    local::asynchronous::Client,
    serde::json::serde_json::json,
};

use crate::model::{
    api::{
        auth::{AUTHORIZATION, BEARER},
        user::{SignupRequest, SignupResponse},
    },
    mongodb::Id,
};

/// A user signed up through the API, with the token they were issued.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Id,
    pub token: String,
}

impl TestUser {
    pub async fn sign_up(client: &Client, request: SignupRequest) -> Self {
        let response = client
            .post(uri!(crate::api::user::signup))
            .header(ContentType::JSON)
            .body(json!(request).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let body = response.into_json::<SignupResponse>().await.unwrap();
        Self {
            id: body.response.id.into(),
            token: body.token,
        }
    }

    /// The `Authorization` header authenticating this user.
    pub fn auth_header(&self) -> Header<'static> {
        Header::new(AUTHORIZATION, format!("{BEARER}{}", self.token))
    }
}
