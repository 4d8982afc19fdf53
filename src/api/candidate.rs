use rocket::{serde::json::Json, Route};

use crate::{
    error::Result,
    model::{
        api::{
            auth::{require_admin, AuthToken},
            candidate::{
                CandidateDescription, CandidateResponse, CandidateSpec, CandidateSummary,
                VoteCount,
            },
            MessageResponse,
        },
        mongodb::Id,
    },
    store::{Credentials, Ledger, VoteRecorder},
};

pub const VOTE_RECORDED: &str = "Vote recorded successfully";

pub fn routes() -> Vec<Route> {
    routes![
        list_candidates,
        vote_counts,
        create_candidate,
        cast_vote,
        update_candidate,
        delete_candidate,
    ]
}

#[get("/candidate")]
pub async fn list_candidates(ledger: Ledger) -> Result<Json<Vec<CandidateSummary>>> {
    Ok(Json(ledger.list().await?))
}

#[get("/candidate/vote/count")]
pub async fn vote_counts(ledger: Ledger) -> Result<Json<Vec<VoteCount>>> {
    Ok(Json(ledger.vote_counts().await?))
}

#[post("/candidate", data = "<spec>", format = "json")]
pub async fn create_candidate(
    token: AuthToken,
    spec: Json<CandidateSpec>,
    credentials: Credentials,
    ledger: Ledger,
) -> Result<Json<CandidateResponse>> {
    require_admin(&token, &credentials).await?;
    let candidate = ledger.create(spec.into_inner()).await?;
    Ok(Json(CandidateResponse {
        response: candidate.into(),
    }))
}

#[post("/candidate/vote/<candidate_id>")]
pub async fn cast_vote(
    candidate_id: Id,
    token: AuthToken,
    recorder: VoteRecorder,
) -> Result<Json<MessageResponse>> {
    recorder.cast_vote(candidate_id, token.id).await?;
    Ok(Json(MessageResponse::new(VOTE_RECORDED)))
}

#[put("/candidate/<candidate_id>", data = "<spec>", format = "json")]
pub async fn update_candidate(
    candidate_id: Id,
    token: AuthToken,
    spec: Json<CandidateSpec>,
    credentials: Credentials,
    ledger: Ledger,
) -> Result<Json<CandidateDescription>> {
    require_admin(&token, &credentials).await?;
    let candidate = ledger.update(candidate_id, spec.into_inner()).await?;
    Ok(Json(candidate.into()))
}

#[delete("/candidate/<candidate_id>")]
pub async fn delete_candidate(
    candidate_id: Id,
    token: AuthToken,
    credentials: Credentials,
    ledger: Ledger,
) -> Result<Json<CandidateDescription>> {
    require_admin(&token, &credentials).await?;
    let candidate = ledger.delete(candidate_id).await?;
    Ok(Json(candidate.into()))
}
