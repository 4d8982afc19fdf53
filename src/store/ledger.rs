use mongodb::{
    bson::{doc, Document},
    options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument},
    Database,
};
use rocket::{
    futures::TryStreamExt,
    outcome::try_outcome,
    request::{self, FromRequest, Request},
};

use crate::error::{Error, Result};
use crate::model::{
    api::candidate::{CandidateSpec, CandidateSummary, VoteCount},
    db::candidate::{Candidate, NewCandidate},
    mongodb::{Coll, Id},
};

/// Persistent candidates and their tallies.
///
/// The ledger never touches `votes` or `vote_count`; only the vote recorder does.
pub struct Ledger {
    candidates: Coll<Candidate>,
    new_candidates: Coll<NewCandidate>,
}

impl Ledger {
    pub fn from_db(db: &Database) -> Self {
        Self {
            candidates: Coll::from_db(db),
            new_candidates: Coll::from_db(db),
        }
    }

    pub async fn find(&self, id: Id) -> Result<Option<Candidate>> {
        Ok(self.candidates.find_one(id.as_doc(), None).await?)
    }

    pub async fn get(&self, id: Id) -> Result<Candidate> {
        self.find(id)
            .await?
            .ok_or_else(|| Error::not_found("Candidate"))
    }

    pub async fn create(&self, spec: CandidateSpec) -> Result<Candidate> {
        let candidate = spec.into_new_candidate()?;
        let id: Id = self
            .new_candidates
            .insert_one(&candidate, None)
            .await?
            .inserted_id
            .as_object_id()
            .ok_or_else(|| {
                Error::Internal("Inserted candidate has a non-ObjectId ID".to_string())
            })?
            .into();
        info!("Created candidate {id}");
        Ok(Candidate { id, candidate })
    }

    /// Update the given fields of a candidate, returning the new state.
    pub async fn update(&self, id: Id, spec: CandidateSpec) -> Result<Candidate> {
        let spec = spec.validate_update()?;
        if spec.is_empty() {
            return self.get(id).await;
        }

        let mut set = Document::new();
        if let Some(name) = spec.name {
            set.insert("name", name);
        }
        if let Some(party) = spec.party {
            set.insert("party", party);
        }
        if let Some(age) = spec.age {
            set.insert("age", i64::from(age));
        }

        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        let candidate = self
            .candidates
            .find_one_and_update(id.as_doc(), doc! { "$set": set }, options)
            .await?
            .ok_or_else(|| Error::not_found("Candidate"))?;
        info!("Updated candidate {id}");
        Ok(candidate)
    }

    /// Delete a candidate, returning what was deleted.
    pub async fn delete(&self, id: Id) -> Result<Candidate> {
        let candidate = self
            .candidates
            .find_one_and_delete(id.as_doc(), None)
            .await?
            .ok_or_else(|| Error::not_found("Candidate"))?;
        info!("Deleted candidate {id} with {} votes", candidate.vote_count);
        Ok(candidate)
    }

    /// Every candidate's name and party.
    pub async fn list(&self) -> Result<Vec<CandidateSummary>> {
        // Skip loading the vote lists.
        let options = FindOptions::builder()
            .projection(doc! { "name": 1, "party": 1 })
            .sort(doc! { "_id": 1 })
            .build();
        let summaries = self
            .candidates
            .clone_with_type::<CandidateSummary>()
            .find(None, options)
            .await?
            .try_collect()
            .await?;
        Ok(summaries)
    }

    /// The tally per candidate, highest first.
    pub async fn vote_counts(&self) -> Result<Vec<VoteCount>> {
        let options = FindOptions::builder()
            .sort(doc! { "vote_count": -1 })
            .build();
        let counts: Vec<VoteCount> = self
            .candidates
            .find(None, options)
            .await?
            .map_ok(VoteCount::from)
            .try_collect()
            .await?;
        Ok(counts)
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Ledger {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let candidates = try_outcome!(req.guard::<Coll<Candidate>>().await);
        let new_candidates = try_outcome!(req.guard::<Coll<NewCandidate>>().await);
        request::Outcome::Success(Ledger {
            candidates,
            new_candidates,
        })
    }
}
