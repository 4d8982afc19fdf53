use mongodb::{
    bson::{doc, to_bson, Document},
    options::FindOneOptions,
    Client, ClientSession, Database,
};
use rocket::{
    outcome::try_outcome,
    request::{self, FromRequest, Request},
    State,
};

use crate::error::{Error, Result};
use crate::model::{
    db::{
        candidate::{Candidate, Vote},
        user::{Role, User},
    },
    mongodb::{Coll, Id},
};

/// Records votes, keeping the candidate tally and the voter's has-voted flag in step.
pub struct VoteRecorder {
    client: Client,
    candidates: Coll<Candidate>,
    users: Coll<User>,
}

impl VoteRecorder {
    pub fn new(client: &Client, db: &Database) -> Self {
        Self {
            client: client.clone(),
            candidates: Coll::from_db(db),
            users: Coll::from_db(db),
        }
    }

    /// Cast `voter_id`'s one and only vote for `candidate_id`.
    ///
    /// Both writes happen in a single transaction, and the voter is only marked
    /// if they were still unmarked, so a user's vote is counted at most once
    /// even when requests race.
    pub async fn cast_vote(&self, candidate_id: Id, voter_id: Id) -> Result<()> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        match self.record(&mut session, candidate_id, voter_id).await {
            Ok(()) => {
                session.commit_transaction().await?;
                info!("Recorded vote by user {voter_id} for candidate {candidate_id}");
                Ok(())
            }
            Err(err) => {
                // The server may already have aborted it.
                if let Err(abort_err) = session.abort_transaction().await {
                    warn!("Failed to abort vote transaction: {abort_err}");
                }
                Err(err)
            }
        }
    }

    async fn record(
        &self,
        session: &mut ClientSession,
        candidate_id: Id,
        voter_id: Id,
    ) -> Result<()> {
        let id_only = FindOneOptions::builder()
            .projection(doc! { "_id": 1 })
            .build();
        self.candidates
            .clone_with_type::<Document>()
            .find_one_with_session(candidate_id.as_doc(), id_only, session)
            .await?
            .ok_or_else(|| Error::not_found("Candidate"))?;

        let voter = self
            .users
            .find_one_with_session(voter_id.as_doc(), None, session)
            .await?
            .ok_or_else(|| Error::not_found("User"))?;
        if voter.is_admin() {
            return Err(Error::Forbidden("Admins are not allowed to vote".to_string()));
        }
        if voter.has_voted {
            return Err(Error::AlreadyVoted);
        }

        // Push and increment together, so the count always matches the list.
        let vote = to_bson(&Vote::new(voter_id))?;
        let tally = doc! {
            "$push": { "votes": vote },
            "$inc": { "vote_count": 1 },
        };
        self.candidates
            .update_one_with_session(candidate_id.as_doc(), tally, None, session)
            .await?;

        // Only flips an unset flag; anyone who got here first wins.
        let unvoted = doc! {
            "_id": *voter_id,
            "role": Role::Voter.as_str(),
            "has_voted": false,
        };
        let marked = self
            .users
            .update_one_with_session(unvoted, doc! { "$set": { "has_voted": true } }, None, session)
            .await?;
        if marked.modified_count != 1 {
            return Err(Error::AlreadyVoted);
        }
        Ok(())
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for VoteRecorder {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let client = try_outcome!(req.guard::<&State<Client>>().await);
        let db = try_outcome!(req.guard::<&State<Database>>().await);
        request::Outcome::Success(VoteRecorder::new(client, db))
    }
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{local::asynchronous::Client, tokio::join};

    use super::*;
    use crate::model::{
        api::{candidate::CandidateSpec, user::SignupRequest},
        db::candidate::NewCandidate,
    };
    use crate::store::{Credentials, Ledger};

    /// A recorder sharing the server's connection.
    fn recorder(client: &Client) -> VoteRecorder {
        let rocket = client.rocket();
        VoteRecorder::new(
            rocket.state::<mongodb::Client>().unwrap(),
            rocket.state::<Database>().unwrap(),
        )
    }

    #[backend_test]
    async fn vote_once(client: Client, db: Database) {
        let credentials = Credentials::from_db(&db);
        let ledger = Ledger::from_db(&db);
        let voter = credentials.create(SignupRequest::example()).await.unwrap();
        let first = ledger.create(CandidateSpec::example()).await.unwrap();
        let second = ledger
            .create(CandidateSpec {
                name: Some("Rahul Das".into()),
                party: Some("Workers Front".into()),
                age: None,
            })
            .await
            .unwrap();

        let recorder = recorder(&client);
        recorder.cast_vote(first.id, voter.id).await.unwrap();

        let voted_for = ledger.get(first.id).await.unwrap();
        assert_eq!(voted_for.vote_count, 1);
        assert!(voted_for.tally_is_consistent());
        assert_eq!(voted_for.votes[0].user, voter.id);
        assert!(credentials.get(voter.id).await.unwrap().has_voted);

        // Any second vote fails, whichever candidate it is for.
        for candidate in [first.id, second.id] {
            assert!(matches!(
                recorder.cast_vote(candidate, voter.id).await,
                Err(Error::AlreadyVoted)
            ));
        }
        assert_eq!(ledger.get(first.id).await.unwrap().vote_count, 1);
        assert_eq!(ledger.get(second.id).await.unwrap().vote_count, 0);
    }

    #[backend_test]
    async fn vote_preconditions(client: Client, db: Database, candidates: Coll<NewCandidate>) {
        let credentials = Credentials::from_db(&db);
        let admin = credentials
            .create(SignupRequest::example_admin())
            .await
            .unwrap();
        let voter = credentials.create(SignupRequest::example()).await.unwrap();
        let candidate_id: Id = candidates
            .insert_one(NewCandidate::example(), None)
            .await
            .unwrap()
            .inserted_id
            .as_object_id()
            .unwrap()
            .into();
        let recorder = recorder(&client);

        // Missing candidate comes first, even for an admin.
        assert!(matches!(
            recorder.cast_vote(Id::new(), admin.id).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            recorder.cast_vote(candidate_id, Id::new()).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            recorder.cast_vote(candidate_id, admin.id).await,
            Err(Error::Forbidden(_))
        ));

        // Nothing was written by the failed attempts.
        let ledger = Ledger::from_db(&db);
        let candidate = ledger.get(candidate_id).await.unwrap();
        assert_eq!(candidate.vote_count, 0);
        assert!(candidate.votes.is_empty());
        assert!(!credentials.get(voter.id).await.unwrap().has_voted);
    }

    #[backend_test]
    async fn racing_votes_count_once(client: Client, db: Database) {
        let credentials = Credentials::from_db(&db);
        let ledger = Ledger::from_db(&db);
        let voter = credentials.create(SignupRequest::example()).await.unwrap();
        let first = ledger.create(CandidateSpec::example()).await.unwrap();
        let second = ledger
            .create(CandidateSpec {
                name: Some("Kavya Nair".into()),
                party: Some("Liberal Union".into()),
                age: None,
            })
            .await
            .unwrap();

        let recorder = recorder(&client);
        let (a, b) = join!(
            recorder.cast_vote(first.id, voter.id),
            recorder.cast_vote(second.id, voter.id)
        );
        assert!(a.is_ok() != b.is_ok(), "exactly one vote should succeed");

        let total: u64 = ledger
            .vote_counts()
            .await
            .unwrap()
            .iter()
            .map(|count| count.count)
            .sum();
        assert_eq!(total, 1);
        for id in [first.id, second.id] {
            assert!(ledger.get(id).await.unwrap().tally_is_consistent());
        }
    }
}
