use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A single vote, embedded in the candidate it was cast for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// The user who cast this vote.
    pub user: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub voted_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(user: Id) -> Self {
        Self {
            user,
            voted_at: Utc::now(),
        }
    }
}

/// Core candidate data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    pub party: String,
    #[serde(default)]
    pub age: Option<u32>,
    /// Votes in the order they were cast.
    #[serde(default)]
    pub votes: Vec<Vote>,
    /// Always equal to `votes.len()`; both are only ever changed together.
    #[serde(default)]
    pub vote_count: u64,
}

impl CandidateCore {
    /// Create a candidate with no votes.
    pub fn new(name: String, party: String, age: Option<u32>) -> Self {
        Self {
            name,
            party,
            age,
            votes: Vec::new(),
            vote_count: 0,
        }
    }

    /// Does the tally agree with the recorded votes?
    pub fn tally_is_consistent(&self) -> bool {
        self.vote_count == self.votes.len() as u64
    }
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example() -> Self {
            Self::new("Meera Iyer".to_string(), "Green Party".to_string(), Some(45))
        }

        pub fn example2() -> Self {
            Self::new("Rahul Das".to_string(), "Workers Front".to_string(), Some(52))
        }

        pub fn example3() -> Self {
            Self::new("Kavya Nair".to_string(), "Liberal Union".to_string(), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_candidates_have_no_votes() {
        let candidate = CandidateCore::example();
        assert_eq!(candidate.vote_count, 0);
        assert!(candidate.votes.is_empty());
        assert!(candidate.tally_is_consistent());
    }

    #[test]
    fn bson_round_trip_keeps_votes() {
        let mut candidate = CandidateCore::example();
        candidate.votes.push(Vote::new(Id::new()));
        candidate.vote_count = 1;

        let doc = mongodb::bson::to_document(&candidate).unwrap();
        assert_eq!(doc.get_array("votes").unwrap().len(), 1);
        let back: CandidateCore = mongodb::bson::from_document(doc).unwrap();
        assert!(back.tally_is_consistent());
        assert_eq!(back.votes[0].user, candidate.votes[0].user);
    }
}
