use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::id::ApiId,
    db::candidate::{Candidate, NewCandidate},
};

/// Candidate fields an admin may set. On update, absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateSpec {
    pub name: Option<String>,
    pub party: Option<String>,
    pub age: Option<u32>,
}

impl CandidateSpec {
    /// Reject present-but-blank text fields.
    fn check_not_blank(&self) -> Result<()> {
        for (field, value) in [("name", &self.name), ("party", &self.party)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                return Err(Error::Validation(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Validate a spec for a brand new candidate: name and party are required.
    pub fn into_new_candidate(self) -> Result<NewCandidate> {
        self.check_not_blank()?;
        match (self.name, self.party) {
            (Some(name), Some(party)) => Ok(NewCandidate::new(
                name.trim().to_string(),
                party.trim().to_string(),
                self.age,
            )),
            _ => Err(Error::Validation("name and party are required".to_string())),
        }
    }

    /// Validate a spec used as a partial update.
    pub fn validate_update(self) -> Result<Self> {
        self.check_not_blank()?;
        Ok(Self {
            name: self.name.map(|n| n.trim().to_string()),
            party: self.party.map(|p| p.trim().to_string()),
            age: self.age,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Public candidate listing entry. No IDs are exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub name: String,
    pub party: String,
}

impl From<Candidate> for CandidateSummary {
    fn from(candidate: Candidate) -> Self {
        Self {
            name: candidate.candidate.name,
            party: candidate.candidate.party,
        }
    }
}

/// One row of the public tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCount {
    pub party: String,
    pub count: u64,
}

impl From<Candidate> for VoteCount {
    fn from(candidate: Candidate) -> Self {
        Self {
            party: candidate.candidate.party,
            count: candidate.candidate.vote_count,
        }
    }
}

/// A candidate as returned to admins. Individual votes are not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: ApiId,
    pub name: String,
    pub party: String,
    pub age: Option<u32>,
    pub vote_count: u64,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            name: candidate.candidate.name,
            party: candidate.candidate.party,
            age: candidate.candidate.age,
            vote_count: candidate.candidate.vote_count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub response: CandidateDescription,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_candidates_need_name_and_party() {
        let candidate = CandidateSpec::example().into_new_candidate().unwrap();
        assert_eq!(candidate, NewCandidate::example());

        let missing_party = CandidateSpec {
            party: None,
            ..CandidateSpec::example()
        };
        assert!(matches!(
            missing_party.into_new_candidate(),
            Err(Error::Validation(_))
        ));

        let blank_name = CandidateSpec {
            name: Some("  ".into()),
            ..CandidateSpec::example()
        };
        assert!(matches!(
            blank_name.into_new_candidate(),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn updates_may_be_partial() {
        let update = CandidateSpec {
            party: Some(" Independent ".into()),
            ..Default::default()
        }
        .validate_update()
        .unwrap();
        assert_eq!(update.party.as_deref(), Some("Independent"));
        assert!(update.name.is_none());
        assert!(CandidateSpec::default().is_empty());
    }
}
