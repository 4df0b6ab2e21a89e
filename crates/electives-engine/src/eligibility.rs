//! Team-based eligibility rule.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use electives_core::types::TeamId;
use electives_entity::{Elective, Subject};

/// Why a student may not select a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum IneligibilityReason {
    /// The elective is restricted to a team the student is not in.
    ElectiveTeamRequired {
        /// The required team.
        team_id: TeamId,
    },
    /// The subject is restricted to a team the student is not in.
    SubjectTeamRequired {
        /// The required team.
        team_id: TeamId,
    },
}

impl fmt::Display for IneligibilityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ElectiveTeamRequired { team_id } => {
                write!(f, "elective requires membership of team {team_id}")
            }
            Self::SubjectTeamRequired { team_id } => {
                write!(f, "subject requires membership of team {team_id}")
            }
        }
    }
}

/// Result of evaluating the eligibility rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Eligibility {
    /// Both team restrictions are satisfied.
    Eligible,
    /// At least one restriction failed.
    Ineligible(IneligibilityReason),
}

impl Eligibility {
    /// Whether the student is eligible.
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible)
    }
}

/// Evaluate whether a member of `student_teams` may select `subject` of
/// `elective`.
///
/// The elective and subject restrictions are checked independently; both
/// must hold. The elective-level reason wins when both fail.
pub fn evaluate(
    student_teams: &HashSet<TeamId>,
    elective: &Elective,
    subject: &Subject,
) -> Eligibility {
    if let Some(team_id) = elective.team_id {
        if !student_teams.contains(&team_id) {
            return Eligibility::Ineligible(IneligibilityReason::ElectiveTeamRequired { team_id });
        }
    }

    if let Some(team_id) = subject.team_id {
        if !student_teams.contains(&team_id) {
            return Eligibility::Ineligible(IneligibilityReason::SubjectTeamRequired { team_id });
        }
    }

    Eligibility::Eligible
}

/// Whether a member of `student_teams` may see `elective` at all.
pub fn can_view(student_teams: &HashSet<TeamId>, elective: &Elective) -> bool {
    elective
        .team_id
        .is_none_or(|team_id| student_teams.contains(&team_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use electives_core::types::{ElectiveId, SubjectId};

    fn elective(team_id: Option<TeamId>) -> Elective {
        Elective {
            id: ElectiveId::new(),
            name: "Languages".to_string(),
            description: None,
            team_id,
            start_date: None,
            end_date: None,
            created_at: Utc::now(),
        }
    }

    fn subject(elective: &Elective, team_id: Option<TeamId>) -> Subject {
        Subject {
            id: SubjectId::new(),
            elective_id: elective.id,
            name: "Japanese".to_string(),
            description: None,
            team_id,
            capacity: 10,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_unrestricted_is_eligible() {
        let e = elective(None);
        let s = subject(&e, None);
        assert!(evaluate(&HashSet::new(), &e, &s).is_eligible());
    }

    #[test]
    fn test_elective_team_mismatch() {
        let t1 = TeamId::new();
        let t2 = TeamId::new();
        let e = elective(Some(t2));
        let s = subject(&e, None);

        let result = evaluate(&HashSet::from([t1]), &e, &s);
        assert_eq!(
            result,
            Eligibility::Ineligible(IneligibilityReason::ElectiveTeamRequired { team_id: t2 })
        );
    }

    #[test]
    fn test_subject_membership_does_not_satisfy_elective() {
        let elective_team = TeamId::new();
        let subject_team = TeamId::new();
        let e = elective(Some(elective_team));
        let s = subject(&e, Some(subject_team));

        let result = evaluate(&HashSet::from([subject_team]), &e, &s);
        assert_eq!(
            result,
            Eligibility::Ineligible(IneligibilityReason::ElectiveTeamRequired {
                team_id: elective_team
            })
        );
    }

    #[test]
    fn test_elective_membership_does_not_satisfy_subject() {
        let elective_team = TeamId::new();
        let subject_team = TeamId::new();
        let e = elective(Some(elective_team));
        let s = subject(&e, Some(subject_team));

        let result = evaluate(&HashSet::from([elective_team]), &e, &s);
        assert_eq!(
            result,
            Eligibility::Ineligible(IneligibilityReason::SubjectTeamRequired {
                team_id: subject_team
            })
        );

        let both = HashSet::from([elective_team, subject_team]);
        assert!(evaluate(&both, &e, &s).is_eligible());
    }

    #[test]
    fn test_can_view() {
        let team = TeamId::new();
        assert!(can_view(&HashSet::new(), &elective(None)));
        assert!(!can_view(&HashSet::new(), &elective(Some(team))));
        assert!(can_view(&HashSet::from([team]), &elective(Some(team))));
    }
}
