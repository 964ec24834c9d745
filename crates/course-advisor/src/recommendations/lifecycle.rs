//! Accept/reject responses and soft deletion for persisted recommendations.
//!
//! Student and parent answers are tracked independently: either actor can accept or
//! reject regardless of what the other did, and a later answer from the same actor
//! replaces the earlier one. Deactivation is terminal; an inactive recommendation accepts
//! no further transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Actor, ActorResponse, Recommendation, RecommendationId, RecommendationStatus,
    ResponseDecision,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "actor")]
pub enum LifecycleAction {
    Accept(Actor),
    Reject(Actor),
    Deactivate,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("recommendation {0} is no longer active")]
    Inactive(RecommendationId),
}

impl Recommendation {
    pub fn response(&self, actor: Actor) -> &ActorResponse {
        match actor {
            Actor::Student => &self.student_response,
            Actor::Parent => &self.parent_response,
        }
    }

    fn response_mut(&mut self, actor: Actor) -> &mut ActorResponse {
        match actor {
            Actor::Student => &mut self.student_response,
            Actor::Parent => &mut self.parent_response,
        }
    }

    pub fn apply(
        &mut self,
        action: LifecycleAction,
        at: DateTime<Utc>,
    ) -> Result<(), LifecycleError> {
        if !self.active {
            return Err(LifecycleError::Inactive(self.id.clone()));
        }

        match action {
            LifecycleAction::Accept(actor) => self.record(actor, ResponseDecision::Accepted, at),
            LifecycleAction::Reject(actor) => self.record(actor, ResponseDecision::Rejected, at),
            LifecycleAction::Deactivate => self.active = false,
        }
        self.updated_at = at;
        Ok(())
    }

    fn record(&mut self, actor: Actor, decision: ResponseDecision, at: DateTime<Utc>) {
        *self.response_mut(actor) = ActorResponse {
            decision,
            responded_at: Some(at),
        };
    }

    /// Current per-actor states; `[Pending]` until someone answers.
    pub fn statuses(&self) -> Vec<RecommendationStatus> {
        let mut statuses = Vec::with_capacity(2);
        match self.student_response.decision {
            ResponseDecision::Accepted => statuses.push(RecommendationStatus::AcceptedByStudent),
            ResponseDecision::Rejected => statuses.push(RecommendationStatus::RejectedByStudent),
            ResponseDecision::Pending => {}
        }
        match self.parent_response.decision {
            ResponseDecision::Accepted => statuses.push(RecommendationStatus::AcceptedByParent),
            ResponseDecision::Rejected => statuses.push(RecommendationStatus::RejectedByParent),
            ResponseDecision::Pending => {}
        }
        if statuses.is_empty() {
            statuses.push(RecommendationStatus::Pending);
        }
        statuses
    }

    pub fn is_pending(&self) -> bool {
        self.student_response.decision == ResponseDecision::Pending
            && self.parent_response.decision == ResponseDecision::Pending
    }

    pub fn fully_approved(&self) -> bool {
        self.student_response.decision == ResponseDecision::Accepted
            && self.parent_response.decision == ResponseDecision::Accepted
    }

    pub fn any_rejected(&self) -> bool {
        self.student_response.decision == ResponseDecision::Rejected
            || self.parent_response.decision == ResponseDecision::Rejected
    }

    /// Someone still has to answer and nobody has turned it down.
    pub fn needs_approval(&self) -> bool {
        !self.any_rejected()
            && (self.student_response.decision == ResponseDecision::Pending
                || self.parent_response.decision == ResponseDecision::Pending)
    }
}
