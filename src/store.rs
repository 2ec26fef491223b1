//! In-memory storage for plans, challenges and submissions.
//!
//! Tables are `RwLock<HashMap>`s shared behind `Arc`s. When more than one table
//! is locked, the order is always plans, then challenges, then submissions.
//! Referential checks (challenge -> plan, unique order_index) are enforced here;
//! ownership checks belong to the service layer.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::domain::{Challenge, ChallengeStatus, Plan, PlanStatus, Submission};
use crate::error::ServiceError;
use crate::lifecycle;

#[derive(Clone, Default)]
pub struct Store {
    plans: Arc<RwLock<HashMap<Uuid, Plan>>>,
    challenges: Arc<RwLock<HashMap<Uuid, Challenge>>>,
    submissions: Arc<RwLock<HashMap<Uuid, Submission>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "debug", skip(self, plan), fields(plan_id = %plan.id))]
    pub async fn insert_plan(&self, plan: Plan) {
        self.plans.write().await.insert(plan.id, plan);
    }

    /// Add challenges to an existing plan. The whole batch is rejected if any
    /// order_index collides with an existing one or with another in the batch.
    #[instrument(level = "debug", skip(self, batch), fields(%plan_id, batch = batch.len()))]
    pub async fn append_challenges(&self, plan_id: Uuid, batch: Vec<Challenge>) -> Result<Vec<Challenge>, ServiceError> {
        let plans = self.plans.read().await;
        if !plans.contains_key(&plan_id) {
            return Err(ServiceError::not_found("plan", plan_id));
        }
        let mut challenges = self.challenges.write().await;

        let mut taken: HashSet<u32> = challenges
            .values()
            .filter(|c| c.plan_id == plan_id)
            .map(|c| c.order_index)
            .collect();
        for c in &batch {
            if c.plan_id != plan_id {
                return Err(ServiceError::Conflict(format!("challenge {} belongs to another plan", c.id)));
            }
            if !taken.insert(c.order_index) {
                return Err(ServiceError::Conflict(format!("order_index {} already used in plan {}", c.order_index, plan_id)));
            }
        }

        for c in &batch {
            challenges.insert(c.id, c.clone());
        }
        debug!(%plan_id, added = batch.len(), "Challenges appended");
        Ok(batch)
    }

    pub async fn get_plan(&self, id: Uuid) -> Option<Plan> {
        self.plans.read().await.get(&id).cloned()
    }

    /// Plans owned by `user_id`, newest first.
    pub async fn plans_for_user(&self, user_id: &str) -> Vec<Plan> {
        let mut plans: Vec<Plan> = self
            .plans
            .read()
            .await
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        plans
    }

    /// Apply `f` to a plan and bump its update timestamp.
    pub async fn update_plan<F>(&self, id: Uuid, now: DateTime<Utc>, f: F) -> Option<Plan>
    where
        F: FnOnce(&mut Plan),
    {
        let mut plans = self.plans.write().await;
        let plan = plans.get_mut(&id)?;
        f(plan);
        plan.updated_at = now;
        Some(plan.clone())
    }

    pub async fn set_plan_status(&self, id: Uuid, status: PlanStatus, now: DateTime<Utc>) -> Option<Plan> {
        self.update_plan(id, now, |p| p.status = status).await
    }

    /// Re-derive a plan's status from its current challenges under the plans
    /// write lock. Returns `(before, after)`; an archived plan stays archived.
    pub async fn refresh_plan_status(&self, id: Uuid, now: DateTime<Utc>) -> Option<(PlanStatus, PlanStatus)> {
        let mut plans = self.plans.write().await;
        let challenges = self.challenges.read().await;
        let plan = plans.get_mut(&id)?;
        let before = plan.status;
        let after = lifecycle::derive_plan_status(
            before,
            challenges.values().filter(|c| c.plan_id == id).map(|c| c.status),
        );
        if after != before {
            plan.status = after;
            plan.updated_at = now;
        }
        Some((before, after))
    }

    /// Remove a plan with its challenges and their submissions.
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_plan(&self, id: Uuid) -> Option<Plan> {
        let mut plans = self.plans.write().await;
        let mut challenges = self.challenges.write().await;
        let mut submissions = self.submissions.write().await;

        let plan = plans.remove(&id)?;
        let removed: HashSet<Uuid> = challenges
            .values()
            .filter(|c| c.plan_id == id)
            .map(|c| c.id)
            .collect();
        challenges.retain(|cid, _| !removed.contains(cid));
        submissions.retain(|_, s| !removed.contains(&s.challenge_id));
        debug!(plan_id = %id, challenges = removed.len(), "Plan deleted with its challenges");
        Some(plan)
    }

    pub async fn get_challenge(&self, id: Uuid) -> Option<Challenge> {
        self.challenges.read().await.get(&id).cloned()
    }

    /// Challenges of a plan ordered by `order_index`.
    pub async fn challenges_for_plan(&self, plan_id: Uuid) -> Vec<Challenge> {
        let mut out: Vec<Challenge> = self
            .challenges
            .read()
            .await
            .values()
            .filter(|c| c.plan_id == plan_id)
            .cloned()
            .collect();
        out.sort_by_key(|c| c.order_index);
        out
    }

    /// Compute the next status from the stored one and write it, under one write guard.
    pub async fn update_challenge_status<F>(&self, id: Uuid, now: DateTime<Utc>, next: F) -> Option<Challenge>
    where
        F: FnOnce(ChallengeStatus) -> ChallengeStatus,
    {
        let mut challenges = self.challenges.write().await;
        let c = challenges.get_mut(&id)?;
        let status = next(c.status);
        if c.status != status {
            c.status = status;
            c.updated_at = now;
        }
        Some(c.clone())
    }

    pub async fn set_challenge_status(&self, id: Uuid, status: ChallengeStatus, now: DateTime<Utc>) -> Option<Challenge> {
        self.update_challenge_status(id, now, |_| status).await
    }

    #[instrument(level = "debug", skip(self, submission), fields(submission_id = %submission.id, status = ?submission.status))]
    pub async fn insert_submission(&self, submission: Submission) -> Result<Submission, ServiceError> {
        if !self.challenges.read().await.contains_key(&submission.challenge_id) {
            return Err(ServiceError::not_found("challenge", submission.challenge_id));
        }
        self.submissions.write().await.insert(submission.id, submission.clone());
        Ok(submission)
    }

    pub async fn update_submission<F>(&self, id: Uuid, f: F) -> Option<Submission>
    where
        F: FnOnce(&mut Submission),
    {
        let mut submissions = self.submissions.write().await;
        let s = submissions.get_mut(&id)?;
        f(s);
        Some(s.clone())
    }

    pub async fn get_submission(&self, id: Uuid) -> Option<Submission> {
        self.submissions.read().await.get(&id).cloned()
    }

    /// Submissions by `user_id` on any of `challenge_ids`, oldest first.
    pub async fn submissions_for(&self, user_id: &str, challenge_ids: &HashSet<Uuid>) -> Vec<Submission> {
        let mut out: Vec<Submission> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|s| s.user_id == user_id && challenge_ids.contains(&s.challenge_id))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        out
    }
}
