// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Client-side stage transitions with role enforcement.
//!
//! Repositories accept any `(id, stage, user)` triple. This is the path
//! staff sessions use, and it refuses to issue a transition the acting role
//! may not perform.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::LeadflowError;
use crate::pipeline::{self, PipelineStage};
use crate::traits::Repository;
use crate::types::{Enquiry, StageUpdate, User};

/// Stage transitions on behalf of one signed-in user.
pub struct EnquiryWorkflow {
    repository: Arc<dyn Repository>,
    actor: User,
}

impl EnquiryWorkflow {
    pub fn new(repository: Arc<dyn Repository>, actor: User) -> Self {
        Self { repository, actor }
    }

    pub fn actor(&self) -> &User {
        &self.actor
    }

    /// Successor stages the actor may move `enquiry` to.
    pub fn available_transitions(&self, enquiry: &Enquiry) -> Vec<PipelineStage> {
        enquiry
            .pipeline_stage
            .successors()
            .iter()
            .copied()
            .filter(|next| pipeline::may_transition(self.actor.role, enquiry.pipeline_stage, *next))
            .collect()
    }

    /// Moves an enquiry to `stage` if the actor's role allows it.
    ///
    /// The repository is not called when the role check fails. Returns
    /// `Ok(None)` when the enquiry does not exist.
    pub async fn advance(
        &self,
        enquiry_id: &str,
        stage: PipelineStage,
        notes: Option<String>,
        closed_amount: Option<f64>,
    ) -> Result<Option<Enquiry>, LeadflowError> {
        let Some(current) = self.repository.get_enquiry(enquiry_id).await? else {
            debug!(enquiry_id, "stage change for unknown enquiry");
            return Ok(None);
        };

        if let Err(e) = pipeline::authorize_transition(self.actor.role, current.pipeline_stage, stage) {
            warn!(
                enquiry_id,
                user_id = %self.actor.id,
                role = %self.actor.role,
                from = %current.pipeline_stage,
                to = %stage,
                "stage change refused"
            );
            return Err(e);
        }

        let update = StageUpdate {
            enquiry_id: enquiry_id.to_string(),
            stage,
            user_id: self.actor.id.clone(),
            notes,
            closed_amount,
        };
        self.repository.update_enquiry_stage(&update).await
    }
}
