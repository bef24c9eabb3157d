// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Enquiry pipeline stages and the role rule for driving them.
//!
//! Backends accept any stage for any enquiry. The role rule is applied by
//! the calling client (see [`crate::workflow::EnquiryWorkflow`]) before the
//! repository is invoked.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::LeadflowError;
use crate::types::Role;

/// Position of an enquiry in the sales workflow.
///
/// Linear with two forks (demo or visit, converted or not interested) and
/// no cycles. The two closed stages are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum PipelineStage {
    #[serde(rename = "New")]
    #[strum(serialize = "New")]
    New,
    #[serde(rename = "Qualified")]
    #[strum(serialize = "Qualified")]
    Qualified,
    #[serde(rename = "Forwarded")]
    #[strum(serialize = "Forwarded")]
    Forwarded,
    #[serde(rename = "Contacted")]
    #[strum(serialize = "Contacted")]
    Contacted,
    #[serde(rename = "Demo Scheduled")]
    #[strum(serialize = "Demo Scheduled")]
    DemoScheduled,
    #[serde(rename = "Visit Scheduled")]
    #[strum(serialize = "Visit Scheduled")]
    VisitScheduled,
    #[serde(rename = "Demo/Visit Done")]
    #[strum(serialize = "Demo/Visit Done")]
    DemoVisitDone,
    #[serde(rename = "Delivery Scheduled")]
    #[strum(serialize = "Delivery Scheduled")]
    DeliveryScheduled,
    #[serde(rename = "Delivered")]
    #[strum(serialize = "Delivered")]
    Delivered,
    #[serde(rename = "Closed-Converted")]
    #[strum(serialize = "Closed-Converted")]
    ClosedConverted,
    #[serde(rename = "Closed-Not Interested")]
    #[strum(serialize = "Closed-Not Interested")]
    ClosedNotInterested,
}

impl PipelineStage {
    /// Stage every new enquiry starts in.
    pub const INITIAL: PipelineStage = PipelineStage::New;

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineStage::ClosedConverted | PipelineStage::ClosedNotInterested
        )
    }

    /// Stage whose entry fires the conversion notification.
    pub fn is_conversion(self) -> bool {
        self == PipelineStage::ClosedConverted
    }

    /// Forward edges of the pipeline graph.
    ///
    /// Used for UI hints only; backends do not validate edges.
    pub fn successors(self) -> &'static [PipelineStage] {
        use PipelineStage::*;
        match self {
            New => &[Qualified],
            Qualified => &[Forwarded],
            Forwarded => &[Contacted],
            Contacted => &[DemoScheduled, VisitScheduled],
            DemoScheduled | VisitScheduled => &[DemoVisitDone],
            DemoVisitDone => &[DeliveryScheduled],
            DeliveryScheduled => &[Delivered],
            Delivered => &[ClosedConverted, ClosedNotInterested],
            ClosedConverted | ClosedNotInterested => &[],
        }
    }

    /// All stages in pipeline order.
    pub fn all() -> impl Iterator<Item = PipelineStage> {
        PipelineStage::iter()
    }
}

/// Whether `role` may move an enquiry from `from` to `to`.
///
/// A caller may only qualify a new enquiry; every other transition needs an
/// administrative role.
pub fn may_transition(role: Role, from: PipelineStage, to: PipelineStage) -> bool {
    if role.is_administrative() {
        return true;
    }
    from == PipelineStage::New && to == PipelineStage::Qualified
}

/// [`may_transition`] as a `Result`, carrying a [`LeadflowError::Forbidden`].
pub fn authorize_transition(
    role: Role,
    from: PipelineStage,
    to: PipelineStage,
) -> Result<(), LeadflowError> {
    if may_transition(role, from, to) {
        Ok(())
    } else {
        Err(LeadflowError::Forbidden {
            role: role.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn eleven_stages_round_trip_through_display() {
        let stages: Vec<_> = PipelineStage::all().collect();
        assert_eq!(stages.len(), 11);
        for stage in stages {
            let parsed = PipelineStage::from_str(&stage.to_string()).unwrap();
            assert_eq!(parsed, stage);
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }

    #[test]
    fn terminal_stages_have_no_successors() {
        for stage in PipelineStage::all() {
            assert_eq!(stage.is_terminal(), stage.successors().is_empty());
        }
    }

    #[test]
    fn graph_has_no_cycles() {
        // Every edge moves strictly forward in declaration order.
        for stage in PipelineStage::all() {
            for next in stage.successors() {
                assert!(*next > stage, "{stage} -> {next} goes backwards");
            }
        }
    }

    #[test]
    fn every_stage_is_reachable_from_new() {
        let mut seen = vec![PipelineStage::New];
        let mut frontier = vec![PipelineStage::New];
        while let Some(stage) = frontier.pop() {
            for next in stage.successors() {
                if !seen.contains(next) {
                    seen.push(*next);
                    frontier.push(*next);
                }
            }
        }
        assert_eq!(seen.len(), 11);
    }

    #[test]
    fn caller_may_only_qualify() {
        use PipelineStage::*;
        assert!(may_transition(Role::Caller, New, Qualified));
        assert!(!may_transition(Role::Caller, Qualified, Forwarded));
        assert!(!may_transition(Role::Caller, New, Delivered));
        assert!(!may_transition(Role::Caller, Delivered, ClosedConverted));
    }

    #[test]
    fn administrators_may_drive_any_transition() {
        use PipelineStage::*;
        for role in [Role::Owner, Role::BranchAdmin] {
            assert!(may_transition(role, Qualified, Forwarded));
            assert!(may_transition(role, Delivered, ClosedNotInterested));
        }
    }

    #[test]
    fn forbidden_error_names_the_transition() {
        let err = authorize_transition(
            Role::Caller,
            PipelineStage::Qualified,
            PipelineStage::Delivered,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("caller"));
        assert!(msg.contains("Delivered"));
    }
}
