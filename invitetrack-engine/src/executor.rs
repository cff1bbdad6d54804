//! Carries out a [`RoleChangePlan`].
//!
//! Revocations run first, then grants. A failed call is logged and recorded
//! in its [`MutationOutcome`]; it never stops the remaining calls and nothing
//! already applied is rolled back.

use invitetrack_core::{
    CollaboratorError, GuildId, MemberId, RevokeReason, RoleChangePlan, RoleId, GRANT_AUDIT_TEXT,
};

use crate::collaborators::RoleMutator;

/// A single role change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleMutation {
    Grant(RoleId),
    Revoke(RoleId, RevokeReason),
}

impl RoleMutation {
    pub fn role_id(&self) -> RoleId {
        match self {
            RoleMutation::Grant(role_id) | RoleMutation::Revoke(role_id, _) => *role_id,
        }
    }

    /// Audit log text for this change.
    pub fn reason(&self) -> &'static str {
        match self {
            RoleMutation::Grant(_) => GRANT_AUDIT_TEXT,
            RoleMutation::Revoke(_, reason) => reason.audit_text(),
        }
    }
}

/// Result of one attempted role change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub mutation: RoleMutation,
    pub result: Result<(), CollaboratorError>,
}

impl MutationOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }
}

/// The mutations a plan asks for, in execution order.
pub fn planned_mutations(plan: &RoleChangePlan) -> Vec<RoleMutation> {
    plan.roles_to_revoke
        .iter()
        .map(|(role_id, reason)| RoleMutation::Revoke(*role_id, *reason))
        .chain(plan.roles_to_grant.iter().map(|role_id| RoleMutation::Grant(*role_id)))
        .collect()
}

/// Apply every mutation in `plan`, collecting one outcome per call.
pub async fn apply_plan<M>(
    mutator: &M,
    guild_id: GuildId,
    member_id: MemberId,
    plan: &RoleChangePlan,
) -> Vec<MutationOutcome>
where
    M: RoleMutator + ?Sized,
{
    let mut outcomes = Vec::new();
    for mutation in planned_mutations(plan) {
        let result = match mutation {
            RoleMutation::Grant(role_id) => {
                mutator
                    .grant_role(guild_id, member_id, role_id, mutation.reason())
                    .await
            }
            RoleMutation::Revoke(role_id, _) => {
                mutator
                    .revoke_role(guild_id, member_id, role_id, mutation.reason())
                    .await
            }
        };

        if let Err(e) = &result {
            tracing::warn!(
                %guild_id,
                %member_id,
                role_id = %mutation.role_id(),
                error = %e,
                "Rank role change failed"
            );
        }
        outcomes.push(MutationOutcome { mutation, result });
    }
    outcomes
}
