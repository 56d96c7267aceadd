use async_trait::async_trait;

use super::policy::{Action, PolicyTable, Resource};
use super::predicates;
use super::principal::{Principal, ResourceContext};

/// Policy evaluator trait for pluggable authorization logic
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Check if the principal may perform `action` on `resource`
    async fn can(&self, principal: &Principal, resource: Resource, action: Action, ctx: &ResourceContext) -> bool;
}

/// Evaluates requests against a [`PolicyTable`].
#[derive(Debug, Clone)]
pub struct DefaultPolicyEvaluator {
    table: PolicyTable,
}

impl DefaultPolicyEvaluator {
    pub fn new(table: PolicyTable) -> Self {
        Self { table }
    }
}

impl Default for DefaultPolicyEvaluator {
    fn default() -> Self {
        Self::new(PolicyTable::standard())
    }
}

#[async_trait]
impl PolicyEvaluator for DefaultPolicyEvaluator {
    async fn can(&self, principal: &Principal, resource: Resource, action: Action, ctx: &ResourceContext) -> bool {
        let allowed = self.table.rule(resource, action).evaluate(principal, ctx);

        tracing::debug!(
            user_id = %principal.user_id,
            resource = ?resource,
            action = ?action,
            admin = predicates::is_admin(principal),
            dive_officer = predicates::is_dive_officer(principal),
            regional_dive_officer = predicates::is_regional_dive_officer(principal),
            allowed,
            "policy decision"
        );

        allowed
    }
}
