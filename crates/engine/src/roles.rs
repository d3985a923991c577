use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use exemptd_core::{CustomerId, EXEMPT_ROLE};

use crate::error::EngineError;

/// In-flight role representations carried by the current save request.
///
/// External role-aggregation mechanisms submit their own role fields
/// alongside the profile form; if those fields are present they must be
/// rewritten to agree with the derived exemption state, or the aggregation
/// mechanism would clobber the canonical grant right back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleContext {
    /// A multi-role checklist: list of role slugs.
    pub multi_roles: Option<Vec<String>>,
    /// A comma-joined role string.
    pub joined_roles: Option<String>,
}

/// Canonical grant/revoke of a role tag on a customer identity.
#[async_trait]
pub trait RoleBackend: Send + Sync {
    async fn grant(&self, customer: CustomerId, role: &str) -> Result<(), EngineError>;
    async fn revoke(&self, customer: CustomerId, role: &str) -> Result<(), EngineError>;

    /// Returns `true` if the customer currently holds the role.
    async fn has_role(&self, customer: CustomerId, role: &str) -> Result<bool, EngineError>;
}

/// Rewrites one in-flight role representation to match the exempt state.
///
/// Rewriters are tried in order; each patches only the representation it
/// understands and leaves the context untouched otherwise.
pub trait RoleRewriter: Send + Sync {
    fn rewrite(&self, ctx: &mut RoleContext, role: &str, exempt: bool);
}

/// Rewriter for a multi-role checklist (list of role slugs).
pub struct MultiRoleListRewriter;

impl RoleRewriter for MultiRoleListRewriter {
    fn rewrite(&self, ctx: &mut RoleContext, role: &str, exempt: bool) {
        let Some(roles) = ctx.multi_roles.as_mut() else {
            return;
        };
        if exempt {
            if !roles.iter().any(|r| r == role) {
                roles.push(role.to_owned());
            }
        } else {
            roles.retain(|r| r != role);
        }
    }
}

/// Rewriter for a comma-joined role string (`"editor, tax_exempt"`).
pub struct JoinedRoleStringRewriter;

impl RoleRewriter for JoinedRoleStringRewriter {
    fn rewrite(&self, ctx: &mut RoleContext, role: &str, exempt: bool) {
        let Some(joined) = ctx.joined_roles.as_mut() else {
            return;
        };
        let mut roles: Vec<String> = joined
            .split(',')
            .map(|r| r.trim().to_owned())
            .filter(|r| !r.is_empty())
            .collect();
        if exempt {
            if !roles.iter().any(|r| r == role) {
                roles.push(role.to_owned());
            }
        } else {
            roles.retain(|r| r != role);
        }
        *joined = roles.join(", ");
    }
}

/// Reconciles role membership with the derived exemption state.
///
/// Every rewriter patches the in-flight context first; the canonical
/// backend grant/revoke then runs unconditionally, so membership is correct
/// even when no aggregation mechanism is present.
pub struct RoleAssigner {
    rewriters: Vec<Box<dyn RoleRewriter>>,
    backend: Arc<dyn RoleBackend>,
    role: String,
}

impl RoleAssigner {
    /// Create an assigner for the standard exempt role with the default
    /// rewriter chain.
    pub fn new(backend: Arc<dyn RoleBackend>) -> Self {
        Self {
            rewriters: vec![
                Box::new(MultiRoleListRewriter),
                Box::new(JoinedRoleStringRewriter),
            ],
            backend,
            role: EXEMPT_ROLE.to_owned(),
        }
    }

    /// Create an assigner with a custom rewriter chain and role tag.
    pub fn with_rewriters(
        backend: Arc<dyn RoleBackend>,
        rewriters: Vec<Box<dyn RoleRewriter>>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            rewriters,
            backend,
            role: role.into(),
        }
    }

    /// The role tag this assigner manages.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Reconcile membership to `exempt`, patching `ctx` along the way.
    pub async fn reconcile(
        &self,
        customer: CustomerId,
        ctx: &mut RoleContext,
        exempt: bool,
    ) -> Result<(), EngineError> {
        for rewriter in &self.rewriters {
            rewriter.rewrite(ctx, &self.role, exempt);
        }

        debug!(%customer, exempt, role = %self.role, "reconciling role membership");
        if exempt {
            self.backend.grant(customer, &self.role).await
        } else {
            self.backend.revoke(customer, &self.role).await
        }
    }
}

/// In-memory role backend.
#[derive(Debug, Default)]
pub struct MemoryRoleBackend {
    roles: DashMap<CustomerId, BTreeSet<String>>,
}

impl MemoryRoleBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleBackend for MemoryRoleBackend {
    async fn grant(&self, customer: CustomerId, role: &str) -> Result<(), EngineError> {
        self.roles.entry(customer).or_default().insert(role.to_owned());
        Ok(())
    }

    async fn revoke(&self, customer: CustomerId, role: &str) -> Result<(), EngineError> {
        if let Some(mut roles) = self.roles.get_mut(&customer) {
            roles.remove(role);
        }
        Ok(())
    }

    async fn has_role(&self, customer: CustomerId, role: &str) -> Result<bool, EngineError> {
        Ok(self
            .roles
            .get(&customer)
            .is_some_and(|roles| roles.contains(role)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn assigner_reconciles_canonical_backend() {
        let backend = Arc::new(MemoryRoleBackend::new());
        let assigner = RoleAssigner::new(backend.clone());
        let customer = CustomerId::new(1);
        let mut ctx = RoleContext::default();

        assigner.reconcile(customer, &mut ctx, true).await.unwrap();
        assert!(backend.has_role(customer, EXEMPT_ROLE).await.unwrap());

        assigner.reconcile(customer, &mut ctx, false).await.unwrap();
        assert!(!backend.has_role(customer, EXEMPT_ROLE).await.unwrap());
    }

    #[tokio::test]
    async fn multi_role_list_is_patched() {
        let backend = Arc::new(MemoryRoleBackend::new());
        let assigner = RoleAssigner::new(backend);
        let customer = CustomerId::new(2);

        let mut ctx = RoleContext {
            multi_roles: Some(vec!["customer".into()]),
            joined_roles: None,
        };
        assigner.reconcile(customer, &mut ctx, true).await.unwrap();
        assert_eq!(
            ctx.multi_roles.as_deref(),
            Some(&["customer".to_owned(), EXEMPT_ROLE.to_owned()][..])
        );

        // Granting again does not duplicate the entry.
        assigner.reconcile(customer, &mut ctx, true).await.unwrap();
        assert_eq!(ctx.multi_roles.as_ref().unwrap().len(), 2);

        assigner.reconcile(customer, &mut ctx, false).await.unwrap();
        assert_eq!(ctx.multi_roles.as_deref(), Some(&["customer".to_owned()][..]));
    }

    #[tokio::test]
    async fn joined_role_string_is_patched() {
        let backend = Arc::new(MemoryRoleBackend::new());
        let assigner = RoleAssigner::new(backend);
        let customer = CustomerId::new(3);

        let mut ctx = RoleContext {
            multi_roles: None,
            joined_roles: Some("editor, shop_manager".into()),
        };
        assigner.reconcile(customer, &mut ctx, true).await.unwrap();
        assert_eq!(
            ctx.joined_roles.as_deref(),
            Some("editor, shop_manager, tax_exempt")
        );

        assigner.reconcile(customer, &mut ctx, false).await.unwrap();
        assert_eq!(ctx.joined_roles.as_deref(), Some("editor, shop_manager"));
    }

    #[tokio::test]
    async fn absent_context_fields_are_left_alone() {
        let backend = Arc::new(MemoryRoleBackend::new());
        let assigner = RoleAssigner::new(backend);
        let mut ctx = RoleContext::default();
        assigner
            .reconcile(CustomerId::new(4), &mut ctx, true)
            .await
            .unwrap();
        assert_eq!(ctx, RoleContext::default());
    }
}
