//! Permission resolution against the store.
//!
//! Gathers the part of the grant graph that reaches one user into a
//! [`SubjectGrants`] snapshot and hands it to the pure fold in
//! [`warrant_core::resolve`].

use std::collections::HashMap;
use std::sync::Arc;

use warrant_core::resolve::resolve;
use warrant_core::{
    GrantEdge, GroupGrants, GroupId, RoleGrants, RoleId, Subject, SubjectGrants, Target, UserId,
};
use warrant_store::Store;

use crate::error::Result;

/// Resolves a user's effective permissions.
pub struct PermissionResolver<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for PermissionResolver<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> PermissionResolver<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Effective permissions of `user`, sorted by name. No side effects.
    pub async fn resolve(&self, user: UserId) -> Result<Vec<String>> {
        let grants = self.subject_grants(user).await?;
        let permissions = resolve(&grants);
        tracing::debug!(user = %user, count = permissions.len(), "resolved permissions");
        Ok(permissions)
    }

    /// Collect every edge that can reach `user`.
    ///
    /// Each role's grants are fetched once even if several paths reach it.
    pub async fn subject_grants(&self, user: UserId) -> Result<SubjectGrants> {
        let mut role_cache: HashMap<RoleId, Vec<GrantEdge>> = HashMap::new();
        let mut snapshot = SubjectGrants::default();

        for membership in self.store.memberships_for(Subject::User(user)).await? {
            match membership.target {
                Target::Group(group) => {
                    let grants = self.group_grants(group, membership.prio, &mut role_cache).await?;
                    snapshot.groups.push(grants);
                }
                Target::Role(role) => {
                    let grants = self.role_grants(role, membership.prio, &mut role_cache).await?;
                    snapshot.roles.push(grants);
                }
            }
        }

        snapshot.grants = self.store.grants_for(Subject::User(user)).await?;
        Ok(snapshot)
    }

    async fn group_grants(
        &self,
        group: GroupId,
        prio: i64,
        role_cache: &mut HashMap<RoleId, Vec<GrantEdge>>,
    ) -> Result<GroupGrants> {
        let mut roles = Vec::new();
        for membership in self.store.memberships_for(Subject::Group(group)).await? {
            // Group→group edges are rejected on insert.
            if let Target::Role(role) = membership.target {
                roles.push(self.role_grants(role, membership.prio, role_cache).await?);
            }
        }

        Ok(GroupGrants {
            group,
            prio,
            roles,
            grants: self.store.grants_for(Subject::Group(group)).await?,
        })
    }

    async fn role_grants(
        &self,
        role: RoleId,
        prio: i64,
        role_cache: &mut HashMap<RoleId, Vec<GrantEdge>>,
    ) -> Result<RoleGrants> {
        let grants = match role_cache.get(&role) {
            Some(grants) => grants.clone(),
            None => {
                let grants = self.store.grants_for(Subject::Role(role)).await?;
                role_cache.insert(role, grants.clone());
                grants
            }
        };

        Ok(RoleGrants { role, prio, grants })
    }
}
