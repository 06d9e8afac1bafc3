//! Permission resolution.
//!
//! A principal's effective permissions are computed by replaying every grant
//! edge that reaches it, in a fixed priority order, against an initially
//! empty set. `allowed` inserts, `denied` removes; whichever edge is applied
//! last for a permission wins, regardless of where it came from.
//!
//! Evaluation order:
//!
//! 1. groups of the subject (membership prio ascending), and for each group
//!    - the group's roles (membership prio ascending), each role's grants
//!      (prio ascending)
//!    - the group's own grants (prio ascending)
//! 2. roles of the subject (membership prio ascending), each role's grants
//! 3. the subject's own grants (prio ascending)
//!
//! Ties on `prio` are broken by target id for memberships and by
//! `(permission, mode)` for grants, with `allowed` sorting before `denied`.
//! The resulting order is total, so resolution does not depend on the order
//! the store returned edges in.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::grant::{GrantEdge, GrantMode};
use crate::types::{GroupId, RoleId};

/// One step of the fold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GrantOp {
    pub permission: String,
    pub mode: GrantMode,
}

impl From<&GrantEdge> for GrantOp {
    fn from(edge: &GrantEdge) -> Self {
        Self {
            permission: edge.permission.clone(),
            mode: edge.mode,
        }
    }
}

/// A role reached through a membership, with the role's own grant edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrants {
    pub role: RoleId,
    /// Priority of the membership edge that reached this role.
    pub prio: i64,
    pub grants: Vec<GrantEdge>,
}

/// A group reached through a membership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupGrants {
    pub group: GroupId,
    /// Priority of the user→group membership edge.
    pub prio: i64,
    pub roles: Vec<RoleGrants>,
    pub grants: Vec<GrantEdge>,
}

/// Everything that can contribute to one subject's permission set.
///
/// This is a plain snapshot of the relevant part of the grant graph; the
/// store layer builds it, the functions in this module only read it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectGrants {
    pub groups: Vec<GroupGrants>,
    pub roles: Vec<RoleGrants>,
    pub grants: Vec<GrantEdge>,
}

/// Running permission set, mutated by [`GrantOp`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    names: BTreeSet<String>,
}

impl PermissionSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one grant operation.
    pub fn apply(&mut self, op: GrantOp) {
        match op.mode {
            GrantMode::Allowed => {
                self.names.insert(op.permission);
            }
            GrantMode::Denied => {
                self.names.remove(&op.permission);
            }
        }
    }

    /// Check membership.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of permissions held.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no permission is held.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Sorted permission names.
    pub fn into_sorted(self) -> Vec<String> {
        self.names.into_iter().collect()
    }
}

/// Fold a sequence of operations into a permission set.
pub fn fold<I>(ops: I) -> PermissionSet
where
    I: IntoIterator<Item = GrantOp>,
{
    let mut set = PermissionSet::new();
    for op in ops {
        set.apply(op);
    }
    set
}

/// Produce the evaluation-ordered sequence of operations for a subject.
pub fn linearize(grants: &SubjectGrants) -> Vec<GrantOp> {
    let mut ops = Vec::new();

    let mut groups: Vec<&GroupGrants> = grants.groups.iter().collect();
    groups.sort_by_key(|g| (g.prio, g.group));

    for group in groups {
        push_roles(&mut ops, &group.roles);
        push_grants(&mut ops, &group.grants);
    }

    push_roles(&mut ops, &grants.roles);
    push_grants(&mut ops, &grants.grants);

    ops
}

/// Resolve a subject's effective permissions, sorted by name.
pub fn resolve(grants: &SubjectGrants) -> Vec<String> {
    fold(linearize(grants)).into_sorted()
}

fn push_roles(ops: &mut Vec<GrantOp>, roles: &[RoleGrants]) {
    let mut roles: Vec<&RoleGrants> = roles.iter().collect();
    roles.sort_by_key(|r| (r.prio, r.role));

    for role in roles {
        push_grants(ops, &role.grants);
    }
}

fn push_grants(ops: &mut Vec<GrantOp>, edges: &[GrantEdge]) {
    let mut edges: Vec<&GrantEdge> = edges.iter().collect();
    edges.sort_by(|a, b| {
        (a.prio, &a.permission, mode_rank(a.mode)).cmp(&(b.prio, &b.permission, mode_rank(b.mode)))
    });

    ops.extend(edges.into_iter().map(GrantOp::from));
}

fn mode_rank(mode: GrantMode) -> u8 {
    match mode {
        GrantMode::Allowed => 0,
        GrantMode::Denied => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserId;
    use proptest::prelude::*;

    const USER: UserId = UserId(1);

    fn role(id: i64, prio: i64, grants: Vec<GrantEdge>) -> RoleGrants {
        RoleGrants {
            role: RoleId(id),
            prio,
            grants,
        }
    }

    #[test]
    fn test_direct_allow() {
        let grants = SubjectGrants {
            grants: vec![GrantEdge::allow(USER, "read", 1)],
            ..Default::default()
        };
        assert_eq!(resolve(&grants), vec!["read"]);
    }

    #[test]
    fn test_later_deny_overrides_earlier_allow() {
        let grants = SubjectGrants {
            grants: vec![
                GrantEdge::allow(USER, "read", 10),
                GrantEdge::deny(USER, "read", 20),
            ],
            ..Default::default()
        };
        assert!(resolve(&grants).is_empty());

        let swapped = SubjectGrants {
            grants: vec![
                GrantEdge::allow(USER, "read", 20),
                GrantEdge::deny(USER, "read", 10),
            ],
            ..Default::default()
        };
        assert_eq!(resolve(&swapped), vec!["read"]);
    }

    #[test]
    fn test_direct_deny_beats_group_allow() {
        let group = GroupId(5);
        let grants = SubjectGrants {
            groups: vec![GroupGrants {
                group,
                prio: 0,
                roles: vec![],
                grants: vec![GrantEdge::allow(group, "write", 100)],
            }],
            grants: vec![GrantEdge::deny(USER, "write", 0)],
            ..Default::default()
        };
        // Direct grants are evaluated after groups whatever their prio.
        assert!(resolve(&grants).is_empty());
    }

    #[test]
    fn test_group_roles_before_group_grants() {
        let group = GroupId(5);
        let grants = SubjectGrants {
            groups: vec![GroupGrants {
                group,
                prio: 0,
                roles: vec![role(3, 0, vec![GrantEdge::allow(RoleId(3), "admin", 0)])],
                grants: vec![GrantEdge::deny(group, "admin", 0)],
            }],
            ..Default::default()
        };
        assert!(resolve(&grants).is_empty());
    }

    #[test]
    fn test_groups_ordered_by_membership_prio() {
        let g1 = GroupId(1);
        let g2 = GroupId(2);
        let grants = SubjectGrants {
            groups: vec![
                GroupGrants {
                    group: g1,
                    prio: 20,
                    roles: vec![],
                    grants: vec![GrantEdge::allow(g1, "deploy", 0)],
                },
                GroupGrants {
                    group: g2,
                    prio: 10,
                    roles: vec![],
                    grants: vec![GrantEdge::deny(g2, "deploy", 0)],
                },
            ],
            ..Default::default()
        };
        // g2 (prio 10) runs first, g1 (prio 20) allows last.
        assert_eq!(resolve(&grants), vec!["deploy"]);
    }

    #[test]
    fn test_user_roles_after_groups() {
        let group = GroupId(1);
        let grants = SubjectGrants {
            groups: vec![GroupGrants {
                group,
                prio: 0,
                roles: vec![],
                grants: vec![GrantEdge::allow(group, "audit", 0)],
            }],
            roles: vec![role(2, 0, vec![GrantEdge::deny(RoleId(2), "audit", 0)])],
            ..Default::default()
        };
        assert!(resolve(&grants).is_empty());
    }

    #[test]
    fn test_duplicate_allows_count_once() {
        let grants = SubjectGrants {
            roles: vec![
                role(1, 0, vec![GrantEdge::allow(RoleId(1), "read", 0)]),
                role(2, 1, vec![GrantEdge::allow(RoleId(2), "read", 0)]),
            ],
            grants: vec![GrantEdge::deny(USER, "read", 0)],
            ..Default::default()
        };
        // One deny removes the permission no matter how many edges granted it.
        assert!(resolve(&grants).is_empty());
    }

    #[test]
    fn test_result_sorted() {
        let grants = SubjectGrants {
            grants: vec![
                GrantEdge::allow(USER, "zeta", 1),
                GrantEdge::allow(USER, "alpha", 2),
                GrantEdge::allow(USER, "mu", 3),
            ],
            ..Default::default()
        };
        assert_eq!(resolve(&grants), vec!["alpha", "mu", "zeta"]);
    }

    #[test]
    fn test_equal_prio_tie_break_deny_last() {
        let grants = SubjectGrants {
            grants: vec![
                GrantEdge::deny(USER, "read", 5),
                GrantEdge::allow(USER, "read", 5),
            ],
            ..Default::default()
        };
        assert!(resolve(&grants).is_empty());
    }

    fn grant_edge() -> impl Strategy<Value = GrantEdge> + Clone {
        (
            prop::sample::select(vec!["a", "b", "c", "d", "e"]),
            any::<bool>(),
            0i64..8,
        )
            .prop_map(|(name, allow, prio)| {
                if allow {
                    GrantEdge::allow(USER, name, prio)
                } else {
                    GrantEdge::deny(USER, name, prio)
                }
            })
    }

    fn subject_grants() -> impl Strategy<Value = SubjectGrants> {
        let roles = prop::collection::vec(
            (0i64..6, 0i64..4, prop::collection::vec(grant_edge(), 0..4)),
            0..4,
        );
        let groups = prop::collection::vec(
            (0i64..6, 0i64..4, roles.clone(), prop::collection::vec(grant_edge(), 0..4)),
            0..3,
        );
        (groups, roles, prop::collection::vec(grant_edge(), 0..6)).prop_map(
            |(groups, roles, grants)| SubjectGrants {
                groups: groups
                    .into_iter()
                    .map(|(id, prio, roles, grants)| GroupGrants {
                        group: GroupId(id),
                        prio,
                        roles: roles
                            .into_iter()
                            .map(|(id, prio, grants)| role(id, prio, grants))
                            .collect(),
                        grants,
                    })
                    .collect(),
                roles: roles
                    .into_iter()
                    .map(|(id, prio, grants)| role(id, prio, grants))
                    .collect(),
                grants,
            },
        )
    }

    proptest! {
        #[test]
        fn test_resolution_deterministic(grants in subject_grants()) {
            prop_assert_eq!(resolve(&grants), resolve(&grants));
        }

        #[test]
        fn test_resolution_independent_of_edge_order(grants in subject_grants()) {
            let mut reversed = grants.clone();
            reversed.groups.reverse();
            reversed.roles.reverse();
            reversed.grants.reverse();
            for group in &mut reversed.groups {
                group.roles.reverse();
                group.grants.reverse();
            }
            prop_assert_eq!(resolve(&grants), resolve(&reversed));
        }

        #[test]
        fn test_last_direct_edge_decides(grants in subject_grants(), allow in any::<bool>()) {
            let mut grants = grants;
            let edge = if allow {
                GrantEdge::allow(USER, "a", i64::MAX)
            } else {
                GrantEdge::deny(USER, "a", i64::MAX)
            };
            grants.grants.push(edge);
            let resolved = resolve(&grants);
            prop_assert_eq!(resolved.iter().any(|p| p == "a"), allow);
        }

        #[test]
        fn test_resolved_is_sorted_and_unique(grants in subject_grants()) {
            let resolved = resolve(&grants);
            prop_assert!(resolved.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
