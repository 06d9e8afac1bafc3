//! Proptest generators for property-based testing.

use proptest::collection::{btree_set, vec};
use proptest::prelude::*;

use warrant_core::{
    GrantEdge, GrantMode, GroupGrants, GroupId, RoleGrants, RoleId, Subject, SubjectGrants, UserId,
};

/// Generate a dotted permission name such as `ab.cde`.
pub fn permission_name() -> impl Strategy<Value = String> {
    "[a-z]{1,6}\\.[a-z]{1,6}"
}

/// Generate a distinct set of permission names, sorted.
pub fn permission_names(max: usize) -> impl Strategy<Value = Vec<String>> {
    btree_set(permission_name(), 0..=max).prop_map(|set| set.into_iter().collect())
}

/// Generate a grant mode.
pub fn grant_mode() -> impl Strategy<Value = GrantMode> {
    prop_oneof![Just(GrantMode::Allowed), Just(GrantMode::Denied)]
}

/// Generate a small priority; collisions are intentional.
pub fn prio() -> impl Strategy<Value = i64> {
    -3i64..=3
}

/// Generate a grant edge for `subject` over one of `names`.
pub fn grant_edge(subject: Subject, names: Vec<String>) -> impl Strategy<Value = GrantEdge> {
    (prop::sample::select(names), grant_mode(), prio()).prop_map(move |(permission, mode, prio)| {
        GrantEdge {
            subject,
            permission,
            mode,
            prio,
        }
    })
}

fn grant_edges(subject: Subject, names: Vec<String>) -> impl Strategy<Value = Vec<GrantEdge>> {
    vec(grant_edge(subject, names), 0..4)
}

fn role_grants(names: Vec<String>) -> impl Strategy<Value = RoleGrants> {
    (1i64..1000, prio()).prop_flat_map(move |(id, prio)| {
        let role = RoleId(id);
        grant_edges(Subject::Role(role), names.clone()).prop_map(move |grants| RoleGrants {
            role,
            prio,
            grants,
        })
    })
}

fn group_grants(names: Vec<String>) -> impl Strategy<Value = GroupGrants> {
    (1i64..1000, prio()).prop_flat_map(move |(id, prio)| {
        let group = GroupId(id);
        (
            vec(role_grants(names.clone()), 0..3),
            grant_edges(Subject::Group(group), names.clone()),
        )
            .prop_map(move |(roles, grants)| GroupGrants {
                group,
                prio,
                roles,
                grants,
            })
    })
}

/// Generate a user's full grant graph over a non-empty universe of names.
///
/// Yields the universe alongside the graph.
pub fn subject_grants() -> impl Strategy<Value = (Vec<String>, SubjectGrants)> {
    btree_set(permission_name(), 1..12)
        .prop_map(|set| set.into_iter().collect::<Vec<_>>())
        .prop_flat_map(|names| {
            let user = Subject::User(UserId(1));
            let graph = (
                vec(group_grants(names.clone()), 0..3),
                vec(role_grants(names.clone()), 0..3),
                grant_edges(user, names.clone()),
            )
                .prop_map(|(groups, roles, grants)| SubjectGrants {
                    groups,
                    roles,
                    grants,
                });
            (Just(names), graph)
        })
}
