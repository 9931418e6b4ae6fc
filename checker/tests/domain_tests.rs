// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

// Checks the lattice laws of the abstract domains and the behavior of environments.

mod common;

use common::*;
use points_to::abstract_domains::{AbstractDomain, AbstractValueDomain};
use points_to::abstract_location::AbstractLocation;
use points_to::analysis_entity::{AnalysisEntity, EntityKind};
use points_to::bool_domain::BoolDomain;
use points_to::environment::{Environment, EnvironmentKey};
use points_to::k_limits;
use points_to::operation::{OperationId, Symbol, TypeInfo};
use points_to::points_to_value::PointsToAbstractValue;
use std::sync::Arc;

fn location(id: u32) -> AbstractLocation {
    AbstractLocation::for_creation(OperationId(id), object_type("A"))
}

fn samples() -> Vec<PointsToAbstractValue> {
    vec![
        PointsToAbstractValue::Undefined,
        PointsToAbstractValue::NoLocation,
        PointsToAbstractValue::Unknown,
        location(1).into(),
        location(2).into(),
        PointsToAbstractValue::known(vec![location(1), location(2)]),
        AbstractLocation::for_symbol(Symbol::local(7, "p", object_type("A"))).into(),
    ]
}

#[test]
fn points_to_merge_is_idempotent_and_commutative() {
    for a in samples() {
        assert_eq!(a.merge(&a), a);
        for b in samples() {
            assert_eq!(a.merge(&b), b.merge(&a), "{:?} {:?}", a, b);
        }
    }
}

#[test]
fn points_to_merge_with_unknown_and_bottom() {
    for a in samples() {
        assert_eq!(
            a.merge(&PointsToAbstractValue::Unknown),
            PointsToAbstractValue::Unknown
        );
        assert_eq!(a.merge(&PointsToAbstractValue::bottom()), a);
        assert!(PointsToAbstractValue::bottom().subset(&a));
        assert!(a.subset(&PointsToAbstractValue::unknown_or_may_be_value()));
    }
}

#[test]
fn points_to_merge_unions_known_locations() {
    let merged = PointsToAbstractValue::from(location(1)).merge(&location(2).into());
    assert_eq!(merged, PointsToAbstractValue::known(vec![location(2), location(1)]));
    assert!(merged.contains(&location(1)));
    assert!(merged.contains(&location(2)));
    assert!(!merged.contains(&location(3)));
}

#[test]
fn no_location_merged_with_known_is_unknown() {
    let known: PointsToAbstractValue = location(1).into();
    assert_eq!(
        PointsToAbstractValue::NoLocation.merge(&known),
        PointsToAbstractValue::Unknown
    );
    assert_eq!(
        PointsToAbstractValue::NoLocation.merge(&PointsToAbstractValue::NoLocation),
        PointsToAbstractValue::NoLocation
    );
}

#[test]
fn too_many_locations_collapse_to_unknown() {
    let limit = k_limits::MAX_TRACKED_LOCATIONS as u32;
    let at_limit = PointsToAbstractValue::known((0..limit).map(location).collect());
    assert!(at_limit.is_known());
    let beyond_limit = PointsToAbstractValue::known((0..=limit).map(location).collect());
    assert_eq!(beyond_limit, PointsToAbstractValue::Unknown);

    let half = limit / 2 + 1;
    let low = PointsToAbstractValue::known((0..half).map(location).collect());
    let high = PointsToAbstractValue::known((half..2 * half).map(location).collect());
    assert_eq!(low.merge(&high), PointsToAbstractValue::Unknown);
}

#[test]
fn may_alias_requires_a_common_location() {
    let one: PointsToAbstractValue = location(1).into();
    let two: PointsToAbstractValue = location(2).into();
    let both = PointsToAbstractValue::known(vec![location(1), location(2)]);
    assert!(!one.may_alias(&two));
    assert!(one.may_alias(&both));
    assert!(one.may_alias(&PointsToAbstractValue::Unknown));
    assert!(!one.may_alias(&PointsToAbstractValue::NoLocation));
    assert!(!PointsToAbstractValue::Undefined.may_alias(&PointsToAbstractValue::Unknown));
}

#[test]
fn bool_domain_join() {
    use BoolDomain::*;
    assert_eq!(True.join(&False), Top);
    assert_eq!(True.join(&Bottom), True);
    assert_eq!(Bottom.join(&False), False);
    assert_eq!(Top.join(&Bottom), Top);
    assert_eq!(BoolDomain::from(true).as_bool_if_known(), Some(true));
    assert_eq!(Top.as_bool_if_known(), None);
    assert!(Bottom.is_bottom());
    assert!(BoolDomain::unknown_or_may_be_value().is_unknown());
}

fn local_entity(id: u32, name: &str) -> Arc<AnalysisEntity> {
    AnalysisEntity::for_local(&Symbol::local(id, name, object_type("A")))
}

fn member_entity(field: &Symbol, instance: PointsToAbstractValue) -> Arc<AnalysisEntity> {
    let kind = EntityKind::Member {
        symbol: field.clone(),
    };
    AnalysisEntity::new(kind, field.ty.clone(), None, instance)
}

#[test]
fn entity_identity_ignores_the_static_type() {
    let x = Symbol::local(1, "x", object_type("A"));
    let e1 = AnalysisEntity::for_local(&x);
    let e2 = AnalysisEntity::new(
        EntityKind::Local { symbol: x },
        TypeInfo::reference("B"),
        None,
        PointsToAbstractValue::NoLocation,
    );
    assert_eq!(e1, e2);
}

#[test]
fn entities_of_different_instances_are_equivalent_ignoring_location() {
    let f = Symbol::field(3, "f", object_type("A"));
    let e1 = member_entity(&f, location(1).into());
    let e2 = member_entity(&f, location(2).into());
    assert_ne!(e1, e2);
    assert!(e1.equals_ignoring_instance_location(&e2));
    assert_eq!(
        EnvironmentKey::hash_ignoring_instance_location(&e1),
        EnvironmentKey::hash_ignoring_instance_location(&e2)
    );
    assert!(!e1.may_overlap_with(&e2));
    let both = member_entity(&f, PointsToAbstractValue::known(vec![location(1), location(2)]));
    assert!(e1.may_overlap_with(&both));
    assert!(e1.is_heap_member());
    assert!(!local_entity(1, "x").is_heap_member());
}

#[test]
fn environment_merge_keeps_every_key() {
    let mut m1: Environment<Arc<AnalysisEntity>, PointsToAbstractValue> = Environment::default();
    let mut m2: Environment<Arc<AnalysisEntity>, PointsToAbstractValue> = Environment::default();
    let x = local_entity(1, "x");
    let y = local_entity(2, "y");
    let z = local_entity(3, "z");
    m1.update_value_at(x.clone(), location(1).into());
    m1.update_value_at(z.clone(), location(3).into());
    m2.update_value_at(y.clone(), location(2).into());
    m2.update_value_at(z.clone(), location(4).into());

    let merged = m1.merge(&m2);

    assert_eq!(merged.len(), 3);
    assert_eq!(merged.value_at(&x), Some(&PointsToAbstractValue::Unknown));
    assert_eq!(merged.value_at(&y), Some(&PointsToAbstractValue::Unknown));
    assert_eq!(
        merged.value_at(&z),
        Some(&PointsToAbstractValue::known(vec![location(3), location(4)]))
    );
    assert_eq!(merged, m2.merge(&m1));
    assert!(m1.subset(&merged));
    assert!(m2.subset(&merged));
}

#[test]
fn environment_merge_adds_key_for_merged_instance_location() {
    let f = Symbol::field(3, "f", object_type("A"));
    let e1 = member_entity(&f, location(1).into());
    let e2 = member_entity(&f, location(2).into());
    let mut m1: Environment<Arc<AnalysisEntity>, PointsToAbstractValue> = Environment::default();
    let mut m2: Environment<Arc<AnalysisEntity>, PointsToAbstractValue> = Environment::default();
    m1.update_value_at(e1.clone(), location(10).into());
    m2.update_value_at(e2.clone(), location(20).into());

    let merged = m1.merge(&m2);

    let merged_key = e1.with_merged_instance_location(&e2);
    assert_eq!(
        merged_key.instance_location,
        PointsToAbstractValue::known(vec![location(1), location(2)])
    );
    assert_eq!(merged.len(), 3);
    assert_eq!(
        merged.value_at(&merged_key),
        Some(&PointsToAbstractValue::known(vec![location(10), location(20)]))
    );
    assert_eq!(merged.value_at(&e1), Some(&PointsToAbstractValue::Unknown));
    assert_eq!(merged.value_at(&e2), Some(&PointsToAbstractValue::Unknown));
}

#[test]
fn widen_all_to_keeps_the_key_set() {
    let mut env: Environment<Arc<AnalysisEntity>, PointsToAbstractValue> = Environment::default();
    let entities = vec![local_entity(1, "x"), local_entity(2, "y"), local_entity(3, "z")];
    for (i, entity) in entities.iter().enumerate() {
        env.update_value_at(entity.clone(), location(i as u32).into());
    }

    env.widen_all_to(&PointsToAbstractValue::Unknown);

    assert_eq!(env.len(), entities.len());
    for entity in entities.iter() {
        assert_eq!(env.value_at(entity), Some(&PointsToAbstractValue::Unknown));
    }
}

#[test]
fn points_to_widen_gives_up_on_growth() {
    let a: PointsToAbstractValue = location(1).into();
    let ab = PointsToAbstractValue::known(vec![location(1), location(2)]);

    assert_eq!(a.widen(&a), a);
    assert_eq!(a.widen(&ab), ab);
    assert_eq!(ab.widen(&a), PointsToAbstractValue::Unknown);
    assert_eq!(ab.widen(&PointsToAbstractValue::Undefined), ab);
    assert_eq!(
        PointsToAbstractValue::NoLocation.widen(&a),
        PointsToAbstractValue::Unknown
    );
}

#[test]
fn environment_widen_only_widens_changed_values() {
    let x = local_entity(1, "x");
    let y = local_entity(2, "y");
    let mut previous: Environment<Arc<AnalysisEntity>, PointsToAbstractValue> =
        Environment::default();
    previous.update_value_at(x.clone(), location(1).into());
    previous.update_value_at(y.clone(), location(2).into());
    let mut next = previous.clone();
    next.update_value_at(x.clone(), PointsToAbstractValue::known(vec![location(1), location(3)]));

    let widened = next.widen(&previous);

    assert_eq!(widened.value_at(&x), Some(&PointsToAbstractValue::Unknown));
    assert_eq!(widened.value_at(&y), Some(&location(2).into()));
    assert_eq!(previous.widen(&previous), previous);
}

#[test]
fn location_keyed_environment_merges_by_location() {
    let mut m1: Environment<AbstractLocation, BoolDomain> = Environment::default();
    let mut m2: Environment<AbstractLocation, BoolDomain> = Environment::default();
    m1.update_value_at(location(1), BoolDomain::True);
    m2.update_value_at(location(1), BoolDomain::False);
    m2.update_value_at(location(2), BoolDomain::False);

    let merged = m1.merge(&m2);

    assert_eq!(merged.value_at(&location(1)), Some(&BoolDomain::Top));
    assert_eq!(merged.value_at(&location(2)), Some(&BoolDomain::Top));
    assert!(!merged.is_subset_of(&m1));
    assert!(m1.is_subset_of(&merged));
}
