//! Sample aggregate for trying the engine end to end
//!
//! A `TestEntity` aggregate root owning `InnerEntity` rows, embedding a
//! `ValueObject` (with a `NestedValueObject` inside), linked many-to-many to
//! `OtherEntity` through `TestEntityOtherEntity` join rows, and pointing at an
//! independent `OtherAggregateRoot` through a foreign key.
//!
//! [`run`] saves a known starting state, applies the changes of one
//! [`Scenario`] and returns the tracker with the root handle, ready to audit.

use serde_json::{json, Value};
use std::fmt;
use uuid::Uuid;

use crate::error::AuditResult;
use crate::tracking::{
    EntityKind, EntityRef, EntityTypeMeta, InMemoryTracker, Model, RelationshipMeta,
    StructuralMeta,
};

const ROOT: u128 = 1;
const INNER_1: u128 = 11;
const INNER_2: u128 = 12;
const INNER_3: u128 = 13;
const OTHER_X: u128 = 21;
const OTHER_Y: u128 = 22;
const AGGREGATE_A: u128 = 31;
const AGGREGATE_B: u128 = 32;

/// Which set of changes to apply after the initial save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Scenario {
    /// Rename the root, add/remove/rename inner entities, replace the value object
    #[default]
    Basic,
    /// Replace the value object with one differing in Price and a nested field
    ValueObject,
    /// Swap one many-to-many link for another
    ManyToMany,
    /// Point the root at a different aggregate root
    Reference,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic => write!(f, "basic"),
            Self::ValueObject => write!(f, "value-object"),
            Self::ManyToMany => write!(f, "many-to-many"),
            Self::Reference => write!(f, "reference"),
        }
    }
}

/// Deterministic identity used by the sample entities
pub fn id(n: u128) -> Value {
    json!(Uuid::from_u128(n).to_string())
}

/// Entity types of the sample aggregate
pub fn model() -> Model {
    Model::new()
        .with_type(
            EntityTypeMeta::new("TestEntity")
                .kind(EntityKind::AggregateRoot)
                .key("Id")
                .property("Name")
                .foreign_key("OtherAggregateRootId")
                .structural(
                    StructuralMeta::new("ValueObject")
                        .property("Name")
                        .property("Price")
                        .nested(
                            StructuralMeta::new("NestedValueObject")
                                .property("Value1")
                                .property("Value2"),
                        ),
                )
                .relationship(RelationshipMeta::ownership(
                    "InnerEntities",
                    "InnerEntity",
                    &["TestEntityId"],
                ))
                .relationship(RelationshipMeta::association(
                    "OtherEntities",
                    "TestEntityOtherEntity",
                    &["TestEntityId"],
                )),
        )
        .with_type(
            EntityTypeMeta::new("InnerEntity")
                .kind(EntityKind::Owned)
                .key("Id")
                .property("Name")
                .property("Quantity")
                .foreign_key("TestEntityId"),
        )
        .with_type(
            EntityTypeMeta::new("TestEntityOtherEntity")
                .key("TestEntityId")
                .key("OtherEntityId"),
        )
        .with_type(EntityTypeMeta::new("OtherEntity").key("Id").property("Name"))
        .with_type(
            EntityTypeMeta::new("OtherAggregateRoot")
                .kind(EntityKind::AggregateRoot)
                .key("Id")
                .property("Name"),
        )
}

fn value_object(name: &str, price: i64, value1: &str) -> Value {
    json!({
        "Name": name,
        "Price": price,
        "NestedValueObject": {"Value1": value1, "Value2": 1}
    })
}

fn inner(n: u128, name: &str, quantity: i64) -> Value {
    json!({"Id": id(n), "TestEntityId": id(ROOT), "Name": name, "Quantity": quantity})
}

fn link(other: u128) -> Value {
    json!({"TestEntityId": id(ROOT), "OtherEntityId": id(other)})
}

struct Seeded {
    tracker: InMemoryTracker,
    root: EntityRef,
    inner_1: EntityRef,
    inner_2: EntityRef,
    link_x: EntityRef,
}

/// The saved starting state every scenario mutates
fn seed() -> AuditResult<Seeded> {
    let mut tracker = InMemoryTracker::new(model());

    tracker.add("OtherAggregateRoot", json!({"Id": id(AGGREGATE_A), "Name": "A"}))?;
    tracker.add("OtherAggregateRoot", json!({"Id": id(AGGREGATE_B), "Name": "B"}))?;
    tracker.add("OtherEntity", json!({"Id": id(OTHER_X), "Name": "X"}))?;
    tracker.add("OtherEntity", json!({"Id": id(OTHER_Y), "Name": "Y"}))?;

    let root = tracker.add(
        "TestEntity",
        json!({
            "Id": id(ROOT),
            "Name": "Initial",
            "OtherAggregateRootId": id(AGGREGATE_A),
            "ValueObject": value_object("ValueObject1", 1, "a")
        }),
    )?;
    let inner_1 = tracker.add("InnerEntity", inner(INNER_1, "Inner1", 1))?;
    let inner_2 = tracker.add("InnerEntity", inner(INNER_2, "Inner2", 2))?;
    let link_x = tracker.add("TestEntityOtherEntity", link(OTHER_X))?;

    tracker.accept_all_changes();

    Ok(Seeded {
        tracker,
        root,
        inner_1,
        inner_2,
        link_x,
    })
}

/// Build the sample aggregate and apply a scenario's pending changes
pub fn run(scenario: Scenario) -> AuditResult<(InMemoryTracker, EntityRef)> {
    let Seeded {
        mut tracker,
        root,
        inner_1,
        inner_2,
        link_x,
    } = seed()?;

    match scenario {
        Scenario::Basic => {
            tracker.set(root, "Name", json!("Changed"))?;
            tracker.add("InnerEntity", inner(INNER_3, "Inner3", 3))?;
            tracker.remove(inner_1)?;
            tracker.set(inner_2, "Name", json!("ModifiedInner"))?;
            tracker.replace_structural(
                root,
                "ValueObject",
                value_object("ValueObject2", 2, "a"),
            )?;
        }
        Scenario::ValueObject => {
            tracker.replace_structural(
                root,
                "ValueObject",
                value_object("ValueObject1", 2, "b"),
            )?;
        }
        Scenario::ManyToMany => {
            tracker.remove(link_x)?;
            tracker.add("TestEntityOtherEntity", link(OTHER_Y))?;
        }
        Scenario::Reference => {
            tracker.set(root, "OtherAggregateRootId", id(AGGREGATE_B))?;
        }
    }

    tracing::debug!(scenario = %scenario, tracked = tracker.len(), "Demo scenario applied");
    Ok((tracker, root))
}
