//! Traversal engine
//!
//! [`AuditEngine::create_audit_log`] walks an aggregate from its root:
//! scalar fields, then structural fields, then relationships, depth first.
//! Every call gets its own [`Traversal`] holding the visited set, so one
//! engine can serve concurrent calls and nothing leaks between them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::field::FieldDiffer;
use super::node::AuditNode;
use crate::error::AuditResult;
use crate::models::ActorId;
use crate::tracking::{ChangeTracker, EntityKind, EntityRef};

/// Which deleted entities get per-field `Deleted` records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedFieldPolicy {
    /// Only value objects and owned entities keep their last known values;
    /// other deleted entities are conveyed by their node state alone
    #[default]
    ValueObjectsOnly,
    /// Every scalar of every deleted entity is recorded
    All,
}

/// Caller-supplied knobs for one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AuditOptions {
    pub deleted_fields: DeletedFieldPolicy,
    /// Stamped on every field record
    pub actor_id: Option<ActorId>,
}

/// Builds audit records from a change tracker
pub struct AuditEngine<'a, T: ChangeTracker + ?Sized> {
    tracker: &'a T,
    options: AuditOptions,
}

impl<'a, T: ChangeTracker + ?Sized> AuditEngine<'a, T> {
    /// Create an engine with default options
    pub fn new(tracker: &'a T) -> Self {
        Self::with_options(tracker, AuditOptions::default())
    }

    pub fn with_options(tracker: &'a T, options: AuditOptions) -> Self {
        Self { tracker, options }
    }

    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    /// Audit the pending changes of the aggregate rooted at `root`
    ///
    /// Returns `None` when nothing in the aggregate changed. Provider
    /// contract violations abort the whole call.
    pub fn create_audit_log(&self, root: EntityRef) -> AuditResult<Option<AuditNode>> {
        let mut traversal = Traversal::new(self.tracker, &self.options);
        let record = traversal.audit_entry(root, true)?;

        tracing::debug!(
            root = %root,
            visited = traversal.visited_count(),
            changed = record.is_some(),
            "Audit traversal finished"
        );

        Ok(record)
    }
}

/// Audit `root` with default options
pub fn create_audit_log<T: ChangeTracker + ?Sized>(
    tracker: &T,
    root: EntityRef,
) -> AuditResult<Option<AuditNode>> {
    AuditEngine::new(tracker).create_audit_log(root)
}

/// State of one `create_audit_log` call
pub(crate) struct Traversal<'a, T: ChangeTracker + ?Sized> {
    pub(crate) tracker: &'a T,
    options: &'a AuditOptions,
    visited: HashSet<EntityRef>,
}

impl<'a, T: ChangeTracker + ?Sized> Traversal<'a, T> {
    fn new(tracker: &'a T, options: &'a AuditOptions) -> Self {
        Self {
            tracker,
            options,
            visited: HashSet::new(),
        }
    }

    pub(crate) fn is_visited(&self, entity: EntityRef) -> bool {
        self.visited.contains(&entity)
    }

    pub(crate) fn visit(&mut self, entity: EntityRef) {
        self.visited.insert(entity);
    }

    fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Field differ for an entity of the given kind
    pub(crate) fn field_differ(&self, kind: EntityKind) -> FieldDiffer {
        let record_deletions = kind.is_value_object()
            || self.options.deleted_fields == DeletedFieldPolicy::All;
        FieldDiffer::new(record_deletions, self.options.actor_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::node::{AuditState, AuditValue, FieldState};
    use crate::error::AuditError;
    use crate::tracking::{
        EntityTypeMeta, InMemoryTracker, Model, RelationshipMeta, StructuralMeta,
    };
    use serde_json::{json, Value};

    fn order_model() -> Model {
        Model::new()
            .with_type(
                EntityTypeMeta::new("Order")
                    .kind(EntityKind::AggregateRoot)
                    .key("Id")
                    .property("Name")
                    .structural(
                        StructuralMeta::new("Address")
                            .property("Street")
                            .property("City")
                            .nested(StructuralMeta::new("Geo").property("Lat").property("Lng")),
                    )
                    .relationship(RelationshipMeta::ownership("Lines", "OrderLine", &["OrderId"]))
                    .relationship(RelationshipMeta::association("Tags", "OrderTag", &["OrderId"]))
                    .relationship(RelationshipMeta::reference("Shipments", "Shipment", &["OrderId"])),
            )
            .with_type(
                EntityTypeMeta::new("OrderLine")
                    .kind(EntityKind::Owned)
                    .key("Id")
                    .property("Sku")
                    .property("Quantity")
                    .foreign_key("OrderId"),
            )
            .with_type(EntityTypeMeta::new("OrderTag").key("OrderId").key("TagId"))
            .with_type(
                EntityTypeMeta::new("Shipment")
                    .kind(EntityKind::AggregateRoot)
                    .key("Id")
                    .property("Carrier")
                    .foreign_key("OrderId"),
            )
    }

    fn order(id: i64, name: &str) -> Value {
        json!({
            "Id": id,
            "Name": name,
            "Address": {"Street": "Main", "City": "Porto", "Geo": {"Lat": 41.1, "Lng": -8.6}}
        })
    }

    fn line(id: i64, order_id: i64, sku: &str, quantity: i64) -> Value {
        json!({"Id": id, "OrderId": order_id, "Sku": sku, "Quantity": quantity})
    }

    fn saved_order(tracker: &mut InMemoryTracker) -> EntityRef {
        let root = tracker.add("Order", order(1, "Initial")).unwrap();
        tracker.add("OrderLine", line(10, 1, "Inner1", 1)).unwrap();
        tracker.add("OrderLine", line(11, 1, "Inner2", 2)).unwrap();
        tracker.accept_all_changes();
        root
    }

    fn find_line<'n>(nodes: &[&'n AuditNode], id: i64) -> &'n AuditNode {
        nodes
            .iter()
            .find(|n| n.get("Id").and_then(AuditValue::as_key) == Some(&json!(id)))
            .copied()
            .unwrap()
    }

    #[test]
    fn test_no_changes_yields_none() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);

        assert!(create_audit_log(&tracker, root).unwrap().is_none());
    }

    #[test]
    fn test_reverted_change_yields_none() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        tracker.set(root, "Name", json!("Other")).unwrap();
        tracker.set(root, "Name", json!("Initial")).unwrap();

        assert!(create_audit_log(&tracker, root).unwrap().is_none());
    }

    #[test]
    fn test_detached_root_yields_none() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = tracker.add("Order", order(1, "x")).unwrap();
        tracker.detach(root).unwrap();

        assert!(create_audit_log(&tracker, root).unwrap().is_none());
    }

    #[test]
    fn test_added_root_records_every_field() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = tracker.add("Order", order(1, "")).unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        assert_eq!(record.state(), Some(AuditState::Added));
        assert_eq!(record.get("Id").unwrap().as_key(), Some(&json!(1)));

        let name = record.field("Name").unwrap();
        assert_eq!(name.state, FieldState::Added);
        assert_eq!(name.new_value, Some(json!("")));

        let address = record.get("Address").unwrap().as_node().unwrap();
        assert_eq!(address.field("City").unwrap().state, FieldState::Added);
        let geo = address.get("Geo").unwrap().as_node().unwrap();
        assert_eq!(geo.field("Lat").unwrap().new_value, Some(json!(41.1)));
    }

    #[test]
    fn test_aggregate_end_to_end() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        let lines = tracker.tracked_entities_of_type("OrderLine").unwrap();

        tracker.set(root, "Name", json!("Changed")).unwrap();
        tracker.add("OrderLine", line(12, 1, "Inner3", 3)).unwrap();
        tracker.remove(lines[0]).unwrap();
        tracker.set(lines[1], "Sku", json!("ModifiedInner")).unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        assert_eq!(record.state(), Some(AuditState::Modified));

        let name = record.field("Name").unwrap();
        assert_eq!(name.state, FieldState::Modified);
        assert_eq!(name.old_value, Some(json!("Initial")));
        assert_eq!(name.new_value, Some(json!("Changed")));

        let children = record.children("Lines");
        assert_eq!(children.len(), 3);

        let added = find_line(&children, 12);
        assert_eq!(added.state(), Some(AuditState::Added));
        assert_eq!(added.field("Sku").unwrap().new_value, Some(json!("Inner3")));
        // Foreign keys of added rows are not reported as reference changes
        assert!(added.get("OrderId").is_none());

        let deleted = find_line(&children, 10);
        assert_eq!(deleted.state(), Some(AuditState::Deleted));
        assert_eq!(deleted.field("Sku").unwrap().old_value, Some(json!("Inner1")));
        assert_eq!(deleted.field("Quantity").unwrap().old_value, Some(json!(1)));

        let renamed = find_line(&children, 11);
        assert_eq!(renamed.state(), Some(AuditState::Modified));
        let sku = renamed.field("Sku").unwrap();
        assert_eq!(sku.old_value, Some(json!("Inner2")));
        assert_eq!(sku.new_value, Some(json!("ModifiedInner")));
        assert!(renamed.field("Quantity").is_none());
    }

    #[test]
    fn test_unchanged_root_with_changed_child() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        let lines = tracker.tracked_entities_of_type("OrderLine").unwrap();
        tracker.set(lines[0], "Quantity", json!(5)).unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        assert_eq!(record.state(), Some(AuditState::Modified));
        assert!(record.field("Name").is_none());
        assert_eq!(record.children("Lines").len(), 1);
    }

    #[test]
    fn test_structural_replacement_reports_changed_field_only() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        tracker
            .replace_structural(
                root,
                "Address",
                json!({"Street": "Main", "City": "Lisbon", "Geo": {"Lat": 41.1, "Lng": -8.6}}),
            )
            .unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        let address = record.get("Address").unwrap().as_node().unwrap();
        assert!(address.state().is_none());
        assert!(address.field("Street").is_none());
        assert!(address.get("Geo").is_none());

        let city = address.field("City").unwrap();
        assert_eq!(city.state, FieldState::Modified);
        assert_eq!(city.old_value, Some(json!("Porto")));
        assert_eq!(city.new_value, Some(json!("Lisbon")));
    }

    #[test]
    fn test_association_rows() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        let kept = tracker
            .attach("OrderTag", json!({"OrderId": 1, "TagId": 100}))
            .unwrap();
        let removed = tracker
            .attach("OrderTag", json!({"OrderId": 1, "TagId": 200}))
            .unwrap();
        tracker.remove(removed).unwrap();
        tracker
            .add("OrderTag", json!({"OrderId": 1, "TagId": 300}))
            .unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        let tags = record.children("Tags");
        assert_eq!(tags.len(), 2);

        assert_eq!(tags[0].state(), Some(AuditState::Deleted));
        assert_eq!(tags[0].get("TagId").unwrap().as_key(), Some(&json!(200)));
        assert_eq!(tags[0].len(), 2);

        assert_eq!(tags[1].state(), Some(AuditState::Added));
        assert_eq!(tags[1].get("TagId").unwrap().as_key(), Some(&json!(300)));
        assert_eq!(tags[1].get("OrderId").unwrap().as_key(), Some(&json!(1)));

        assert_eq!(tracker.state(kept).unwrap(), crate::tracking::ChangeState::Unchanged);
    }

    #[test]
    fn test_reference_stops_at_aggregate_boundary() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        let shipment = tracker
            .attach("Shipment", json!({"Id": 7, "OrderId": 1, "Carrier": "DHL"}))
            .unwrap();
        tracker.set(shipment, "Carrier", json!("UPS")).unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        let shipments = record.children("Shipments");
        assert_eq!(shipments.len(), 1);
        assert_eq!(shipments[0].state(), Some(AuditState::ReferenceAdded));
        assert_eq!(shipments[0].get("Id").unwrap().as_key(), Some(&json!(7)));
        assert!(shipments[0].get("Carrier").is_none());
        assert!(!shipments[0].has_changes());
    }

    #[test]
    fn test_reference_reassigned_away_is_severed() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        let shipment = tracker
            .attach("Shipment", json!({"Id": 7, "OrderId": 1, "Carrier": "DHL"}))
            .unwrap();
        tracker.set(shipment, "OrderId", json!(2)).unwrap();
        tracker
            .add("Shipment", json!({"Id": 8, "OrderId": 1, "Carrier": "UPS"}))
            .unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        let shipments = record.children("Shipments");
        assert_eq!(shipments.len(), 2);
        assert_eq!(shipments[0].state(), Some(AuditState::ReferenceSevered));
        assert_eq!(shipments[1].state(), Some(AuditState::ReferenceAdded));
    }

    #[test]
    fn test_owned_row_moved_between_parents() {
        let mut tracker = InMemoryTracker::new(order_model());
        let first = saved_order(&mut tracker);
        let second = tracker.attach("Order", order(2, "Second")).unwrap();
        let lines = tracker.tracked_entities_of_type("OrderLine").unwrap();
        tracker.set(lines[0], "OrderId", json!(2)).unwrap();

        // Ownership only follows current foreign keys
        assert!(create_audit_log(&tracker, first).unwrap().is_none());

        let record = create_audit_log(&tracker, second).unwrap().unwrap();
        let moved = record.children("Lines");
        assert_eq!(moved.len(), 1);
        let refs = moved[0].get("OrderId").unwrap().as_references().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].state, AuditState::ReferenceSevered);
        assert_eq!(refs[0].id, json!(1));
        assert_eq!(refs[1].state, AuditState::ReferenceAdded);
        assert_eq!(refs[1].id, json!(2));
    }

    #[test]
    fn test_deleted_root_policy() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        tracker.remove(root).unwrap();
        for line in tracker.tracked_entities_of_type("OrderLine").unwrap() {
            tracker.remove(line).unwrap();
        }

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        assert_eq!(record.state(), Some(AuditState::Deleted));
        assert!(record.field("Name").is_none());
        // Structural values always keep their last known values
        let address = record.get("Address").unwrap().as_node().unwrap();
        assert_eq!(address.field("City").unwrap().state, FieldState::Deleted);
        assert_eq!(record.children("Lines").len(), 2);

        let options = AuditOptions {
            deleted_fields: DeletedFieldPolicy::All,
            ..AuditOptions::default()
        };
        let record = AuditEngine::with_options(&tracker, options)
            .create_audit_log(root)
            .unwrap()
            .unwrap();
        let name = record.field("Name").unwrap();
        assert_eq!(name.state, FieldState::Deleted);
        assert_eq!(name.old_value, Some(json!("Initial")));
    }

    fn invoice_model() -> Model {
        Model::new()
            .with_type(
                EntityTypeMeta::new("Invoice")
                    .kind(EntityKind::AggregateRoot)
                    .key("Id")
                    .property("Number")
                    .relationship(RelationshipMeta::ownership("Items", "InvoiceItem", &["InvoiceId"]))
                    .relationship(RelationshipMeta::reference("Notes", "InvoiceNote", &["InvoiceId"])),
            )
            .with_type(
                EntityTypeMeta::new("InvoiceItem")
                    .key("Id")
                    .property("Description")
                    .foreign_key("InvoiceId"),
            )
            .with_type(
                EntityTypeMeta::new("InvoiceNote")
                    .key("Id")
                    .property("Text")
                    .foreign_key("InvoiceId"),
            )
    }

    #[test]
    fn test_deleted_child_entity_keeps_key_only() {
        let mut tracker = InMemoryTracker::new(invoice_model());
        let root = tracker
            .attach("Invoice", json!({"Id": 1, "Number": "INV-1"}))
            .unwrap();
        tracker
            .attach("InvoiceItem", json!({"Id": 10, "InvoiceId": 1, "Description": "kept"}))
            .unwrap();
        let removed = tracker
            .attach("InvoiceItem", json!({"Id": 11, "InvoiceId": 1, "Description": "gone"}))
            .unwrap();
        tracker.remove(removed).unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        let items = record.children("Items");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].state(), Some(AuditState::Deleted));
        assert_eq!(items[0].get("Id").unwrap().as_key(), Some(&json!(11)));
        assert_eq!(items[0].len(), 1);
        assert!(items[0].field("Description").is_none());
    }

    #[test]
    fn test_deleted_root_without_structurals_is_reported() {
        let mut tracker = InMemoryTracker::new(invoice_model());
        let root = tracker
            .attach("Invoice", json!({"Id": 1, "Number": "INV-1"}))
            .unwrap();
        tracker.remove(root).unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        assert_eq!(record.state(), Some(AuditState::Deleted));
        assert_eq!(record.get("Id").unwrap().as_key(), Some(&json!(1)));
        assert!(record.field("Number").is_none());
    }

    #[test]
    fn test_reference_to_non_root_reports_row_state() {
        let mut tracker = InMemoryTracker::new(invoice_model());
        let root = tracker
            .attach("Invoice", json!({"Id": 1, "Number": "INV-1"}))
            .unwrap();
        tracker
            .add("InvoiceNote", json!({"Id": 5, "InvoiceId": 1, "Text": "urgent"}))
            .unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        let notes = record.children("Notes");
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].state(), Some(AuditState::Added));
        assert_eq!(notes[0].get("Id").unwrap().as_key(), Some(&json!(5)));
        assert!(notes[0].field("Text").is_none());
    }

    #[test]
    fn test_actor_stamped_on_fields() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        tracker.set(root, "Name", json!("Changed")).unwrap();

        let actor = ActorId::new();
        let options = AuditOptions {
            actor_id: Some(actor),
            ..AuditOptions::default()
        };
        let record = AuditEngine::with_options(&tracker, options)
            .create_audit_log(root)
            .unwrap()
            .unwrap();
        assert_eq!(record.field("Name").unwrap().actor_id, Some(actor));
    }

    #[test]
    fn test_entity_reachable_twice_emitted_once() {
        let model = order_model().with_type(
            EntityTypeMeta::new("Order")
                .kind(EntityKind::AggregateRoot)
                .key("Id")
                .property("Name")
                .relationship(RelationshipMeta::ownership("Lines", "OrderLine", &["OrderId"]))
                .relationship(RelationshipMeta::ownership("AllLines", "OrderLine", &["OrderId"])),
        );
        let mut tracker = InMemoryTracker::new(model);
        let root = tracker.attach("Order", json!({"Id": 1, "Name": "x"})).unwrap();
        tracker.add("OrderLine", line(10, 1, "a", 1)).unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        assert_eq!(record.children("Lines").len(), 1);
        assert!(record.get("AllLines").is_none());
    }

    #[test]
    fn test_cycle_terminates() {
        let model = Model::new()
            .with_type(
                EntityTypeMeta::new("A")
                    .key("Id")
                    .property("Name")
                    .foreign_key("BId")
                    .relationship(RelationshipMeta::ownership("Bs", "B", &["AId"])),
            )
            .with_type(
                EntityTypeMeta::new("B")
                    .key("Id")
                    .property("Name")
                    .foreign_key("AId")
                    .relationship(RelationshipMeta::ownership("As", "A", &["BId"])),
            );
        let mut tracker = InMemoryTracker::new(model);
        let a = tracker
            .attach("A", json!({"Id": "a1", "Name": "A", "BId": "b1"}))
            .unwrap();
        let b = tracker
            .attach("B", json!({"Id": "b1", "Name": "B", "AId": "a1"}))
            .unwrap();
        tracker.set(a, "Name", json!("A2")).unwrap();
        tracker.set(b, "Name", json!("B2")).unwrap();

        let record = create_audit_log(&tracker, a).unwrap().unwrap();
        let bs = record.children("Bs");
        assert_eq!(bs.len(), 1);
        assert_eq!(bs[0].field("Name").unwrap().new_value, Some(json!("B2")));
        // A is already in the tree, so B does not list it again
        assert!(bs[0].get("As").is_none());
    }

    #[test]
    fn test_composite_key_relationship() {
        let model = Model::new()
            .with_type(
                EntityTypeMeta::new("Warehouse")
                    .key("Region")
                    .key("Code")
                    .property("Name")
                    .relationship(RelationshipMeta::ownership(
                        "Bins",
                        "Bin",
                        &["WarehouseRegion", "WarehouseCode"],
                    )),
            )
            .with_type(
                EntityTypeMeta::new("Bin")
                    .kind(EntityKind::Owned)
                    .key("Id")
                    .property("Label")
                    .foreign_key("WarehouseRegion")
                    .foreign_key("WarehouseCode"),
            );
        let mut tracker = InMemoryTracker::new(model);
        let root = tracker
            .attach("Warehouse", json!({"Region": "eu", "Code": "W1", "Name": "Main"}))
            .unwrap();
        tracker
            .add("Bin", json!({"Id": 1, "WarehouseRegion": "eu", "WarehouseCode": "W1", "Label": "A"}))
            .unwrap();
        // Same code, other region: must not match
        tracker
            .add("Bin", json!({"Id": 2, "WarehouseRegion": "us", "WarehouseCode": "W1", "Label": "B"}))
            .unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        assert_eq!(record.get("Region").unwrap().as_key(), Some(&json!("eu")));
        assert_eq!(record.get("Code").unwrap().as_key(), Some(&json!("W1")));

        let bins = record.children("Bins");
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].get("Id").unwrap().as_key(), Some(&json!(1)));
    }

    #[test]
    fn test_missing_foreign_key_field_skips_candidate() {
        let model = order_model().with_type(
            EntityTypeMeta::new("Order")
                .key("Id")
                .property("Name")
                .relationship(RelationshipMeta::ownership("Lines", "OrderLine", &["ParentId"])),
        );
        let mut tracker = InMemoryTracker::new(model);
        let root = tracker.attach("Order", json!({"Id": 1, "Name": "x"})).unwrap();
        tracker.add("OrderLine", line(10, 1, "a", 1)).unwrap();
        tracker.set(root, "Name", json!("y")).unwrap();

        let record = create_audit_log(&tracker, root).unwrap().unwrap();
        assert!(record.get("Lines").is_none());
        assert!(record.field("Name").is_some());
    }

    #[test]
    fn test_contract_violation_aborts() {
        let model = order_model().with_type(
            EntityTypeMeta::new("Order")
                .key("Id")
                .property("Name")
                .relationship(RelationshipMeta::ownership("Lines", "OrderLine", &[])),
        );
        let mut tracker = InMemoryTracker::new(model);
        let root = tracker.add("Order", json!({"Id": 1, "Name": "x"})).unwrap();

        let err = create_audit_log(&tracker, root).unwrap_err();
        assert!(err.is_provider_contract());
        assert!(err.to_string().contains("declares no foreign key"));
    }

    #[test]
    fn test_unknown_target_type_aborts() {
        let model = Model::new().with_type(
            EntityTypeMeta::new("Order")
                .key("Id")
                .relationship(RelationshipMeta::ownership("Lines", "Nowhere", &["OrderId"])),
        );
        let mut tracker = InMemoryTracker::new(model);
        let root = tracker.add("Order", json!({"Id": 1})).unwrap();

        let err = create_audit_log(&tracker, root).unwrap_err();
        assert!(matches!(err, AuditError::ProviderContract(_)));
    }

    #[test]
    fn test_missing_primary_key_aborts() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = tracker.add("Order", json!({"Name": "no key"})).unwrap();

        let err = create_audit_log(&tracker, root).unwrap_err();
        assert!(matches!(err, AuditError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_calls_do_not_share_state() {
        let mut tracker = InMemoryTracker::new(order_model());
        let root = saved_order(&mut tracker);
        tracker.set(root, "Name", json!("Changed")).unwrap();

        let engine = AuditEngine::new(&tracker);
        let first = engine.create_audit_log(root).unwrap();
        let second = engine.create_audit_log(root).unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| engine.create_audit_log(root).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), first);
            }
        });
    }
}
