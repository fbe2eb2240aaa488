//! Declarative step schema set for the service request wizard
//!
//! Pure configuration: per-step field sets and constraints, the one
//! cross-field refinement at the location step (pickup address must differ
//! from dropoff address), per-step defaults, and the merged whole-object
//! schema used only at final submission.

use serde_json::Value;

use crate::contract::FormStepConfig;
use crate::request::model::ServiceRequestFormData;
use crate::schema::{path, FieldRules, Schema};

const PROPERTY_TYPES: &[&str] = &["house", "apartment", "office", "storage", "other"];
const SERVICE_TYPES: &[&str] = &[
    "residential_move",
    "office_move",
    "single_item",
    "waste_collection",
];
const ITEM_SIZES: &[&str] = &["small", "medium", "large", "extra_large"];
const VEHICLE_TYPES: &[&str] = &["small_van", "medium_van", "luton", "truck"];
const TIME_SLOTS: &[&str] = &["morning", "afternoon", "evening", "flexible"];
const PRIORITIES: &[&str] = &["standard", "express", "same_day"];

/// Pickup and dropoff must not be the same address (case- and
/// whitespace-insensitive). Blank addresses are left to the required rules.
fn addresses_differ(data: &Value) -> bool {
    let pickup = path::lookup(data, "pickup_location.address").and_then(Value::as_str);
    let dropoff = path::lookup(data, "dropoff_location.address").and_then(Value::as_str);
    match (pickup, dropoff) {
        (Some(a), Some(b)) if !a.trim().is_empty() && !b.trim().is_empty() => {
            !a.trim().eq_ignore_ascii_case(b.trim())
        }
        _ => true,
    }
}

fn location_rules(schema: Schema, prefix: &str) -> Schema {
    schema
        .field(
            format!("{prefix}.address"),
            FieldRules::required().min_len(5).max_len(200),
        )
        .field(format!("{prefix}.unit"), FieldRules::optional().max_len(20))
        .field(
            format!("{prefix}.floor"),
            FieldRules::optional().min(-2.0).max(100.0),
        )
        .field(
            format!("{prefix}.property_type"),
            FieldRules::optional().one_of(PROPERTY_TYPES),
        )
        .field(
            format!("{prefix}.room_count"),
            FieldRules::optional().min(1.0).max(20.0),
        )
        .field(
            format!("{prefix}.postcode"),
            FieldRules::optional().min_len(3).max_len(12),
        )
        .field(
            format!("{prefix}.instructions"),
            FieldRules::optional().max_len(500),
        )
}

fn contact_schema() -> Schema {
    Schema::new()
        .field("contact_name", FieldRules::required().min_len(2).max_len(100))
        .field("contact_email", FieldRules::required().email())
        .field("contact_phone", FieldRules::required().phone())
}

fn locations_schema() -> Schema {
    let stop = Schema::new()
        .field("address", FieldRules::required().min_len(5).max_len(200))
        .field("instructions", FieldRules::optional().max_len(500));

    let schema = location_rules(Schema::new(), "pickup_location");
    let schema = location_rules(schema, "dropoff_location");
    schema
        .field("journey_stops", FieldRules::optional().each(stop))
        .refine(
            &["pickup_location", "dropoff_location"],
            "dropoff_location.address",
            "must differ from the pickup address",
            addresses_differ,
        )
}

fn items_schema() -> Schema {
    let item = Schema::new()
        .field("name", FieldRules::required().min_len(1).max_len(100))
        .field("category", FieldRules::required().min_len(1).max_len(50))
        .field("quantity", FieldRules::required().min(1.0).max(99.0))
        .field("weight_kg", FieldRules::optional().min(0.0))
        .field("declared_value", FieldRules::optional().min(0.0));

    Schema::new()
        .field("moving_items", FieldRules::required().non_empty().each(item))
        .field("service_type", FieldRules::required().one_of(SERVICE_TYPES))
        .field("item_size", FieldRules::required().one_of(ITEM_SIZES))
        .field("description", FieldRules::optional().max_len(2000))
        .field("special_handling", FieldRules::optional().max_len(500))
        .field("vehicle_type", FieldRules::optional().one_of(VEHICLE_TYPES))
}

fn schedule_schema() -> Schema {
    Schema::new()
        .field("preferred_date", FieldRules::required().date_ymd())
        .field("preferred_time", FieldRules::required().one_of(TIME_SLOTS))
        .field("priority", FieldRules::required().one_of(PRIORITIES))
        .field("selected_price", FieldRules::optional().min(0.0))
        .field("base_price", FieldRules::optional().min(0.0))
        .field("final_price", FieldRules::optional().min(0.0))
        .field("staff_count", FieldRules::optional().min(1.0).max(6.0))
}

/// The ordered step configuration for the service request wizard
pub fn service_request_steps() -> Vec<FormStepConfig> {
    vec![
        FormStepConfig::new(
            "contact",
            "Contact details",
            "Who should we contact about this request?",
            &["contact_name", "contact_email", "contact_phone"],
            contact_schema(),
        ),
        FormStepConfig::new(
            "locations",
            "Pickup and dropoff",
            "Where are we collecting from and delivering to?",
            &["pickup_location", "dropoff_location", "journey_stops"],
            locations_schema(),
        ),
        FormStepConfig::new(
            "items",
            "Items and service",
            "What are we moving and what kind of service do you need?",
            &[
                "moving_items",
                "service_type",
                "item_size",
                "description",
                "photo_urls",
                "special_handling",
                "vehicle_type",
            ],
            items_schema(),
        ),
        FormStepConfig::new(
            "schedule",
            "Schedule and price",
            "When should this happen and at what price?",
            &[
                "preferred_date",
                "preferred_time",
                "is_flexible",
                "needs_insurance",
                "priority",
                "selected_price",
                "base_price",
                "final_price",
                "staff_count",
            ],
            schedule_schema(),
        ),
    ]
}

/// The merged whole-object schema, used only at final submission
pub fn full_schema() -> Schema {
    service_request_steps()
        .into_iter()
        .map(|step| step.schema)
        .fold(Schema::new(), Schema::merge)
}

/// Default form data seeding a fresh wizard session, as a JSON object
pub fn default_form_data() -> Value {
    serde_json::to_value(ServiceRequestFormData::default())
        .expect("default aggregate serializes to JSON")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeSet;

    #[test]
    fn test_field_ownership_is_disjoint() {
        let steps = service_request_steps();
        let mut seen = BTreeSet::new();
        for step in &steps {
            for field in &step.fields {
                assert!(seen.insert(field.clone()), "field {field} owned twice");
            }
        }
    }

    #[test]
    fn test_step_schemas_only_constrain_owned_fields() {
        for step in service_request_steps() {
            for root in step.schema.roots() {
                assert!(
                    step.fields.contains(&root),
                    "step {} constrains unowned field {root}",
                    step.id
                );
            }
        }
    }

    #[test]
    fn test_defaults_are_an_object_with_all_roots() {
        let defaults = default_form_data();
        let object = defaults.as_object().unwrap();
        for step in service_request_steps() {
            for field in &step.fields {
                // Skip-serializing optionals are absent by design
                if matches!(
                    field.as_str(),
                    "special_handling"
                        | "vehicle_type"
                        | "preferred_date"
                        | "selected_price"
                        | "base_price"
                        | "final_price"
                ) {
                    continue;
                }
                assert!(object.contains_key(field), "defaults missing {field}");
            }
        }
    }

    #[test]
    fn test_fresh_defaults_fail_contact_step() {
        let steps = service_request_steps();
        let violations = steps[0].schema.validate(&default_form_data());
        let paths: Vec<&str> = violations.iter().map(|v| v.path.as_str()).collect();
        assert!(paths.contains(&"contact_name"));
        assert!(paths.contains(&"contact_email"));
        assert!(paths.contains(&"contact_phone"));
    }

    #[test]
    fn test_identical_addresses_rejected_by_full_schema() {
        let data = json!({
            "pickup_location": {"address": "123 Main St"},
            "dropoff_location": {"address": "123 Main St"}
        });
        let violations = full_schema().validate(&data);
        assert!(violations
            .iter()
            .any(|v| v.path == "dropoff_location.address"
                && v.message.contains("differ")));
    }

    #[test]
    fn test_differing_addresses_pass_refinement() {
        let data = json!({
            "pickup_location": {"address": "123 Main St"},
            "dropoff_location": {"address": "9 Station Road"}
        });
        let violations = locations_schema().validate(&data);
        assert!(!violations.iter().any(|v| v.message.contains("differ")));
    }

    #[test]
    fn test_journey_stop_rules() {
        let data = json!({
            "pickup_location": {"address": "123 Main Street"},
            "dropoff_location": {"address": "9 Station Road"},
            "journey_stops": [{"address": "ok"}]
        });
        let violations = locations_schema().validate(&data);
        assert!(violations
            .iter()
            .any(|v| v.path == "journey_stops.0.address"));
    }

    #[test]
    fn test_waste_collection_is_a_valid_service_type() {
        let data = json!({
            "moving_items": [{"name": "Rubble bags", "category": "waste", "quantity": 10}],
            "service_type": "waste_collection",
            "item_size": "large"
        });
        assert!(items_schema().validate(&data).is_empty());
    }

    #[test]
    fn test_schedule_step_formats() {
        let bad = json!({
            "preferred_date": "next tuesday",
            "preferred_time": "morning",
            "priority": "standard"
        });
        let violations = schedule_schema().validate(&bad);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "preferred_date");

        let good = json!({
            "preferred_date": "2026-09-14",
            "preferred_time": "morning",
            "priority": "standard",
            "staff_count": 2
        });
        assert!(schedule_schema().validate(&good).is_empty());
    }
}
