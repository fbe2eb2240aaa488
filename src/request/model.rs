//! The service request aggregate spanning all wizard steps
//!
//! Field ownership across steps is disjoint: each field is validated by
//! exactly one step's schema (see `schemas`). The whole aggregate is only
//! decoded from the working JSON object at submission time.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Latitude/longitude pair captured by address autocomplete
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Property kind at a pickup or dropoff location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Office,
    Storage,
    Other,
}

/// One end of the journey (pickup or dropoff)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Location {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_parking: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// An intermediate stop between pickup and dropoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct JourneyStop {
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// One item in the moving inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingItem {
    pub name: String,
    pub category: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<String>,
    #[serde(default)]
    pub fragile: bool,
    #[serde(default)]
    pub needs_disassembly: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_value: Option<f64>,
}

impl Default for MovingItem {
    fn default() -> Self {
        Self {
            name: String::new(),
            category: String::new(),
            quantity: 1,
            weight_kg: None,
            dimensions: None,
            fragile: false,
            needs_disassembly: false,
            photos: Vec::new(),
            declared_value: None,
        }
    }
}

/// Kind of service being requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[default]
    ResidentialMove,
    OfficeMove,
    SingleItem,
    WasteCollection,
}

/// Rough overall load size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemSize {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

/// Vehicle requested for the job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    SmallVan,
    MediumVan,
    Luton,
    Truck,
}

/// Preferred collection window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    #[default]
    Flexible,
}

/// Scheduling urgency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    #[default]
    Standard,
    Express,
    SameDay,
}

/// The single mutable aggregate the wizard edits across all steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequestFormData {
    // Step 1: contact
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub contact_phone: String,

    // Step 2: locations
    #[serde(default)]
    pub pickup_location: Location,
    #[serde(default)]
    pub dropoff_location: Location,
    #[serde(default)]
    pub journey_stops: Vec<JourneyStop>,

    // Step 3: items and service details
    #[serde(default)]
    pub moving_items: Vec<MovingItem>,
    #[serde(default)]
    pub service_type: ServiceType,
    #[serde(default)]
    pub item_size: ItemSize,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub photo_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_handling: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_type: Option<VehicleType>,

    // Step 4: scheduling and pricing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_date: Option<NaiveDate>,
    #[serde(default)]
    pub preferred_time: TimeSlot,
    #[serde(default)]
    pub is_flexible: bool,
    #[serde(default)]
    pub needs_insurance: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_price: Option<f64>,
    #[serde(default = "default_staff_count")]
    pub staff_count: u32,
}

fn default_staff_count() -> u32 {
    2
}

impl Default for ServiceRequestFormData {
    fn default() -> Self {
        Self {
            contact_name: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            pickup_location: Location::default(),
            dropoff_location: Location::default(),
            journey_stops: Vec::new(),
            moving_items: Vec::new(),
            service_type: ServiceType::default(),
            item_size: ItemSize::default(),
            description: String::new(),
            photo_urls: Vec::new(),
            special_handling: None,
            vehicle_type: None,
            preferred_date: None,
            preferred_time: TimeSlot::default(),
            is_flexible: false,
            needs_insurance: false,
            priority: Priority::default(),
            selected_price: None,
            base_price: None,
            final_price: None,
            staff_count: default_staff_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_format() {
        let json = serde_json::to_value(ServiceType::WasteCollection).unwrap();
        assert_eq!(json, serde_json::json!("waste_collection"));
        let json = serde_json::to_value(VehicleType::SmallVan).unwrap();
        assert_eq!(json, serde_json::json!("small_van"));
    }

    #[test]
    fn test_defaults() {
        let data = ServiceRequestFormData::default();
        assert_eq!(data.staff_count, 2);
        assert_eq!(data.priority, Priority::Standard);
        assert_eq!(data.preferred_time, TimeSlot::Flexible);
        assert!(data.moving_items.is_empty());
        assert!(data.contact_name.is_empty());
    }

    #[test]
    fn test_round_trip() {
        let mut data = ServiceRequestFormData::default();
        data.contact_name = "Jo Bloggs".to_string();
        data.pickup_location.address = "12 High Street".to_string();
        data.pickup_location.coordinates = Some(Coordinates { lat: 51.5, lng: -0.1 });
        data.moving_items.push(MovingItem {
            name: "Sofa".to_string(),
            category: "furniture".to_string(),
            ..MovingItem::default()
        });
        data.preferred_date = NaiveDate::from_ymd_opt(2026, 9, 14);

        let json = serde_json::to_value(&data).unwrap();
        let back: ServiceRequestFormData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let back: ServiceRequestFormData =
            serde_json::from_value(serde_json::json!({"contact_name": "Jo"})).unwrap();
        assert_eq!(back.contact_name, "Jo");
        assert_eq!(back.staff_count, 2);
        assert!(back.journey_stops.is_empty());
    }
}
