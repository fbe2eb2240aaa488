//! Service request domain: the form data aggregate and its step schema set

pub mod model;
pub mod schemas;

pub use model::{
    Coordinates, ItemSize, JourneyStop, Location, MovingItem, Priority, PropertyType,
    ServiceRequestFormData, ServiceType, TimeSlot, VehicleType,
};
pub use schemas::{default_form_data, full_schema, service_request_steps};
