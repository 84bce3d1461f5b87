//! Domain model: aggregates and value objects.
pub mod aggregates;
pub mod value_objects;
