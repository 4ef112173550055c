pub mod mileage_controller;
pub mod trip_controller;
