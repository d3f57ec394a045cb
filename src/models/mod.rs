pub mod delivery_config;
pub mod location;
pub mod loyalty;
pub mod order;
