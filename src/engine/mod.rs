pub mod codes;
pub mod destination;
pub mod eta;
pub mod fee;
pub mod lifecycle;
pub mod loyalty;
pub mod orders;
pub mod sweeper;
pub mod tracking;
