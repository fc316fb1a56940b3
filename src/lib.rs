pub mod config;
pub mod coordinator;
pub mod error;
pub mod facade;
pub mod gateway;
pub mod health;
pub mod id_types;
pub mod logging;
pub mod metrics;
pub mod protocol;
pub mod room;

pub use coordinator::RoomCoordinator;
pub use facade::SfuFacade;
pub use room::{Room, RoomRegistry};
