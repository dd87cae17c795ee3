pub mod api;
pub mod client;
pub mod mock;
pub mod types;

pub use client::{ControlPlane, HttpControlPlane};
pub use mock::MockControlPlane;
pub use types::{AgentSelf, CatalogNode, CatalogNodeServices, CatalogServices, HealthCheck};
