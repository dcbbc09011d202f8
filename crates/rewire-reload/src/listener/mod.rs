//! Rewiring listeners
//!
//! Secondary indexes rebuilt from the beans a reload cycle created or rewired.

mod route;

pub use route::{RouteEntry, RouteMappingListener, RouteTable};
