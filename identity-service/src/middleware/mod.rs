pub mod auth;
pub mod guards;

pub use auth::{auth_middleware, AuthStaff};
pub use guards::{
    admin_guard, admin_or_lead_guard, evaluate_route_access, route_access_guard, RouteAccess,
};
