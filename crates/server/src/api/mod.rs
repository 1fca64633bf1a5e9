pub mod audit;
pub mod handlers;
pub mod middleware;
pub mod personnel;
pub mod routes;
pub mod units;

pub use routes::create_router;
