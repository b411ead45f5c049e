pub mod alloc;
pub mod http;
pub mod model;
pub mod observability;
pub mod reset;
pub mod schedule;
