//! REST API server — read-only routes over crawl results, DTOs, and
//! OpenAPI documentation.

pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;
