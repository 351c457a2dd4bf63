pub mod access;
pub mod api;
pub mod events;
pub mod lifecycle;
pub mod models;
