//! Wire types shared by the orderhub store, handlers and server.

pub mod api;
pub mod catalog;
pub mod events;
pub mod models;
