pub mod constants;
pub mod engine;
pub mod error;
pub mod grid;
pub mod room_store;
pub mod server_protocol;
pub mod server_utils;
pub mod types;
