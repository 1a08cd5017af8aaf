pub mod auth;
pub mod federation;
pub mod json;
