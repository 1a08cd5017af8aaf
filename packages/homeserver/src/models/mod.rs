pub mod auth;
pub mod federation;
pub mod media;
pub mod profile;
pub mod room;
pub mod shared;
