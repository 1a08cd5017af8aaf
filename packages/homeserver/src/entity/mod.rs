pub mod media;
pub mod profile_field;
pub mod room;
pub mod room_event;
pub mod room_membership;
pub mod user;
