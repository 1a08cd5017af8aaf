pub mod filename;
pub mod identifiers;
pub mod jwt;
pub mod password;
