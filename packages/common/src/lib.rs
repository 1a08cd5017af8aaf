pub mod blurhash;
pub mod storage;

pub use blurhash::{BlurhashError, Components};
