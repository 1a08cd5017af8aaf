use serde::{Deserialize, Deserializer};

/// Serde helper for nullable fields that can also be omitted.
///
/// * JSON field absent  => `None`          (leave unchanged)
/// * JSON field = null  => `Some(None)`    (clear)
/// * JSON field = value => `Some(Some(v))` (set)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}
