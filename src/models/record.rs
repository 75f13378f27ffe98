//! The record contract shared by every store.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A value a store can persist.
///
/// Records round-trip through `serde_json` using the serializer's default
/// field naming unless the type customizes it with serde attributes.
///
/// Records are owned values (`'static`) so stores can hold boxed key and
/// identity functions over them.
///
/// [`Record::type_name`] feeds default name resolution: a `Film` record is
/// stored under `films` unless the store is given an explicit name.
pub trait Record: Serialize + DeserializeOwned + Default + 'static {
    /// Singular, unqualified name of the record type.
    ///
    /// Defaults to the last path segment of [`std::any::type_name`] with any
    /// generic arguments removed.
    fn type_name() -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }
}

impl Record for serde_json::Value {
    fn type_name() -> String {
        "Value".to_string()
    }
}

/// Strips module paths and generic arguments from a fully qualified type name.
///
/// ```rust
/// use flatstore::models::short_type_name;
///
/// assert_eq!(short_type_name("my_app::models::Film"), "Film");
/// assert_eq!(short_type_name("my_app::Wrapper<my_app::Film>"), "Wrapper");
/// ```
#[must_use]
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
