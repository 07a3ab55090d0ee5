use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;
use crate::typedid::RemoteId;

#[derive(Clone, Debug, Serialize)]
pub struct SuccessBody {}

pub fn invalid_field(field: &'static str, reason: &'static str) -> Error {
    Error::InvalidField { field, reason }
}

/// Rejects ids that cannot be placed in an api path as is.
pub fn ensure_path_safe<T>(id: &RemoteId<T>) -> Result<(), Error> {
    if id.is_path_safe() {
        Ok(())
    } else {
        Err(invalid_field(
            "id",
            "must only contain letters, digits, '-' and '_'",
        ))
    }
}

/// Reads a field the portal api may send as `null`, falling back to the
/// type's default. Pair with `#[serde(default)]` to also cover absence.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
