pub mod bookings;
pub mod gateway;
pub mod identity;
pub mod reconcile;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::AppError;
use crate::store::StoreError;

pub(crate) fn decode<T: DeserializeOwned>(doc: Value) -> Result<T, AppError> {
    serde_json::from_value(doc)
        .map_err(|e| AppError::Store(StoreError::Backend(e.to_string())))
}
