pub mod basic;
pub mod fs;

pub use basic::{EchoCapability, SleepCapability};
pub use fs::{ListDirCapability, ReadFileCapability, WriteFileCapability};

use serde::de::DeserializeOwned;
use serde_json::Value;
use taskweave_core::executor::types::{ArgMap, CapabilityError};

/// Decode an argument map into a typed argument struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: &ArgMap) -> Result<T, CapabilityError> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| CapabilityError::InvalidArgs(e.to_string()))
}
