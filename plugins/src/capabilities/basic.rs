use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use taskweave_core::executor::traits::Capability;
use taskweave_core::executor::types::{ArgMap, CapabilityError};

use super::parse_args;

/// Returns its arguments unchanged (or just `message` when that is the only key).
pub struct EchoCapability;

#[async_trait]
impl Capability for EchoCapability {
    fn name(&self) -> &str {
        "echo"
    }

    async fn invoke(&self, args: &ArgMap) -> Result<Value, CapabilityError> {
        match args.get("message") {
            Some(message) if args.len() == 1 => Ok(message.clone()),
            _ => Ok(Value::Object(args.clone())),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SleepArgs {
    #[serde(default = "default_sleep_ms")]
    ms: u64,
}

fn default_sleep_ms() -> u64 {
    100
}

/// Waits `ms` milliseconds (capped) and reports how long it slept.
pub struct SleepCapability {
    max_ms: u64,
}

impl SleepCapability {
    pub fn new(max_ms: u64) -> Self {
        Self { max_ms }
    }
}

impl Default for SleepCapability {
    fn default() -> Self {
        Self::new(60_000)
    }
}

#[async_trait]
impl Capability for SleepCapability {
    fn name(&self) -> &str {
        "sleep"
    }

    async fn invoke(&self, args: &ArgMap) -> Result<Value, CapabilityError> {
        let parsed: SleepArgs = parse_args(args)?;
        if parsed.ms > self.max_ms {
            return Err(CapabilityError::InvalidArgs(format!(
                "ms must be at most {}, got {}",
                self.max_ms, parsed.ms
            )));
        }
        tokio::time::sleep(Duration::from_millis(parsed.ms)).await;
        Ok(json!({ "slept_ms": parsed.ms }))
    }
}
