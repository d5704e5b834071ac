#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use taskweave_core::api::{
    ArgMap, AsyncFnCapability, Capability, CapabilityError, CapabilityFuture, CapabilityRegistry,
    DependencySource, ExecutionOpts, FnCapability, Plan, TaskSpec,
};

/// Tracks how many invocations run at the same time.
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

impl Gauge {
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `sleep` sleeps for `args.ms` (default 50) and returns `{"slept": ms}`.
pub fn sleeping(gauge: Arc<Gauge>) -> Arc<dyn Capability> {
    Arc::new(AsyncFnCapability::new("sleep", move |args: ArgMap| -> CapabilityFuture {
        let gauge = gauge.clone();
        Box::pin(async move {
            let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(50);
            gauge.enter();
            tokio::time::sleep(Duration::from_millis(ms)).await;
            gauge.leave();
            Ok(json!({ "slept": ms }))
        })
    }))
}

/// `echo` returns its arguments unchanged.
pub fn echo() -> Arc<dyn Capability> {
    Arc::new(FnCapability::new("echo", |args: &ArgMap| {
        Ok(Value::Object(args.clone()))
    }))
}

/// `fail` always reports a capability error.
pub fn failing() -> Arc<dyn Capability> {
    Arc::new(FnCapability::new(
        "fail",
        |args: &ArgMap| -> Result<Value, CapabilityError> {
            let reason = args
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("requested failure");
            Err(CapabilityError::Failed(reason.to_string()))
        },
    ))
}

/// `panic` panics inside the capability.
pub fn panicking() -> Arc<dyn Capability> {
    Arc::new(FnCapability::new(
        "panic",
        |_args: &ArgMap| -> Result<Value, CapabilityError> { panic!("capability bug") },
    ))
}

/// `block` holds its thread in `std::thread::sleep` for `args.ms` (default 600).
pub fn blocking() -> Arc<dyn Capability> {
    Arc::new(FnCapability::new("block", |args: &ArgMap| {
        let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(600);
        std::thread::sleep(Duration::from_millis(ms));
        Ok(json!({ "blocked": ms }))
    }))
}

pub fn registry(gauge: Arc<Gauge>) -> CapabilityRegistry {
    CapabilityRegistry::new()
        .with(sleeping(gauge))
        .with(echo())
        .with(failing())
        .with(panicking())
}

pub fn opts(max_workers: usize, timeout_ms: u64) -> ExecutionOpts {
    ExecutionOpts::default()
        .with_max_workers(max_workers)
        .with_task_timeout(Duration::from_millis(timeout_ms))
}

pub fn sleep_task(id: u32, ms: u64) -> TaskSpec {
    TaskSpec::new(id, "sleep").with_arg("ms", ms)
}

/// Plan whose edges are exactly the declared `depends_on` lists.
pub fn explicit_plan(specs: Vec<TaskSpec>) -> Plan {
    let deps = specs
        .iter()
        .map(|s| (s.id, s.depends_on.clone().unwrap_or_default()))
        .collect();
    Plan::assemble("integration test", &specs, deps, DependencySource::Explicit)
}
