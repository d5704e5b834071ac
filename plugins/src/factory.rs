use std::path::PathBuf;
use std::sync::Arc;

use taskweave_core::config::{AppConfig, InferenceConfig};
use taskweave_core::executor::traits::OutputRendererPlugin;
use taskweave_core::executor::{
    CapabilityRegistry, DependencyInferencer, ExecutionEngine, ExecutionEngineBuilder,
    ExecutionOpts,
};

use crate::capabilities::{
    EchoCapability, ListDirCapability, ReadFileCapability, SleepCapability, WriteFileCapability,
};
use crate::executor::{
    ExclusiveCapabilityPredicate, JsonlRendererPlugin, PathPrefixPredicate, TextRendererPlugin,
};

/// Registry with every built-in capability. Relative file paths resolve
/// against `root` when given, else the working directory.
pub fn standard_registry(root: Option<PathBuf>) -> CapabilityRegistry {
    CapabilityRegistry::new()
        .with(Arc::new(EchoCapability))
        .with(Arc::new(SleepCapability::default()))
        .with(Arc::new(ReadFileCapability::new(root.clone())))
        .with(Arc::new(WriteFileCapability::new(root.clone())))
        .with(Arc::new(ListDirCapability::new(root)))
}

pub fn build_renderer(stream_format: &str) -> Arc<dyn OutputRendererPlugin> {
    match stream_format {
        "jsonl" => Arc::new(JsonlRendererPlugin::new(false)),
        // Anything other than jsonl behaves like text.
        _ => Arc::new(TextRendererPlugin::new(false)),
    }
}

/// Core resource predicate plus the path and exclusivity checks.
pub fn build_inferencer(cfg: &InferenceConfig) -> DependencyInferencer {
    let mut inferencer = DependencyInferencer::from_config(cfg).with_predicate(Arc::new(
        PathPrefixPredicate::new(
            cfg.read_only_capabilities.iter().cloned(),
            cfg.write_capabilities.iter().cloned(),
            cfg.resource_keys.iter().cloned(),
        ),
    ));
    if !cfg.exclusive_capabilities.is_empty() {
        inferencer = inferencer.with_predicate(Arc::new(ExclusiveCapabilityPredicate::new(
            cfg.exclusive_capabilities.iter().cloned(),
        )));
    }
    inferencer
}

/// Engine builder wired from configuration: standard registry rooted at
/// `root` and the configured inferencer. Callers add a renderer, progress
/// callback or cancel signal as needed.
pub fn engine_builder(
    cfg: &AppConfig,
    opts: ExecutionOpts,
    root: Option<PathBuf>,
) -> ExecutionEngineBuilder {
    ExecutionEngine::builder(standard_registry(root), opts)
        .inferencer(Arc::new(build_inferencer(&cfg.inference)))
}
