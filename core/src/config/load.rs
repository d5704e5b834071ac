use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default taskweave data directory: ~/.taskweave
pub fn get_taskweave_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".taskweave"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.taskweave/config.toml (highest)
    let data_dir = get_taskweave_data_dir()?;
    let user_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg = if user_config.exists() {
        parse_file(&user_config)?
    } else if local_config.exists() {
        parse_file(local_config)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load exactly one file, then apply environment overrides.
pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let mut cfg = parse_file(path)?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

fn parse_file(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// Environment variable overrides (Priority 0: highest)
pub fn apply_env_overrides(cfg: &mut AppConfig) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

fn apply_overrides_from(cfg: &mut AppConfig, get: impl Fn(&str) -> Option<String>) {
    if let Some(v) = get("TASKWEAVE_MAX_WORKERS") {
        match v.trim().parse::<usize>() {
            Ok(n) if n > 0 => cfg.executor.max_workers = n,
            _ => tracing::warn!("ignoring invalid TASKWEAVE_MAX_WORKERS={}", v),
        }
    }
    if let Some(v) = get("TASKWEAVE_TASK_TIMEOUT_MS") {
        match v.trim().parse::<u64>() {
            Ok(n) if n > 0 => cfg.executor.task_timeout_ms = n,
            _ => tracing::warn!("ignoring invalid TASKWEAVE_TASK_TIMEOUT_MS={}", v),
        }
    }
    if let Some(v) = get("TASKWEAVE_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::types::DependencyMode;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.executor.max_workers, 3);
        assert_eq!(cfg.executor.task_timeout_ms, 30_000);
        assert!(cfg.executor.sequential_fallback);
        assert_eq!(cfg.executor.dependency_mode, DependencyMode::Auto);
        assert!(cfg.inference.write_capabilities.contains(&"write_file".to_string()));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[executor]
max_workers = 8
dependency_mode = "inferred"

[inference]
write_capabilities = ["write_file", "delete_file"]
commuting_pairs = [["web_search", "web_search"]]
"#
        )
        .unwrap();

        let cfg = parse_file(file.path()).unwrap();
        assert_eq!(cfg.executor.max_workers, 8);
        assert_eq!(cfg.executor.task_timeout_ms, 30_000);
        assert_eq!(cfg.executor.dependency_mode, DependencyMode::Inferred);
        assert_eq!(
            cfg.inference.write_capabilities,
            vec!["write_file".to_string(), "delete_file".to_string()]
        );
        assert_eq!(cfg.inference.commuting_pairs.len(), 1);
        assert_eq!(cfg.inference.resource_keys, vec!["path", "file", "target"]);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[executor]\nmax_workers = \"many\"").unwrap();
        assert!(parse_file(file.path()).is_err());
        assert!(parse_file(Path::new("/definitely/not/here.toml")).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TASKWEAVE_MAX_WORKERS", "6"),
            ("TASKWEAVE_TASK_TIMEOUT_MS", "nope"),
            ("TASKWEAVE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut cfg = AppConfig::default();
        apply_overrides_from(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.executor.max_workers, 6);
        assert_eq!(cfg.executor.task_timeout_ms, 30_000);
        assert_eq!(cfg.logging.level, "debug");
    }
}
