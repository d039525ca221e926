//! Typed configuration tree and remote-sync merge strategies (C12).
//!
//! Loading follows the teacher's layered-source pattern
//! (`config::Config::builder()` + `File` + `Environment`, highest
//! priority last): environment variables (`CASTBOT_` prefix) override
//! `config/{env}.yaml`, which overrides `config/default.yaml`.

pub mod document;
pub mod error;
pub mod sync;

pub use document::{ConfigDocument, ProviderNames, RateLimitSettings, SyncSettings};
pub use error::ConfigError;
pub use sync::{merge, strip_protected, MergeStrategy, RemoteConfigStore, SyncEngine, SyncEvent, SyncEventKind, PROTECTED_PATHS};

use config::{Config, Environment, File};
use std::path::Path;

/// Loads and validates a `ConfigDocument` from `config/default.yaml`,
/// optionally layered with `config/{env}.yaml`, and `CASTBOT_`-prefixed
/// environment variables (highest priority).
pub fn load(env: Option<&str>) -> Result<ConfigDocument, ConfigError> {
    load_from(Path::new("config"), env)
}

/// Same as `load`, but rooted at an explicit config directory instead of
/// the process's current working directory. Exists so tests don't have
/// to mutate global process state to exercise file loading.
pub fn load_from(config_dir: &Path, env: Option<&str>) -> Result<ConfigDocument, ConfigError> {
    let mut builder = Config::builder();

    let default_path = config_dir.join("default").to_string_lossy().into_owned();
    builder = builder.add_source(File::with_name(&default_path).required(false));
    if let Some(env_name) = env {
        let env_path = config_dir.join(env_name).to_string_lossy().into_owned();
        builder = builder.add_source(File::with_name(&env_path).required(false));
    }
    builder = builder.add_source(Environment::with_prefix("CASTBOT").separator("__").try_parsing(true));

    let config = builder.build()?;
    let document: ConfigDocument = config.try_deserialize()?;
    document.validate()?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_falls_back_to_defaults_when_no_files_present() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_from(dir.path(), None);
        // No providers configured anywhere -> fails validation, not parsing.
        assert!(matches!(result, Err(ConfigError::MissingField(_))));
    }

    #[test]
    fn load_reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("default.yaml")).unwrap();
        writeln!(
            f,
            "providers:\n  stt: [\"primary\"]\n  llm: [\"primary\"]\n  moderation: [\"primary\"]\n"
        )
        .unwrap();

        let document = load_from(dir.path(), None).unwrap();
        assert_eq!(document.providers.stt, vec!["primary".to_string()]);
    }
}
