use anyhow::Context;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Loads `configuration/base.yaml` (or `test.yaml` when testing) from the
/// current directory, overridden by `APP_`-prefixed environment variables,
/// e.g. `APP_TELEGRAM__BOT_TOKEN`.
pub fn config<Settings: DeserializeOwned>() -> anyhow::Result<Settings> {
    let base_path = std::env::current_dir().context("Failed to determine the current directory")?;
    config_from(&base_path.join("configuration"))
}

pub fn config_from<Settings: DeserializeOwned>(
    configuration_directory: &Path,
) -> anyhow::Result<Settings> {
    let file = if cfg!(test) { "test.yaml" } else { "base.yaml" };
    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join(file)))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .with_context(|| {
            format!(
                "Failed to build configuration from {}",
                configuration_directory.display()
            )
        })?;

    settings
        .try_deserialize::<Settings>()
        .context("Failed to deserialize settings")
}

#[cfg(test)]
mod tests {
    use super::config_from;
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    struct Section {
        host: String,
        retries: u32,
    }

    #[derive(Deserialize, Debug)]
    struct Settings {
        section: Section,
    }

    #[test]
    fn test_reads_the_test_file_when_compiled_for_tests() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("test.yaml"),
            "section:\n  host: \"http://localhost\"\n  retries: 2\n",
        )
        .unwrap();

        let settings = config_from::<Settings>(dir.path()).unwrap();
        assert_eq!(settings.section.host, "http://localhost");
        assert_eq!(settings.section.retries, 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(config_from::<Settings>(dir.path()).is_err());
    }
}
