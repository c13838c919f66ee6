use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use config::{Config, Environment, File};
use regex::Regex;
use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_CONFIG_FILE: &str = "slgb-converter";

static NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap());

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub db_path: PathBuf,
    /// Block namespace whose markers get converted (`wp:{namespace}/...`).
    pub namespace: String,
    pub post_types: Vec<String>,
    pub keep_revisions: bool,
}

impl Settings {
    /// Defaults, then the config file (explicit path or optional
    /// `slgb-converter.toml`), then `SLGB_*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("db_path", "data/posts.sqlite")?
            .set_default("namespace", "slgb")?
            .set_default("post_types", vec!["post"])?
            .set_default("keep_revisions", true)?;

        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("SLGB")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("post_types"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if !NAMESPACE_RE.is_match(&self.namespace) {
            return Err(Error::InvalidNamespace(self.namespace.clone()));
        }
        Ok(())
    }

    /// Substring every candidate document contains.
    pub fn marker(&self) -> String {
        format!("wp:{}/", self.namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(namespace: &str) -> Settings {
        Settings {
            db_path: PathBuf::from("data/posts.sqlite"),
            namespace: namespace.to_string(),
            post_types: vec!["post".to_string()],
            keep_revisions: true,
        }
    }

    #[test]
    fn defaults_load_without_file() {
        let s = Settings::load(None).unwrap();
        assert_eq!(s.namespace, "slgb");
        assert_eq!(s.post_types, vec!["post".to_string()]);
        assert!(s.keep_revisions);
    }

    #[test]
    fn marker_uses_namespace() {
        assert_eq!(settings("slgb").marker(), "wp:slgb/");
    }

    #[test]
    fn rejects_namespace_with_regex_metacharacters() {
        assert!(matches!(
            settings("slgb/.*").validate(),
            Err(Error::InvalidNamespace(_))
        ));
        assert!(settings("my-blocks").validate().is_ok());
    }
}
