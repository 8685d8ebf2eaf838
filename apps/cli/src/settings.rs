//! Layered settings: defaults, optional file, `FHIRTYPES__*` environment, flags

use crate::GlobalArgs;
use fhirtypes_models::{DecodeMode, DecodeOptions};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const ENV_PREFIX: &str = "FHIRTYPES";
const DEFAULT_CONFIG_NAME: &str = "fhirtypes";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub decode: DecodeOptions,
    /// Extra StructureDefinition files or directories
    pub definitions: Vec<PathBuf>,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Settings {
    pub fn load(args: &GlobalArgs) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?);

        builder = match &args.config {
            Some(path) => builder.add_source(config::File::from(path.clone())),
            None => builder.add_source(config::File::with_name(DEFAULT_CONFIG_NAME).required(false)),
        };

        // FHIRTYPES__DECODE__MODE=lenient, FHIRTYPES__LOGGING__JSON=true
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        settings.apply_args(args);
        Ok(settings)
    }

    fn apply_args(&mut self, args: &GlobalArgs) {
        if args.lenient {
            self.decode.mode = DecodeMode::Lenient;
        }
        if let Some(max_depth) = args.max_depth {
            self.decode.max_depth = max_depth;
        }
        if args.json_logs {
            self.logging.json = true;
        }
        self.definitions.extend(args.definitions.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> GlobalArgs {
        GlobalArgs {
            type_name: None,
            lenient: false,
            max_depth: None,
            definitions: Vec::new(),
            config: None,
            json_logs: false,
        }
    }

    #[test]
    fn defaults_are_strict() {
        let settings = Settings::default();
        assert_eq!(settings.decode.mode, DecodeMode::Strict);
        assert_eq!(settings.decode.max_depth, 64);
        assert!(!settings.logging.json);
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(
            &path,
            "definitions = [\"profiles\"]\n\n[decode]\nmode = \"strict\"\nmax_depth = 8\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();

        let mut args = args();
        args.config = Some(path);
        args.lenient = true;
        args.definitions = vec![PathBuf::from("more")];

        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.decode.mode, DecodeMode::Lenient);
        assert_eq!(settings.decode.max_depth, 8);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(
            settings.definitions,
            vec![PathBuf::from("profiles"), PathBuf::from("more")]
        );
    }
}
