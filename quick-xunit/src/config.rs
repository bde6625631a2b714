// Copyright (c) The quick-xunit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report configuration, read from TOML.

use crate::{
    builder::RenderOptions,
    errors::{ConfigParseError, ConfigParseErrorKind},
    serialize::{MAX_INDENT, SerializeOptions},
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Report settings: where the report goes and how it is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportConfig {
    path: Utf8PathBuf,
    indent: usize,
    render: RenderOptions,
}

impl ReportConfig {
    /// The path, relative to the workspace root, at which user config is looked up.
    pub const CONFIG_PATH: &'static str = ".config/xunit-report.toml";

    /// Contains the default config as a TOML file.
    ///
    /// User config is merged on top of this.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the config from `config_file`, or from [`Self::CONFIG_PATH`] under
    /// `workspace_root` if it exists.
    ///
    /// An explicitly passed in `config_file` must exist. Unknown keys are logged and otherwise
    /// ignored.
    pub fn from_sources(
        workspace_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let workspace_root = workspace_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (config, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            let keys: Vec<_> = unknown.into_iter().collect();
            warn!(
                target: "quick_xunit::config",
                "ignoring unknown config keys in {config_file}: {}",
                keys.join(", "),
            );
        }

        config
            .report
            .into_config(&workspace_root)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))
    }

    /// Returns the default config, with paths resolved against `workspace_root`.
    pub fn default_config(workspace_root: impl Into<Utf8PathBuf>) -> Self {
        let workspace_root = workspace_root.into();
        let config = Self::make_default_config()
            .build()
            .expect("default config is always valid");
        let deserialized: ReportConfigDeserialize = config
            .try_deserialize()
            .expect("default config is always valid");
        deserialized
            .report
            .into_config(&workspace_root)
            .expect("default config is always valid")
    }

    /// Returns the absolute path the report is written to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Overrides the report path.
    pub fn set_path(&mut self, path: impl Into<Utf8PathBuf>) -> &mut Self {
        self.path = path.into();
        self
    }

    /// Returns the render options described by this config.
    pub fn render_options(&self) -> RenderOptions {
        self.render.clone()
    }

    /// Returns the serialize options described by this config.
    pub fn serialize_options(&self) -> SerializeOptions {
        let mut options = SerializeOptions::new();
        options.set_indent(self.indent);
        options
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ReportConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ReportConfigDeserialize = serde_path_to_error::deserialize(ignored_de)
            .map_err(|error| {
                // serde_path_to_error already reports the key, so drop it from the config error.
                let path = error.path().clone();
                let config_error = error.into_inner();
                let error = match config_error {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportConfigDeserialize {
    report: ReportImpl,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ReportImpl {
    path: Utf8PathBuf,
    indent: usize,
    #[serde(default)]
    test_framework: Option<String>,
    #[serde(default)]
    environment: Option<String>,
    store_success_output: bool,
    store_failure_output: bool,
}

impl ReportImpl {
    fn into_config(self, workspace_root: &Utf8Path) -> Result<ReportConfig, ConfigParseErrorKind> {
        if self.indent > MAX_INDENT {
            return Err(ConfigParseErrorKind::IndentOutOfRange {
                max: MAX_INDENT,
                found: self.indent,
            });
        }

        let mut render = RenderOptions::new();
        render
            .set_store_success_output(self.store_success_output)
            .set_store_failure_output(self.store_failure_output);
        if let Some(test_framework) = self.test_framework {
            render
                .set_test_framework(test_framework)
                .map_err(ConfigParseErrorKind::InvalidOption)?;
        }
        if let Some(environment) = self.environment {
            render
                .set_environment(environment)
                .map_err(ConfigParseErrorKind::InvalidOption)?;
        }

        Ok(ReportConfig {
            path: workspace_root.join(&self.path),
            indent: self.indent,
            render,
        })
    }
}
