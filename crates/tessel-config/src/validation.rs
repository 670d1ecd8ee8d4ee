//! Logical validation of a loaded [`ProjectConfig`].

use std::path::Path;

use crate::error::{ConfigError, Result};
use crate::project::ProjectConfig;

impl ProjectConfig {
    /// Validate the configuration against the project on disk.
    ///
    /// # Errors
    ///
    /// - component entries that are empty, badly named or missing on disk
    /// - an extracted bundle name without the compiled style extension
    /// - identical source and compiled style extensions
    pub fn validate(&self, project_root: &Path) -> Result<()> {
        if self.style_extension.is_empty() || self.compiled_style_extension.is_empty() {
            return Err(ConfigError::invalid(
                "styleExtension",
                "style extensions cannot be empty",
            ));
        }

        if self.style_extension == self.compiled_style_extension {
            return Err(ConfigError::invalid(
                "compiledStyleExtension",
                format!(
                    "must differ from styleExtension ('{}')",
                    self.style_extension
                ),
            ));
        }

        let expected_suffix = format!(".{}", self.compiled_style_extension);
        if !self.out_css_file_name.ends_with(&expected_suffix) {
            return Err(ConfigError::invalid(
                "outCssFileName",
                format!("'{}' must end with {}", self.out_css_file_name, expected_suffix),
            ));
        }

        if let Some(entries) = &self.component_entries {
            if entries.is_empty() {
                return Err(ConfigError::MissingField {
                    field: "componentEntries".to_string(),
                    hint: "declare at least one entry or remove the field".to_string(),
                });
            }

            for name in entries.keys() {
                validate_entry_name(name)?;
            }

            for (name, path) in self.resolved_component_entries(project_root) {
                if !path.is_file() {
                    return Err(ConfigError::EntryNotFound { name, path });
                }
            }
        }

        Ok(())
    }
}

fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(ConfigError::invalid(
            "componentEntries",
            format!("'{name}' is not a usable entry name"),
        ));
    }
    if name.contains(['/', '\\']) {
        return Err(ConfigError::invalid(
            "componentEntries",
            format!("entry name '{name}' cannot contain path separators"),
        ));
    }
    Ok(())
}
