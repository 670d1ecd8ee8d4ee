use std::path::Path;

use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{ParserOptions, StyleSheet},
};

use crate::error::{BuildError, Result};

/// Re-print `css` without comments.
pub fn strip_comments(css: &str, path: &Path) -> Result<String> {
    let stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: path.to_string_lossy().to_string(),
            ..Default::default()
        },
    )
    .map_err(|e| BuildError::compilation(path, format!("invalid CSS: {e:?}")))?;

    let printed = stylesheet
        .to_css(PrinterOptions::default())
        .map_err(|e| BuildError::compilation(path, format!("failed to print CSS: {e:?}")))?;

    Ok(printed.code)
}
