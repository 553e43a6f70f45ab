//! Output-path formatting for non-inplace runs.
//!
//! The template carries `{filename}` (stem) and `{ext}` placeholders; the
//! result lands in the same directory as the input. `foo.py` with the default
//! `{filename}_typed.{ext}` becomes `foo_typed.py` next to `foo.py`.

use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Default naming template for derived output files.
pub const DEFAULT_FORMAT: &str = "{filename}_typed.{ext}";

/// Apply `template` to the file name of `path`, keeping its directory.
pub fn format_output_path(path: &Path, template: &str) -> Result<PathBuf> {
    if !template.contains("{filename}") {
        return Err(ConfigError::InvalidFormat(format!(
            "template `{template}` has no {{filename}} placeholder"
        ))
        .into());
    }
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let name = template.replace("{filename}", stem).replace("{ext}", ext);
    Ok(path.with_file_name(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_appends_typed() {
        let out = format_output_path(Path::new("/tmp/foo.py"), DEFAULT_FORMAT).unwrap();
        assert_eq!(out, PathBuf::from("/tmp/foo_typed.py"));
    }

    #[test]
    fn directory_is_preserved() {
        let out = format_output_path(Path::new("a/b/c/script.py"), "{filename}.annotated.{ext}")
            .unwrap();
        assert_eq!(out, PathBuf::from("a/b/c/script.annotated.py"));
    }

    #[test]
    fn extensionless_file_keeps_template_shape() {
        let out = format_output_path(Path::new("/tmp/script"), DEFAULT_FORMAT).unwrap();
        assert_eq!(out, PathBuf::from("/tmp/script_typed."));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        assert!(format_output_path(Path::new("x.py"), "fixed_name.py").is_err());
    }
}
