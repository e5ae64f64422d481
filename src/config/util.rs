//! Configuration utility functions.

use std::path::{Path, PathBuf};

use super::ConfigDiagnostics;

/// Find config file by searching upward from current directory
///
/// Starts from cwd and walks up parent directories until finding `config_name`
/// Returns the absolute path to the config file if found
///
/// # Example
/// ```text
/// /home/user/theme/src/scss/  ← cwd
/// /home/user/theme/brook.toml ← found!
/// ```
pub fn find_config_file(config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let cwd = std::env::current_dir().ok()?;
    let mut current = cwd.as_path();
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }

        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

/// Expand `~` and resolve a relative path against `base`.
pub fn expand_path(path: &Path, base: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).into_owned();
    let path = PathBuf::from(expanded);
    if path.is_relative() && !base.as_os_str().is_empty() {
        base.join(path)
    } else {
        path
    }
}

/// Record a diagnostic if `pattern` is not a valid glob.
pub fn check_glob(diag: &mut ConfigDiagnostics, field: &str, pattern: &str) {
    if let Err(e) = globset::Glob::new(pattern) {
        diag.error(field, format!("invalid glob `{pattern}`: {}", e.kind()));
    }
}

/// Proxy targets must be absolute `http`/`https` URLs.
pub fn check_proxy_url(url_str: &str) -> Result<(), String> {
    let parsed = url::Url::parse(url_str).map_err(|e| format!("invalid URL `{url_str}`: {e}"))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(()),
        "http" | "https" => Err(format!("`{url_str}` has no host")),
        other => Err(format!("unsupported scheme `{other}`, expected http or https")),
    }
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_proxy_url() {
        assert!(check_proxy_url("http://localhost:8080").is_ok());
        assert!(check_proxy_url("https://dev.example.test/").is_ok());
        assert!(check_proxy_url("ftp://example.com").is_err());
        assert!(check_proxy_url("localhost:8080").is_err());
        assert!(check_proxy_url("not a url").is_err());
    }

    #[test]
    fn test_expand_path() {
        assert_eq!(
            expand_path(Path::new("src/"), Path::new("/project")),
            PathBuf::from("/project/src/")
        );
        assert_eq!(
            expand_path(Path::new("/abs/dist"), Path::new("/project")),
            PathBuf::from("/abs/dist")
        );
        assert_eq!(
            expand_path(Path::new("report.json"), Path::new("")),
            PathBuf::from("report.json")
        );
        assert!(!expand_path(Path::new("~/x"), Path::new("/p")).starts_with("~"));
    }

    #[test]
    fn test_check_glob() {
        let mut diag = ConfigDiagnostics::new();
        check_glob(&mut diag, "fonts.pattern", "**/*.{woff,woff2}");
        assert!(diag.is_empty());
        check_glob(&mut diag, "fonts.pattern", "**/*.{woff");
        assert_eq!(diag.len(), 1);
    }
}
