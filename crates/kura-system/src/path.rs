//! Path composition helpers shared by the backends.

use url::Url;

/// Join a backend base location and a relative path.
///
/// An empty base leaves the path untouched, a missing path yields the base.
pub fn join_to_base(base: &str, path: Option<&str>) -> String {
    match path {
        _ if base.is_empty() => path.unwrap_or_default().to_string(),
        None => base.to_string(),
        Some(path) => format!("{base}/{path}"),
    }
}

/// Base location encoded in a filesystem-like URL.
///
/// `mem://scratch/a` gives `scratch/a`, `file:///tmp/x` gives `/tmp/x`.
pub fn url_to_file_system_base(url: &Url) -> String {
    let path = url.path();
    match url.host_str() {
        Some(host) if !host.is_empty() => {
            let rest = path.trim_end_matches('/');
            format!("{host}{rest}")
        }
        _ => trim_trailing_slash(path).to_string(),
    }
}

/// Current working directory with any Windows drive prefix dropped.
///
/// `C:\foo\bar` becomes `\foo\bar`; unix paths pass through.
pub fn portable_cwd() -> std::io::Result<String> {
    let cwd = std::env::current_dir()?;
    let cwd = cwd.to_string_lossy();
    Ok(strip_drive(&cwd).to_string())
}

fn strip_drive(path: &str) -> &str {
    match path.split_once(':') {
        Some((_, rest)) => rest,
        None => path,
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_to_base() {
        assert_eq!(join_to_base("", Some("a.txt")), "a.txt");
        assert_eq!(join_to_base("", None), "");
        assert_eq!(join_to_base("base", None), "base");
        assert_eq!(join_to_base("base", Some("a.txt")), "base/a.txt");
        assert_eq!(join_to_base("/var/lib", Some("x/y")), "/var/lib/x/y");
    }

    #[test]
    fn test_url_base_with_host() {
        let url = Url::parse("mem://scratch/a/b").unwrap();
        assert_eq!(url_to_file_system_base(&url), "scratch/a/b");

        let url = Url::parse("mem://scratch").unwrap();
        assert_eq!(url_to_file_system_base(&url), "scratch");
    }

    #[test]
    fn test_url_base_without_host() {
        let url = Url::parse("file:///tmp/x/").unwrap();
        assert_eq!(url_to_file_system_base(&url), "/tmp/x");

        let url = Url::parse("file:///").unwrap();
        assert_eq!(url_to_file_system_base(&url), "/");
    }

    #[test]
    fn test_strip_drive() {
        assert_eq!(strip_drive("C:\\foo\\bar"), "\\foo\\bar");
        assert_eq!(strip_drive("/home/amy"), "/home/amy");
    }
}
