//! Asset Locator - URI 到文件路径 / HTTP URL 的映射
//!
//! 资源 URI 形如 `{base_url}/{file}`。文件探测与无头播放器
//! 通过 `root_dir` 在本地定位，HTTP 探测通过 `origin` 补全为绝对 URL。

use std::path::{Component, Path, PathBuf};

/// 资源定位器
#[derive(Debug, Clone)]
pub struct AssetLocator {
    base_url: String,
    root_dir: PathBuf,
    origin: String,
}

impl AssetLocator {
    pub fn new(
        base_url: impl Into<String>,
        root_dir: impl AsRef<Path>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            root_dir: root_dir.as_ref().to_path_buf(),
            origin: origin.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// URI → 本地文件路径
    ///
    /// 带 base_url 前缀的 URI 映射到 root_dir 下；其余相对路径按原样处理。
    /// 含 `..` 的路径被拒绝。
    pub fn local_path(&self, uri: &str) -> Option<PathBuf> {
        if is_remote(uri) {
            return None;
        }

        let base = self.base_url.trim_end_matches('/');
        let relative = match uri.strip_prefix(base) {
            Some(rest) if !base.is_empty() && (rest.is_empty() || rest.starts_with('/')) => {
                rest.trim_start_matches('/')
            }
            _ => {
                let path = Path::new(uri);
                if path.is_absolute() {
                    return safe(path).then(|| path.to_path_buf());
                }
                uri
            }
        };

        let relative = Path::new(relative);
        if relative.as_os_str().is_empty() || !safe(relative) {
            return None;
        }
        Some(self.root_dir.join(relative))
    }

    /// URI → 绝对 HTTP URL
    pub fn http_url(&self, uri: &str) -> String {
        if is_remote(uri) {
            return uri.to_string();
        }
        format!(
            "{}/{}",
            self.origin.trim_end_matches('/'),
            uri.trim_start_matches('/')
        )
    }
}

/// 是否为 http(s) 绝对 URL
pub fn is_remote(uri: &str) -> bool {
    uri.starts_with("http://") || uri.starts_with("https://")
}

fn safe(path: &Path) -> bool {
    !path
        .components()
        .any(|component| matches!(component, Component::ParentDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locator() -> AssetLocator {
        AssetLocator::new(
            "/audio/conversation",
            "public/audio/conversation",
            "http://localhost:3000/",
        )
    }

    #[test]
    fn test_base_prefixed_uri_maps_into_root() {
        assert_eq!(
            locator().local_path("/audio/conversation/hello.mp3"),
            Some(PathBuf::from("public/audio/conversation/hello.mp3"))
        );
    }

    #[test]
    fn test_prefix_must_end_at_segment_boundary() {
        assert_eq!(
            locator().local_path("/audio/conversational/x.mp3"),
            Some(PathBuf::from("/audio/conversational/x.mp3"))
        );
    }

    #[test]
    fn test_parent_components_rejected() {
        assert_eq!(locator().local_path("/audio/conversation/../secret"), None);
        assert_eq!(locator().local_path("../secret"), None);
    }

    #[test]
    fn test_remote_uris() {
        assert_eq!(locator().local_path("https://cdn/x.mp3"), None);
        assert_eq!(locator().http_url("https://cdn/x.mp3"), "https://cdn/x.mp3");
        assert_eq!(
            locator().http_url("/audio/conversation/hello.mp3"),
            "http://localhost:3000/audio/conversation/hello.mp3"
        );
    }
}
