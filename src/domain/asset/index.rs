//! Asset Context - 资源索引
//!
//! 在资源映射之上提供查找逻辑与 URI 拼接，不做任何 I/O

use super::{AssetId, AssetMapping, Category};

/// 资源索引
///
/// 分类匹配规则: 按书写顺序扫描分类，第一个关键词出现在文本中、
/// 且配置了默认资源的分类胜出。分类关键词需人工维护以避免歧义重叠。
#[derive(Debug, Clone)]
pub struct AssetIndex {
    mapping: AssetMapping,
    base_url: String,
}

impl AssetIndex {
    pub fn new(mapping: AssetMapping, base_url: impl Into<String>) -> Self {
        Self {
            mapping,
            base_url: base_url.into(),
        }
    }

    /// 精确文本匹配
    pub fn exact(&self, text: &str) -> Option<&AssetId> {
        self.mapping.exact_text(text)
    }

    /// 分类启发式匹配
    pub fn category_match(&self, text: &str) -> Option<(&Category, &AssetId)> {
        self.mapping
            .category_keywords()
            .iter()
            .filter(|(_, keywords)| {
                keywords
                    .iter()
                    .any(|keyword| !keyword.is_empty() && text.contains(keyword.as_str()))
            })
            .find_map(|(category, _)| {
                self.mapping
                    .category_default(category)
                    .map(|asset| (category, asset))
            })
    }

    pub fn fallback_default(&self) -> &AssetId {
        self.mapping.fallback_default()
    }

    pub fn silence_asset(&self) -> &AssetId {
        self.mapping.silence_asset()
    }

    /// 资源 ID → 可定位 URI
    pub fn uri(&self, asset: &AssetId) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = asset.as_str().trim_start_matches('/');
        if base.is_empty() {
            path.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn mapping(&self) -> &AssetMapping {
        &self.mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(base_url: &str) -> AssetIndex {
        let mapping = AssetMapping::new("default_response.mp3", "silence.mp3")
            .with_text("こんにちは", "hello.mp3")
            .with_category("stub", ["", "こんにちは"], None)
            .with_category(
                "greeting",
                ["こんにちは", "おはよう"],
                Some(AssetId::from("greeting_generic.mp3")),
            )
            .with_category(
                "morning",
                ["おはよう"],
                Some(AssetId::from("morning.mp3")),
            );
        AssetIndex::new(mapping, base_url)
    }

    #[test]
    fn test_exact_lookup_is_verbatim() {
        let index = index("");
        assert_eq!(index.exact("こんにちは").unwrap().as_str(), "hello.mp3");
        assert!(index.exact("こんにちは！").is_none());
    }

    #[test]
    fn test_first_category_with_default_wins() {
        let index = index("");
        let (category, asset) = index.category_match("おはようございます").unwrap();
        assert_eq!(category.as_str(), "greeting");
        assert_eq!(asset.as_str(), "greeting_generic.mp3");
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        let mapping = AssetMapping::new("d.mp3", "s.mp3").with_category(
            "blank",
            [""],
            Some(AssetId::from("blank.mp3")),
        );
        let index = AssetIndex::new(mapping, "");
        assert!(index.category_match("anything").is_none());
    }

    #[test]
    fn test_uri_join() {
        assert_eq!(index("").uri(&AssetId::from("hello.mp3")), "hello.mp3");
        assert_eq!(
            index("/audio/conversation/").uri(&AssetId::from("/hello.mp3")),
            "/audio/conversation/hello.mp3"
        );
    }
}
