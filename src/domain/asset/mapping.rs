//! Asset Context - 资源映射
//!
//! 映射文档格式（JSON）:
//! ```json
//! {
//!   "mappings": {
//!     "texts": { "こんにちは": "hello.mp3" },
//!     "categories": { "greeting": ["こんにちは", "おはよう"] },
//!     "default": { "greeting": "greeting_generic.mp3" }
//!   },
//!   "fallback": { "defaultFile": "default_response.mp3", "silenceFile": "silence.mp3" }
//! }
//! ```
//!
//! `categories` 的书写顺序即分类匹配的优先顺序。

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::{AssetId, Category, MappingError};

#[derive(Debug, Deserialize)]
struct MappingDocument {
    mappings: MappingTables,
    fallback: FallbackSection,
}

#[derive(Debug, Default, Deserialize)]
struct MappingTables {
    #[serde(default)]
    texts: HashMap<String, String>,
    /// 保留书写顺序（serde_json preserve_order）
    #[serde(default)]
    categories: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    default: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FallbackSection {
    default_file: String,
    silence_file: String,
}

/// 资源映射
///
/// 不变量:
/// - `category_default` 的键是 `category_keywords` 键的子集
/// - 所有资源路径非空
/// - 加载后不可变
#[derive(Debug, Clone)]
pub struct AssetMapping {
    exact_text: HashMap<String, AssetId>,
    category_keywords: Vec<(Category, Vec<String>)>,
    category_default: HashMap<Category, AssetId>,
    fallback_default: AssetId,
    silence_asset: AssetId,
}

impl AssetMapping {
    /// 创建只含兜底资源的空映射
    pub fn new(fallback_default: impl Into<AssetId>, silence_asset: impl Into<AssetId>) -> Self {
        Self {
            exact_text: HashMap::new(),
            category_keywords: Vec::new(),
            category_default: HashMap::new(),
            fallback_default: fallback_default.into(),
            silence_asset: silence_asset.into(),
        }
    }

    /// 添加精确文本映射
    pub fn with_text(mut self, text: impl Into<String>, asset: impl Into<AssetId>) -> Self {
        self.exact_text.insert(text.into(), asset.into());
        self
    }

    /// 追加分类（追加顺序即匹配优先级）
    pub fn with_category<I, S>(
        mut self,
        category: impl Into<Category>,
        keywords: I,
        default: Option<AssetId>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let category = category.into();
        let keywords = keywords.into_iter().map(Into::into).collect();
        if let Some(asset) = default {
            self.category_default.insert(category.clone(), asset);
        }
        match self
            .category_keywords
            .iter_mut()
            .find(|(existing, _)| *existing == category)
        {
            Some((_, existing)) => *existing = keywords,
            None => self.category_keywords.push((category, keywords)),
        }
        self
    }

    /// 从 JSON 文本解析
    pub fn from_json(json: &str) -> Result<Self, MappingError> {
        let document: MappingDocument =
            serde_json::from_str(json).map_err(|e| MappingError::Parse(e.to_string()))?;

        let mut category_keywords = Vec::with_capacity(document.mappings.categories.len());
        for (name, value) in document.mappings.categories {
            let keywords: Vec<String> = serde_json::from_value(value).map_err(|e| {
                MappingError::Parse(format!("category '{}' keywords: {}", name, e))
            })?;
            category_keywords.push((Category::new(name), keywords));
        }

        let mapping = Self {
            exact_text: document
                .mappings
                .texts
                .into_iter()
                .map(|(text, file)| (text, AssetId::new(file)))
                .collect(),
            category_keywords,
            category_default: document
                .mappings
                .default
                .into_iter()
                .map(|(name, file)| (Category::new(name), AssetId::new(file)))
                .collect(),
            fallback_default: AssetId::new(document.fallback.default_file),
            silence_asset: AssetId::new(document.fallback.silence_file),
        };

        mapping.validate()?;
        Ok(mapping)
    }

    /// 从文件加载
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| MappingError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let mapping = Self::from_json(&json)?;

        tracing::info!(
            path = %path.display(),
            texts = mapping.exact_text.len(),
            categories = mapping.category_keywords.len(),
            "Asset mapping loaded"
        );
        Ok(mapping)
    }

    /// 校验不变量
    pub fn validate(&self) -> Result<(), MappingError> {
        for category in self.category_default.keys() {
            if !self.category_keywords.iter().any(|(c, _)| c == category) {
                return Err(MappingError::OrphanCategoryDefault(category.to_string()));
            }
        }

        if self.fallback_default.as_str().is_empty() {
            return Err(MappingError::EmptyAsset("fallback default".to_string()));
        }
        if self.silence_asset.as_str().is_empty() {
            return Err(MappingError::EmptyAsset("silence".to_string()));
        }
        for (text, asset) in &self.exact_text {
            if asset.as_str().is_empty() {
                return Err(MappingError::EmptyAsset(format!("text '{}'", text)));
            }
        }
        for (category, asset) in &self.category_default {
            if asset.as_str().is_empty() {
                return Err(MappingError::EmptyAsset(format!("category '{}'", category)));
            }
        }

        Ok(())
    }

    // Getters
    pub fn exact_text(&self, text: &str) -> Option<&AssetId> {
        self.exact_text.get(text)
    }

    pub fn category_keywords(&self) -> &[(Category, Vec<String>)] {
        &self.category_keywords
    }

    pub fn category_default(&self, category: &Category) -> Option<&AssetId> {
        self.category_default.get(category)
    }

    pub fn fallback_default(&self) -> &AssetId {
        &self.fallback_default
    }

    pub fn silence_asset(&self) -> &AssetId {
        &self.silence_asset
    }
}
