//! Asset Context - 本地音频资源限界上下文
//!
//! 职责:
//! - 资源映射文档的解析与校验
//! - 文本 / 分类关键词 → 资源 ID 的查找（纯数据，无 I/O）

mod errors;
mod index;
mod mapping;
mod value_objects;

pub use errors::MappingError;
pub use index::AssetIndex;
pub use mapping::AssetMapping;
pub use value_objects::{AssetId, Category};
