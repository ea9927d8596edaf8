//! Audio Context - Errors

use thiserror::Error;

/// 解析错误
///
/// 资源不可用、合成失败都在解析器内部降级处理，唯一对外暴露的是前置条件违反。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Utterance text is empty")]
    EmptyText,
}
