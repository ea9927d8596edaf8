//! Synthesis Adapter - 远程语音合成客户端实现

mod fake_synthesis_client;
mod http_synthesis_client;

pub use fake_synthesis_client::{FakeSynthesisBehavior, FakeSynthesisClient};
pub use http_synthesis_client::*;
