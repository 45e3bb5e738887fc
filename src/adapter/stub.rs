use async_trait::async_trait;

use crate::adapter::{AdapterStatus, InvocationAdapter, InvocationError};

/// Stand-in used when no usable backend module is present
/// 没有可用后端模块时使用的替代适配器
pub struct StubAdapter {
    module_loaded: bool,
    attributes: Vec<String>,
}

impl StubAdapter {
    /// The module failed to load / 模块加载失败
    pub fn not_loaded() -> Self {
        Self {
            module_loaded: false,
            attributes: Vec::new(),
        }
    }

    /// The module loaded but does not export `query`
    /// 模块已加载但未导出 `query`
    pub fn without_query(attributes: Vec<String>) -> Self {
        Self {
            module_loaded: true,
            attributes,
        }
    }
}

#[async_trait]
impl InvocationAdapter for StubAdapter {
    fn status(&self) -> AdapterStatus {
        AdapterStatus {
            module_loaded: self.module_loaded,
            has_query_function: false,
            available_attributes: self.attributes.clone(),
        }
    }

    async fn query(&self, _prompt: &str) -> Result<Option<String>, InvocationError> {
        Err(InvocationError::Unavailable)
    }
}
