use async_trait::async_trait;

use crate::adapter::module::BackendModule;
use crate::adapter::{AdapterStatus, InvocationAdapter, InvocationError};

/// Adapter backed by a module that exports `query`
/// 由导出 `query` 的模块支持的适配器
pub struct ConnectedAdapter {
    module: BackendModule,
}

impl ConnectedAdapter {
    pub fn new(module: BackendModule) -> Self {
        Self { module }
    }
}

#[async_trait]
impl InvocationAdapter for ConnectedAdapter {
    fn status(&self) -> AdapterStatus {
        AdapterStatus {
            module_loaded: true,
            has_query_function: self.module.has_query(),
            available_attributes: self.module.attributes(),
        }
    }

    async fn query(&self, prompt: &str) -> Result<Option<String>, InvocationError> {
        if !self.module.has_query() {
            return Err(InvocationError::Unavailable);
        }
        self.module
            .query(prompt)
            .await
            .map_err(|e| InvocationError::Failed(e.to_string()))
    }
}
