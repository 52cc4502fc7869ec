//! 注入目标上下文
//!
//! 记录当前正在注入的绑定链，用于检测递归注入。

use injection_common::InjectionError;

/// 注入目标上下文
#[derive(Debug, Clone, Default)]
pub struct InjectionTargetContext {
    /// 正在注入的绑定链
    chain: Vec<(u64, String)>,
}

impl InjectionTargetContext {
    /// 创建新的注入上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入一个绑定
    ///
    /// 绑定已在链中时返回未记录日志的递归注入错误。
    pub fn enter(&mut self, binding_id: u64, reference: &str) -> Result<(), InjectionError> {
        if self.chain.iter().any(|(id, _)| *id == binding_id) {
            let mut chain = self.chain_names();
            chain.push(reference.to_string());
            return Err(InjectionError::RecursiveInjection {
                reference: reference.to_string(),
                chain,
                logged: false,
            });
        }
        self.chain.push((binding_id, reference.to_string()));
        Ok(())
    }

    /// 离开最近进入的绑定
    pub fn leave(&mut self) {
        self.chain.pop();
    }

    /// 当前注入深度
    pub fn depth(&self) -> usize {
        self.chain.len()
    }

    /// 注入链中的引用名称
    pub fn chain_names(&self) -> Vec<String> {
        self.chain.iter().map(|(_, name)| name.clone()).collect()
    }
}
