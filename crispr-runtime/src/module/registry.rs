//! # 模块注册表
//!
//! 模块名 → 构造函数。注册表在构造解释器时显式传入，没有全局可变状态；
//! 模块在 `load` 命令执行时才被构造。

use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::FrameworkError;
use crate::module::ModuleDescriptor;
use crate::module::stdlib::{self, STD_MODULE};

/// 模块构造函数
pub type ModuleFactory = fn() -> ModuleDescriptor;

/// 模块注册表
///
/// 标准模块总是存在。
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    factories: IndexMap<String, ModuleFactory>,
    std: Arc<ModuleDescriptor>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        let mut factories: IndexMap<String, ModuleFactory> = IndexMap::new();
        factories.insert(STD_MODULE.to_string(), stdlib::descriptor);
        Self {
            factories,
            std: Arc::new(stdlib::descriptor()),
        }
    }

    /// 注册模块；同名模块会被替换（`std` 除外）
    pub fn register(&mut self, name: impl Into<String>, factory: ModuleFactory) -> Result<(), FrameworkError> {
        let name = name.into();
        if name == STD_MODULE {
            return Err(FrameworkError::Invalid(format!(
                "module name {STD_MODULE} is reserved"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// 构建器风格的注册
    pub fn with_module(mut self, name: impl Into<String>, factory: ModuleFactory) -> Result<Self, FrameworkError> {
        self.register(name, factory)?;
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// 按注册顺序的模块名
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// 构造模块
    pub fn load(&self, name: &str) -> Result<Arc<ModuleDescriptor>, FrameworkError> {
        if name == STD_MODULE {
            return Ok(self.std.clone());
        }
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| FrameworkError::NotFound(format!("module {name} not found")))?;
        Ok(Arc::new(factory()))
    }

    /// 标准模块（无需 `load` 即可使用）
    pub fn std_module(&self) -> Arc<ModuleDescriptor> {
        self.std.clone()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_module() -> ModuleDescriptor {
        ModuleDescriptor::new("empty")
    }

    #[test]
    fn test_std_always_registered() {
        let registry = ModuleRegistry::new();
        assert!(registry.contains(STD_MODULE));
        assert_eq!(registry.load(STD_MODULE).unwrap().name(), STD_MODULE);
        assert!(registry.std_module().command("set").is_some());
    }

    #[test]
    fn test_register_and_load() {
        let registry = ModuleRegistry::new().with_module("empty", empty_module).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![STD_MODULE, "empty"]);
        assert_eq!(registry.load("empty").unwrap().name(), "empty");
        assert!(matches!(
            registry.load("missing"),
            Err(FrameworkError::NotFound(_))
        ));
    }

    #[test]
    fn test_std_name_is_reserved() {
        let mut registry = ModuleRegistry::new();
        assert!(registry.register(STD_MODULE, empty_module).is_err());
    }
}
