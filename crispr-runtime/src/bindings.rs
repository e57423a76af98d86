//! # Bindings 模块
//!
//! 多空间、按作用域栈组织的符号表。
//!
//! ## 设计原则
//!
//! - 每个绑定由 `(space, identifier)` 唯一标识，不同空间互不干扰
//! - 查找从最内层作用域向外逐层进行，内层绑定遮蔽外层同名绑定
//! - 同一作用域内不可覆盖不可变绑定
//! - 补全期使用独立的缓存副本（[`BindingsManager::snapshot`]），
//!   与解释期的实时绑定互不影响

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;

use crate::module::ModuleInstance;
use crate::value::Value;

/// 绑定空间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingsSpace {
    /// 脚本变量
    User,
    /// 已加载模块
    Module,
    /// 模块别名（别名 → 模块名，以及反向 `模块名 → 别名`）
    Alias,
    /// 地址相关的已解析信息
    Addr,
    /// 地址 → 合约接口缓存
    Abi,
    /// 模块级配置，如 `token.tokenlist`
    Config,
}

impl fmt::Display for BindingsSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "USER",
            Self::Module => "MODULE",
            Self::Alias => "ALIAS",
            Self::Addr => "ADDR",
            Self::Abi => "ABI",
            Self::Config => "CONFIG",
        };
        f.write_str(name)
    }
}

/// 绑定值
#[derive(Debug, Clone)]
pub enum BindingValue {
    Value(Value),
    Module(ModuleInstance),
    Text(String),
    Abi(serde_json::Value),
}

impl From<Value> for BindingValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<ModuleInstance> for BindingValue {
    fn from(module: ModuleInstance) -> Self {
        Self::Module(module)
    }
}

impl From<String> for BindingValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for BindingValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<serde_json::Value> for BindingValue {
    fn from(abi: serde_json::Value) -> Self {
        Self::Abi(abi)
    }
}

/// 单个绑定
#[derive(Debug, Clone)]
pub struct Binding {
    pub space: BindingsSpace,
    pub identifier: String,
    pub value: BindingValue,
    pub mutable: bool,
    pub metadata: Option<String>,
    /// 是否出现在补全列表中
    pub user_visible: bool,
}

impl Binding {
    /// 创建不可变、可见的绑定
    pub fn new(space: BindingsSpace, identifier: impl Into<String>, value: impl Into<BindingValue>) -> Self {
        Self {
            space,
            identifier: identifier.into(),
            value: value.into(),
            mutable: false,
            metadata: None,
            user_visible: true,
        }
    }

    pub fn mutable(mut self) -> Self {
        self.mutable = true;
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.user_visible = false;
        self
    }
}

/// 绑定错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    #[error("cannot overwrite immutable binding '{identifier}' in {space} space")]
    Immutable {
        space: BindingsSpace,
        identifier: String,
    },

    #[error("cannot exit the root scope")]
    RootScope,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    name: String,
    spaces: IndexMap<BindingsSpace, IndexMap<String, Binding>>,
}

impl Scope {
    fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spaces: IndexMap::new(),
        }
    }

    fn get(&self, space: BindingsSpace, identifier: &str) -> Option<&Binding> {
        self.spaces.get(&space).and_then(|s| s.get(identifier))
    }
}

/// 作用域栈符号表
#[derive(Debug, Clone)]
pub struct BindingsManager {
    scopes: Vec<Scope>,
}

impl BindingsManager {
    pub const ROOT_SCOPE: &'static str = "root";

    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::named(Self::ROOT_SCOPE)],
        }
    }

    /// 复制当前全部作用域，得到互不影响的缓存副本
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    pub fn enter_scope(&mut self, name: impl Into<String>) {
        self.scopes.push(Scope::named(name));
    }

    /// 弹出最内层作用域，根作用域不可弹出
    pub fn exit_scope(&mut self) -> Result<(), BindingError> {
        if self.scopes.len() <= 1 {
            return Err(BindingError::RootScope);
        }
        self.scopes.pop();
        Ok(())
    }

    /// 弹出作用域直到深度不超过 `depth`，根作用域始终保留
    pub fn unwind_to(&mut self, depth: usize) {
        self.scopes.truncate(depth.max(1));
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn current_scope_name(&self) -> &str {
        self.scopes
            .last()
            .map(|s| s.name.as_str())
            .unwrap_or(Self::ROOT_SCOPE)
    }

    /// 写入最内层作用域
    ///
    /// 同一作用域内已存在同名不可变绑定时失败。
    pub fn set_binding(&mut self, binding: Binding) -> Result<(), BindingError> {
        let scope = self.scopes.last_mut().ok_or(BindingError::RootScope)?;
        let space = scope.spaces.entry(binding.space).or_default();
        if let Some(existing) = space.get(&binding.identifier) {
            if !existing.mutable {
                return Err(BindingError::Immutable {
                    space: binding.space,
                    identifier: binding.identifier,
                });
            }
        }
        space.insert(binding.identifier.clone(), binding);
        Ok(())
    }

    /// 便捷方法：写入 USER 空间
    pub fn set_user(&mut self, identifier: impl Into<String>, value: Value, mutable: bool) -> Result<(), BindingError> {
        let binding = Binding::new(BindingsSpace::User, identifier, value);
        self.set_binding(if mutable { binding.mutable() } else { binding })
    }

    pub fn get_binding(&self, identifier: &str, space: BindingsSpace) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(space, identifier))
    }

    pub fn get_binding_value(&self, identifier: &str, space: BindingsSpace) -> Option<&BindingValue> {
        self.get_binding(identifier, space).map(|b| &b.value)
    }

    pub fn has_binding(&self, identifier: &str, space: BindingsSpace) -> bool {
        self.get_binding(identifier, space).is_some()
    }

    /// 查找值类型的绑定（USER、CONFIG、ADDR 等）
    pub fn get_value(&self, identifier: &str, space: BindingsSpace) -> Option<&Value> {
        match self.get_binding_value(identifier, space)? {
            BindingValue::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn get_text(&self, identifier: &str, space: BindingsSpace) -> Option<&str> {
        match self.get_binding_value(identifier, space)? {
            BindingValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn get_module(&self, name: &str) -> Option<&ModuleInstance> {
        match self.get_binding_value(name, BindingsSpace::Module)? {
            BindingValue::Module(m) => Some(m),
            _ => None,
        }
    }

    /// 所有可见的已加载模块，按加载顺序
    pub fn loaded_modules(&self) -> Vec<&ModuleInstance> {
        self.get_all_bindings(&[BindingsSpace::Module])
            .into_iter()
            .filter_map(|b| match &b.value {
                BindingValue::Module(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    /// 按空间过滤的全部绑定（内层遮蔽外层，按首次出现顺序）
    ///
    /// `space_filters` 为空表示所有空间。
    pub fn get_all_bindings(&self, space_filters: &[BindingsSpace]) -> Vec<&Binding> {
        let mut merged: IndexMap<(BindingsSpace, &str), &Binding> = IndexMap::new();
        for scope in &self.scopes {
            for (space, bindings) in &scope.spaces {
                if !space_filters.is_empty() && !space_filters.contains(space) {
                    continue;
                }
                for (identifier, binding) in bindings {
                    merged.insert((*space, identifier.as_str()), binding);
                }
            }
        }
        merged.into_values().collect()
    }

    /// 补全用：可见绑定的标识符（去重）
    pub fn get_all_binding_identifiers(&self, space_filters: &[BindingsSpace]) -> Vec<String> {
        let mut seen = HashSet::new();
        self.get_all_bindings(space_filters)
            .into_iter()
            .filter(|b| b.user_visible)
            .filter(|b| seen.insert(b.identifier.clone()))
            .map(|b| b.identifier.clone())
            .collect()
    }
}

impl Default for BindingsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::num::Num;

    fn num(n: i64) -> Value {
        Value::Number(Num::from_int(n))
    }

    #[test]
    fn test_set_and_get() {
        let mut bm = BindingsManager::new();
        bm.set_user("a", num(1), true).unwrap();
        assert_eq!(bm.get_value("a", BindingsSpace::User), Some(&num(1)));
        assert!(bm.get_value("a", BindingsSpace::Config).is_none());
    }

    #[test]
    fn test_immutable_binding_cannot_be_overwritten_in_same_scope() {
        let mut bm = BindingsManager::new();
        bm.set_user("a", num(1), false).unwrap();
        let err = bm.set_user("a", num(2), true).unwrap_err();
        assert!(matches!(err, BindingError::Immutable { ref identifier, .. } if identifier == "a"));

        // 其他空间的同名绑定互不影响
        bm.set_binding(Binding::new(BindingsSpace::Config, "a", num(3)))
            .unwrap();
    }

    #[test]
    fn test_mutable_binding_can_be_overwritten() {
        let mut bm = BindingsManager::new();
        bm.set_user("a", num(1), true).unwrap();
        bm.set_user("a", num(2), true).unwrap();
        assert_eq!(bm.get_value("a", BindingsSpace::User), Some(&num(2)));
    }

    #[test]
    fn test_inner_scope_shadows_and_disappears() {
        let mut bm = BindingsManager::new();
        bm.set_user("a", num(1), false).unwrap();

        bm.enter_scope("block");
        assert_eq!(bm.current_scope_name(), "block");
        // 外层变量可见
        assert_eq!(bm.get_value("a", BindingsSpace::User), Some(&num(1)));
        // 内层可遮蔽外层的不可变绑定
        bm.set_user("a", num(2), false).unwrap();
        bm.set_user("b", num(3), false).unwrap();
        assert_eq!(bm.get_value("a", BindingsSpace::User), Some(&num(2)));
        bm.exit_scope().unwrap();

        assert_eq!(bm.get_value("a", BindingsSpace::User), Some(&num(1)));
        assert!(!bm.has_binding("b", BindingsSpace::User));
    }

    #[test]
    fn test_root_scope_cannot_be_exited() {
        let mut bm = BindingsManager::new();
        assert_eq!(bm.exit_scope(), Err(BindingError::RootScope));
        assert_eq!(bm.scope_depth(), 1);
    }

    #[test]
    fn test_unwind_to_keeps_root() {
        let mut bm = BindingsManager::new();
        bm.set_user("a", num(1), true).unwrap();
        bm.enter_scope("one");
        bm.enter_scope("two");
        bm.set_user("b", num(2), true).unwrap();

        bm.unwind_to(2);
        assert_eq!(bm.scope_depth(), 2);
        assert_eq!(bm.current_scope_name(), "one");
        assert!(bm.get_value("b", BindingsSpace::User).is_none());

        bm.unwind_to(0);
        assert_eq!(bm.scope_depth(), 1);
        assert_eq!(bm.get_value("a", BindingsSpace::User), Some(&num(1)));
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut live = BindingsManager::new();
        live.set_user("a", num(1), true).unwrap();

        let mut cache = live.snapshot();
        cache.set_user("b", num(2), true).unwrap();
        cache.set_user("a", num(9), true).unwrap();

        assert!(!live.has_binding("b", BindingsSpace::User));
        assert_eq!(live.get_value("a", BindingsSpace::User), Some(&num(1)));
        assert_eq!(cache.get_value("a", BindingsSpace::User), Some(&num(9)));
    }

    #[test]
    fn test_identifiers_respect_filters_and_visibility() {
        let mut bm = BindingsManager::new();
        bm.set_user("x", num(1), true).unwrap();
        bm.set_binding(Binding::new(BindingsSpace::User, "secret", num(2)).hidden())
            .unwrap();
        bm.set_binding(Binding::new(BindingsSpace::Alias, "ar", "aragonos"))
            .unwrap();
        bm.enter_scope("inner");
        bm.set_user("y", num(3), true).unwrap();
        bm.set_user("x", num(4), true).unwrap();

        assert_eq!(
            bm.get_all_binding_identifiers(&[BindingsSpace::User]),
            vec!["x".to_string(), "y".to_string()]
        );
        assert_eq!(bm.get_all_binding_identifiers(&[]).len(), 3);
        assert_eq!(bm.get_text("ar", BindingsSpace::Alias), Some("aragonos"));
    }
}
