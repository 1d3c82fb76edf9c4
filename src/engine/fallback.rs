// ==========================================
// 工程项目挣值管理系统 - 有序兜底链
// ==========================================
// 职责: "先 X，否则 Y，否则 Z" 的统一表达
// 规则: 按注册顺序依次尝试，返回第一个非空结果
//       单个来源出错只记录告警并继续下一个来源
// ==========================================

use crate::engine::error::EngineResult;

type Resolver<'a, T> = Box<dyn Fn() -> EngineResult<Option<T>> + 'a>;

/// 命中的来源与取值
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub source: &'static str,
    pub value: T,
}

pub struct FallbackChain<'a, T> {
    name: &'static str,
    resolvers: Vec<(&'static str, Resolver<'a, T>)>,
}

impl<'a, T> FallbackChain<'a, T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            resolvers: Vec::new(),
        }
    }

    /// 追加一个来源（优先级低于已注册的来源）
    pub fn then<F>(mut self, source: &'static str, resolver: F) -> Self
    where
        F: Fn() -> EngineResult<Option<T>> + 'a,
    {
        self.resolvers.push((source, Box::new(resolver)));
        self
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// 依次尝试，返回第一个命中的来源
    pub fn resolve(&self) -> Option<Resolved<T>> {
        for (source, resolver) in &self.resolvers {
            match resolver() {
                Ok(Some(value)) => {
                    tracing::debug!(chain = self.name, source = *source, "兜底链命中");
                    return Some(Resolved {
                        source: *source,
                        value,
                    });
                }
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(chain = self.name, source = *source, error = %e, "兜底来源读取失败，跳过");
                }
            }
        }
        tracing::debug!(chain = self.name, "兜底链全部未命中");
        None
    }

    /// 依次尝试，全部未命中时返回 default
    pub fn resolve_or(&self, default: T) -> T {
        self.resolve().map(|r| r.value).unwrap_or(default)
    }
}
