//! 错误类型
//!
//! 整个 crate 共用一个错误枚举，按照失败发生的阶段归类：
//! 加载、能力、校验、生命周期、原生状态码。

use std::path::PathBuf;

use crate::fmi2::{LifecycleState, Status};

/// 错误类别（用于上层决定是否可以换一个实例重试）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 归档不可读、平台不支持、二进制无法映射
    Load,
    /// 入口点缺失或模型未声明所需能力
    Capability,
    /// 描述文档版本不支持、选项组合非法、参数不合法
    Validation,
    /// 当前生命周期状态下不允许的调用（未发出原生调用）
    Lifecycle,
    /// 原生调用返回 Discard / Error / Fatal
    NativeStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum FmuError {
    #[error("unsupported platform {platform} (available: {})", available.join(", "))]
    UnsupportedPlatform {
        platform: String,
        available: Vec<String>,
    },

    #[error("model binary not found: {}", path.display())]
    BinaryNotFound { path: PathBuf },

    #[error("failed to load model binary {}: {source}", path.display())]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("entry point {name} is not provided by the model binary")]
    MissingEntryPoint { name: &'static str },

    #[error("model does not declare capability: {0}")]
    MissingCapability(String),

    #[error("unsupported FMI version: {0}")]
    UnsupportedVersion(String),

    #[error("invalid simulation options: {0}")]
    InvalidOptions(String),

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("{operation}: {detail}")]
    InvalidArgument {
        operation: &'static str,
        detail: String,
    },

    #[error("invalid description document: {0}")]
    Description(#[from] serde_json::Error),

    #[error("{operation} is not allowed in state {state:?}")]
    IllegalCall {
        operation: &'static str,
        state: LifecycleState,
    },

    #[error("{operation} returned {status:?}")]
    NativeStatus {
        operation: &'static str,
        status: Status,
    },

    #[error("instantiation of {instance_name} failed")]
    InstantiationFailed { instance_name: String },
}

impl FmuError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FmuError::UnsupportedPlatform { .. }
            | FmuError::BinaryNotFound { .. }
            | FmuError::LibraryLoad { .. }
            | FmuError::Read { .. } => ErrorKind::Load,
            FmuError::MissingEntryPoint { .. } | FmuError::MissingCapability(_) => {
                ErrorKind::Capability
            }
            FmuError::UnsupportedVersion(_)
            | FmuError::InvalidOptions(_)
            | FmuError::UnknownVariable(_)
            | FmuError::InvalidArgument { .. }
            | FmuError::Description(_) => ErrorKind::Validation,
            FmuError::IllegalCall { .. } => ErrorKind::Lifecycle,
            FmuError::NativeStatus { .. } | FmuError::InstantiationFailed { .. } => {
                ErrorKind::NativeStatus
            }
        }
    }

    /// 对应的原生状态码（仅 NativeStatus 错误有）
    pub fn status(&self) -> Option<Status> {
        match self {
            FmuError::NativeStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, FmuError>;
