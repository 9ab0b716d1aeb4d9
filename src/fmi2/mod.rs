//! FMI 2.0 动态绑定层
//!
//! 加载模型二进制、解析入口点、编组参数，并用显式的生命周期状态机约束调用顺序。

mod binding;
mod functions;
mod instance;
mod lifecycle;
mod logger;
mod marshal;
mod state;
mod types;

pub use binding::ModelBinding;
pub use functions::{EntryGroup, Fmi2Functions};
pub use instance::ModelInstance;
pub use lifecycle::{Lifecycle, LifecycleState, Operation};
pub use logger::{LogRecord, LogSink, NoopSink, TracingSink};
pub use state::{ModelState, StateGuard};
pub use types::{EventInfo, FmuType, Status, StatusKind, StepOutcome, ValueReference};

/// 原生 C 类型与函数指针类型（编写进程内模型时使用）
pub mod ffi {
    pub use super::functions::*;
    pub use super::types::*;
}
