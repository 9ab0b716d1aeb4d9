//! 模型日志回调
//!
//! 模型通过 `fmi2CallbackLogger` 上报日志。这里不使用进程级的全局回调，
//! 而是在加载时把 [`LogSink`] 注入 binding，默认丢弃所有消息。

use std::ffi::CStr;
use std::os::raw::c_void;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::types::*;

/// 一条模型日志
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord<'a> {
    pub instance_name: &'a str,
    pub status: Status,
    pub category: &'a str,
    /// printf 格式串原文。变参从不读取，sink 不能再按格式串展开它
    pub message: &'a str,
}

/// 模型日志的接收端
pub trait LogSink: Send + Sync {
    fn log(&self, record: &LogRecord<'_>);
}

/// 丢弃所有消息
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl LogSink for NoopSink {
    fn log(&self, _record: &LogRecord<'_>) {}
}

/// 转发到 `tracing`，级别按状态码映射
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, r: &LogRecord<'_>) {
        match r.status {
            Status::Ok | Status::Pending => {
                info!(instance = r.instance_name, category = r.category, "{}", r.message)
            }
            Status::Warning | Status::Discard => {
                warn!(instance = r.instance_name, category = r.category, "{}", r.message)
            }
            Status::Error | Status::Fatal => {
                error!(instance = r.instance_name, category = r.category, "{}", r.message)
            }
        }
    }
}

/// 作为 `componentEnvironment` 传给模型的上下文，由实例持有（Box 地址稳定）
pub(crate) struct LogContext {
    pub(crate) sink: Arc<dyn LogSink>,
}

/// 非变参实现；只读取固定参数，按变参指针类型交给模型
unsafe extern "C" fn log_message(
    env: fmi2ComponentEnvironment,
    instance_name: fmi2String,
    status: fmi2Status,
    category: fmi2String,
    message: fmi2String,
) {
    if env.is_null() {
        debug!("模型日志缺少 componentEnvironment，已忽略");
        return;
    }
    // env 指向实例持有的 LogContext
    let ctx = unsafe { &*(env as *const LogContext) };
    let instance_name = unsafe { lossy(instance_name) };
    let category = unsafe { lossy(category) };
    let message = unsafe { lossy(message) };

    ctx.sink.log(&LogRecord {
        instance_name: &instance_name,
        status: Status::from_raw(status),
        category: &category,
        message: &message,
    });
}

pub(crate) fn logger_callback() -> fmi2CallbackLogger {
    let f: unsafe extern "C" fn(
        fmi2ComponentEnvironment,
        fmi2String,
        fmi2Status,
        fmi2String,
        fmi2String,
    ) = log_message;
    // 调用方按变参约定传参；固定参数的寄存器/栈位置与非变参一致
    unsafe { std::mem::transmute(f) }
}

unsafe extern "C" {
    fn calloc(nobj: usize, size: usize) -> *mut c_void;
    fn free(ptr: *mut c_void);
}

pub(crate) fn allocate_memory_callback() -> fmi2CallbackAllocateMemory {
    calloc
}

pub(crate) fn free_memory_callback() -> fmi2CallbackFreeMemory {
    free
}

/// 模型给出的 C 字符串 -> 自有 String（空指针为空串）
pub(crate) unsafe fn lossy(ptr: fmi2String) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
