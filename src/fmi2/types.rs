//! FMI 2.0 基础类型
//!
//! 与 `fmi2TypesPlatform.h` / `fmi2FunctionTypes.h` 对齐的 C 类型，以及它们在
//! Rust 侧的强类型表示。

#![allow(non_camel_case_types, non_upper_case_globals)]

use std::os::raw::{c_char, c_int, c_uint, c_void};

pub type fmi2Component = *mut c_void;
pub type fmi2ComponentEnvironment = *mut c_void;
pub type fmi2FMUstate = *mut c_void;
pub type fmi2ValueReference = c_uint;
pub type fmi2Real = f64;
pub type fmi2Integer = c_int;
pub type fmi2Boolean = c_int;
pub type fmi2Char = c_char;
pub type fmi2String = *const fmi2Char;
pub type fmi2Byte = c_char;
pub type fmi2Status = c_int;
pub type fmi2Type = c_int;
pub type fmi2StatusKind = c_int;

pub const fmi2True: fmi2Boolean = 1;
pub const fmi2False: fmi2Boolean = 0;

/// 变量句柄（模型作者分配，模型生命周期内稳定）
pub type ValueReference = u32;

/// `fmi2CallbackLogger`：C 侧是变参函数
pub type fmi2CallbackLogger = unsafe extern "C" fn(
    fmi2ComponentEnvironment,
    fmi2String,
    fmi2Status,
    fmi2String,
    fmi2String,
    ...
);
pub type fmi2CallbackAllocateMemory = unsafe extern "C" fn(usize, usize) -> *mut c_void;
pub type fmi2CallbackFreeMemory = unsafe extern "C" fn(*mut c_void);
pub type fmi2StepFinished = unsafe extern "C" fn(fmi2ComponentEnvironment, fmi2Status);

#[repr(C)]
pub struct fmi2CallbackFunctions {
    pub logger: Option<fmi2CallbackLogger>,
    pub allocate_memory: Option<fmi2CallbackAllocateMemory>,
    pub free_memory: Option<fmi2CallbackFreeMemory>,
    pub step_finished: Option<fmi2StepFinished>,
    pub component_environment: fmi2ComponentEnvironment,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub struct fmi2EventInfo {
    pub new_discrete_states_needed: fmi2Boolean,
    pub terminate_simulation: fmi2Boolean,
    pub nominals_of_continuous_states_changed: fmi2Boolean,
    pub values_of_continuous_states_changed: fmi2Boolean,
    pub next_event_time_defined: fmi2Boolean,
    pub next_event_time: fmi2Real,
}

/// 原生调用的返回状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Status {
    Ok,
    Warning,
    Discard,
    Error,
    Fatal,
    Pending,
}

impl Status {
    /// 模型返回了表外的值时按 Fatal 处理
    pub fn from_raw(raw: fmi2Status) -> Status {
        match raw {
            0 => Status::Ok,
            1 => Status::Warning,
            2 => Status::Discard,
            3 => Status::Error,
            5 => Status::Pending,
            _ => Status::Fatal,
        }
    }

    pub fn to_raw(self) -> fmi2Status {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Discard => 2,
            Status::Error => 3,
            Status::Fatal => 4,
            Status::Pending => 5,
        }
    }

    /// OK / Warning
    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Warning)
    }
}

/// 实例化时的接口类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FmuType {
    ModelExchange,
    CoSimulation,
}

impl FmuType {
    pub fn to_raw(self) -> fmi2Type {
        match self {
            FmuType::ModelExchange => 0,
            FmuType::CoSimulation => 1,
        }
    }
}

/// `fmi2Get*Status` 查询的状态种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    DoStepStatus,
    PendingStatus,
    LastSuccessfulTime,
    Terminated,
}

impl StatusKind {
    pub fn to_raw(self) -> fmi2StatusKind {
        match self {
            StatusKind::DoStepStatus => 0,
            StatusKind::PendingStatus => 1,
            StatusKind::LastSuccessfulTime => 2,
            StatusKind::Terminated => 3,
        }
    }
}

/// 离散状态更新后的事件信息
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EventInfo {
    pub new_discrete_states_needed: bool,
    pub terminate_simulation: bool,
    pub nominals_of_continuous_states_changed: bool,
    pub values_of_continuous_states_changed: bool,
    pub next_event_time: Option<f64>,
}

impl From<fmi2EventInfo> for EventInfo {
    fn from(raw: fmi2EventInfo) -> Self {
        EventInfo {
            new_discrete_states_needed: raw.new_discrete_states_needed != fmi2False,
            terminate_simulation: raw.terminate_simulation != fmi2False,
            nominals_of_continuous_states_changed: raw.nominals_of_continuous_states_changed
                != fmi2False,
            values_of_continuous_states_changed: raw.values_of_continuous_states_changed
                != fmi2False,
            next_event_time: (raw.next_event_time_defined != fmi2False)
                .then_some(raw.next_event_time),
        }
    }
}

/// `fmi2DoStep` 的结果（Discard / Pending 不是错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Completed,
    Discarded,
    Pending,
}
