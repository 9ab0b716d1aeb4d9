//! 入口点表
//!
//! 每个 FMI 2.0 入口点对应一个 `Option<函数指针>` 字段，加载时一次性解析。
//! 缺失的入口点记为 `None`，只有在调用对应操作（或接口类型要求它）时才报错。

use std::os::raw::c_void;

use libloading::Library;
use tracing::{debug, trace};

use super::types::*;
use crate::error::{FmuError, Result};

pub type GetTypesPlatformFn = unsafe extern "C" fn() -> fmi2String;
pub type GetVersionFn = unsafe extern "C" fn() -> fmi2String;
pub type SetDebugLoggingFn =
    unsafe extern "C" fn(fmi2Component, fmi2Boolean, usize, *const fmi2String) -> fmi2Status;
pub type InstantiateFn = unsafe extern "C" fn(
    fmi2String,
    fmi2Type,
    fmi2String,
    fmi2String,
    *const fmi2CallbackFunctions,
    fmi2Boolean,
    fmi2Boolean,
) -> fmi2Component;
pub type FreeInstanceFn = unsafe extern "C" fn(fmi2Component);
pub type SetupExperimentFn = unsafe extern "C" fn(
    fmi2Component,
    fmi2Boolean,
    fmi2Real,
    fmi2Real,
    fmi2Boolean,
    fmi2Real,
) -> fmi2Status;
pub type ComponentFn = unsafe extern "C" fn(fmi2Component) -> fmi2Status;
pub type GetRealFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *mut fmi2Real,
) -> fmi2Status;
pub type GetIntegerFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *mut fmi2Integer,
) -> fmi2Status;
pub type GetBooleanFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *mut fmi2Boolean,
) -> fmi2Status;
pub type GetStringFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *mut fmi2String,
) -> fmi2Status;
pub type SetRealFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *const fmi2Real,
) -> fmi2Status;
pub type SetIntegerFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *const fmi2Integer,
) -> fmi2Status;
pub type SetBooleanFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *const fmi2Boolean,
) -> fmi2Status;
pub type SetStringFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *const fmi2String,
) -> fmi2Status;
pub type GetFmuStateFn = unsafe extern "C" fn(fmi2Component, *mut fmi2FMUstate) -> fmi2Status;
pub type SetFmuStateFn = unsafe extern "C" fn(fmi2Component, fmi2FMUstate) -> fmi2Status;
pub type FreeFmuStateFn = unsafe extern "C" fn(fmi2Component, *mut fmi2FMUstate) -> fmi2Status;
pub type SerializedFmuStateSizeFn =
    unsafe extern "C" fn(fmi2Component, fmi2FMUstate, *mut usize) -> fmi2Status;
pub type SerializeFmuStateFn =
    unsafe extern "C" fn(fmi2Component, fmi2FMUstate, *mut fmi2Byte, usize) -> fmi2Status;
pub type DeSerializeFmuStateFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2Byte,
    usize,
    *mut fmi2FMUstate,
) -> fmi2Status;
pub type GetDirectionalDerivativeFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *const fmi2ValueReference,
    usize,
    *const fmi2Real,
    *mut fmi2Real,
) -> fmi2Status;
pub type NewDiscreteStatesFn =
    unsafe extern "C" fn(fmi2Component, *mut fmi2EventInfo) -> fmi2Status;
pub type CompletedIntegratorStepFn = unsafe extern "C" fn(
    fmi2Component,
    fmi2Boolean,
    *mut fmi2Boolean,
    *mut fmi2Boolean,
) -> fmi2Status;
pub type SetTimeFn = unsafe extern "C" fn(fmi2Component, fmi2Real) -> fmi2Status;
pub type SetContinuousStatesFn =
    unsafe extern "C" fn(fmi2Component, *const fmi2Real, usize) -> fmi2Status;
pub type RealVectorFn = unsafe extern "C" fn(fmi2Component, *mut fmi2Real, usize) -> fmi2Status;
pub type SetRealInputDerivativesFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *const fmi2Integer,
    *const fmi2Real,
) -> fmi2Status;
pub type GetRealOutputDerivativesFn = unsafe extern "C" fn(
    fmi2Component,
    *const fmi2ValueReference,
    usize,
    *const fmi2Integer,
    *mut fmi2Real,
) -> fmi2Status;
pub type DoStepFn = unsafe extern "C" fn(fmi2Component, fmi2Real, fmi2Real, fmi2Boolean) -> fmi2Status;
pub type GetStatusFn =
    unsafe extern "C" fn(fmi2Component, fmi2StatusKind, *mut fmi2Status) -> fmi2Status;
pub type GetRealStatusFn =
    unsafe extern "C" fn(fmi2Component, fmi2StatusKind, *mut fmi2Real) -> fmi2Status;
pub type GetIntegerStatusFn =
    unsafe extern "C" fn(fmi2Component, fmi2StatusKind, *mut fmi2Integer) -> fmi2Status;
pub type GetBooleanStatusFn =
    unsafe extern "C" fn(fmi2Component, fmi2StatusKind, *mut fmi2Boolean) -> fmi2Status;
pub type GetStringStatusFn =
    unsafe extern "C" fn(fmi2Component, fmi2StatusKind, *mut fmi2String) -> fmi2Status;

/// 入口点分组，决定某个接口类型加载时必须解析到哪些符号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryGroup {
    Common,
    ModelExchange,
    CoSimulation,
    /// 由能力标志决定（FMU 状态、序列化、方向导数）
    Optional,
}

macro_rules! entry_points {
    ($($field:ident: $ty:ty = $symbol:literal, $group:ident;)*) => {
        /// 解析后的入口点表
        #[derive(Clone, Copy, Default)]
        pub struct Fmi2Functions {
            $(pub $field: Option<$ty>,)*
        }

        impl Fmi2Functions {
            /// 所有入口点：（符号名，分组）
            pub const ENTRY_POINTS: &'static [(&'static str, EntryGroup)] = &[
                $(($symbol, EntryGroup::$group),)*
            ];

            /// 从已加载的库里解析全部入口点；找不到的记为 None。
            pub fn resolve(library: &Library) -> Fmi2Functions {
                Fmi2Functions {
                    $($field: resolve_symbol::<$ty>(library, $symbol),)*
                }
            }

            /// 某个符号是否已解析
            pub fn is_resolved(&self, symbol: &str) -> bool {
                match symbol {
                    $($symbol => self.$field.is_some(),)*
                    _ => false,
                }
            }
        }
    };
}

entry_points! {
    get_types_platform: GetTypesPlatformFn = "fmi2GetTypesPlatform", Common;
    get_version: GetVersionFn = "fmi2GetVersion", Common;
    set_debug_logging: SetDebugLoggingFn = "fmi2SetDebugLogging", Common;
    instantiate: InstantiateFn = "fmi2Instantiate", Common;
    free_instance: FreeInstanceFn = "fmi2FreeInstance", Common;
    setup_experiment: SetupExperimentFn = "fmi2SetupExperiment", Common;
    enter_initialization_mode: ComponentFn = "fmi2EnterInitializationMode", Common;
    exit_initialization_mode: ComponentFn = "fmi2ExitInitializationMode", Common;
    terminate: ComponentFn = "fmi2Terminate", Common;
    reset: ComponentFn = "fmi2Reset", Common;
    get_real: GetRealFn = "fmi2GetReal", Common;
    get_integer: GetIntegerFn = "fmi2GetInteger", Common;
    get_boolean: GetBooleanFn = "fmi2GetBoolean", Common;
    get_string: GetStringFn = "fmi2GetString", Common;
    set_real: SetRealFn = "fmi2SetReal", Common;
    set_integer: SetIntegerFn = "fmi2SetInteger", Common;
    set_boolean: SetBooleanFn = "fmi2SetBoolean", Common;
    set_string: SetStringFn = "fmi2SetString", Common;
    get_fmu_state: GetFmuStateFn = "fmi2GetFMUstate", Optional;
    set_fmu_state: SetFmuStateFn = "fmi2SetFMUstate", Optional;
    free_fmu_state: FreeFmuStateFn = "fmi2FreeFMUstate", Optional;
    serialized_fmu_state_size: SerializedFmuStateSizeFn = "fmi2SerializedFMUstateSize", Optional;
    serialize_fmu_state: SerializeFmuStateFn = "fmi2SerializeFMUstate", Optional;
    de_serialize_fmu_state: DeSerializeFmuStateFn = "fmi2DeSerializeFMUstate", Optional;
    get_directional_derivative: GetDirectionalDerivativeFn = "fmi2GetDirectionalDerivative", Optional;
    enter_event_mode: ComponentFn = "fmi2EnterEventMode", ModelExchange;
    new_discrete_states: NewDiscreteStatesFn = "fmi2NewDiscreteStates", ModelExchange;
    enter_continuous_time_mode: ComponentFn = "fmi2EnterContinuousTimeMode", ModelExchange;
    completed_integrator_step: CompletedIntegratorStepFn = "fmi2CompletedIntegratorStep", ModelExchange;
    set_time: SetTimeFn = "fmi2SetTime", ModelExchange;
    set_continuous_states: SetContinuousStatesFn = "fmi2SetContinuousStates", ModelExchange;
    get_derivatives: RealVectorFn = "fmi2GetDerivatives", ModelExchange;
    get_event_indicators: RealVectorFn = "fmi2GetEventIndicators", ModelExchange;
    get_continuous_states: RealVectorFn = "fmi2GetContinuousStates", ModelExchange;
    get_nominals_of_continuous_states: RealVectorFn = "fmi2GetNominalsOfContinuousStates", ModelExchange;
    set_real_input_derivatives: SetRealInputDerivativesFn = "fmi2SetRealInputDerivatives", CoSimulation;
    get_real_output_derivatives: GetRealOutputDerivativesFn = "fmi2GetRealOutputDerivatives", CoSimulation;
    do_step: DoStepFn = "fmi2DoStep", CoSimulation;
    cancel_step: ComponentFn = "fmi2CancelStep", CoSimulation;
    get_status: GetStatusFn = "fmi2GetStatus", CoSimulation;
    get_real_status: GetRealStatusFn = "fmi2GetRealStatus", CoSimulation;
    get_integer_status: GetIntegerStatusFn = "fmi2GetIntegerStatus", CoSimulation;
    get_boolean_status: GetBooleanStatusFn = "fmi2GetBooleanStatus", CoSimulation;
    get_string_status: GetStringStatusFn = "fmi2GetStringStatus", CoSimulation;
}

impl Fmi2Functions {
    /// 检查接口类型要求的入口点是否全部解析成功；第一个缺失的入口点作为错误返回。
    pub fn check_required(&self, fmu_type: FmuType) -> Result<()> {
        let mode_group = match fmu_type {
            FmuType::ModelExchange => EntryGroup::ModelExchange,
            FmuType::CoSimulation => EntryGroup::CoSimulation,
        };

        let mut resolved = 0usize;
        for (symbol, group) in Self::ENTRY_POINTS {
            let required = *group == EntryGroup::Common || *group == mode_group;
            if self.is_resolved(symbol) {
                resolved += 1;
            } else if required {
                return Err(FmuError::MissingEntryPoint { name: symbol });
            } else {
                trace!(symbol, "可选入口点未提供");
            }
        }

        debug!(
            resolved,
            total = Self::ENTRY_POINTS.len(),
            ?fmu_type,
            "入口点解析完成"
        );
        Ok(())
    }
}

/// 取出一个入口点，缺失时返回 CapabilityError
pub(crate) fn require<T: Copy>(entry: Option<T>, name: &'static str) -> Result<T> {
    entry.ok_or(FmuError::MissingEntryPoint { name })
}

fn resolve_symbol<T: Copy>(library: &Library, symbol: &str) -> Option<T> {
    // T 总是上面声明的 extern "C" 函数指针类型
    debug_assert_eq!(std::mem::size_of::<T>(), std::mem::size_of::<*mut c_void>());
    unsafe {
        library
            .get::<T>(symbol.as_bytes())
            .ok()
            .map(|sym| *sym)
    }
}
