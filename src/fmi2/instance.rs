//! 模型实例
//!
//! 每个入口点对应一个类型化操作。所有操作先经过生命周期检查，不合法的调用
//! 不会发到模型里；原生返回的状态码再反馈给状态机。

use std::ptr;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::binding::ModelBinding;
use super::functions::require;
use super::lifecycle::{Lifecycle, LifecycleState, Operation};
use super::logger::{LogContext, lossy};
use super::marshal::{CStringArray, check_same_len, from_bool, mut_ptr_or_null, ptr_or_null, to_bool};
use super::state::ModelState;
use super::types::*;
use crate::error::{FmuError, Result};

pub struct ModelInstance {
    binding: Arc<ModelBinding>,
    component: fmi2Component,
    name: String,
    lifecycle: Lifecycle,
    // 模型可能保存这两个指针，必须与实例同生命周期
    _callbacks: Box<fmi2CallbackFunctions>,
    _context: Box<LogContext>,
}

// 实例只通过 &mut self 使用，可以整体移交给另一个线程，但不能共享
unsafe impl Send for ModelInstance {}

impl ModelInstance {
    pub(crate) fn new(
        binding: Arc<ModelBinding>,
        component: fmi2Component,
        name: &str,
        callbacks: Box<fmi2CallbackFunctions>,
        context: Box<LogContext>,
    ) -> ModelInstance {
        let lifecycle = Lifecycle::new(binding.fmu_type());
        ModelInstance {
            binding,
            component,
            name: name.to_string(),
            lifecycle,
            _callbacks: callbacks,
            _context: context,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    pub fn fmu_type(&self) -> FmuType {
        self.lifecycle.fmu_type()
    }

    pub fn binding(&self) -> &Arc<ModelBinding> {
        &self.binding
    }

    /// 显式释放（等价于 drop）
    pub fn free(self) {
        drop(self)
    }

    /// 处理原生返回值：推进状态机，OK/Warning 之外的状态都是错误
    fn finish(&mut self, op: Operation, name: &'static str, raw: fmi2Status) -> Result<Status> {
        let status = Status::from_raw(raw);
        let before = self.lifecycle.state();
        self.lifecycle.record(op, status);
        let after = self.lifecycle.state();
        if before != after {
            debug!(instance = %self.name, operation = name, ?before, ?after, "生命周期状态变化");
        }
        match status {
            Status::Ok => Ok(status),
            Status::Warning => {
                warn!(instance = %self.name, operation = name, "模型返回 Warning");
                Ok(status)
            }
            _ => Err(FmuError::NativeStatus {
                operation: name,
                status,
            }),
        }
    }

    // ---------------------------------------------------------------------
    // 通用生命周期
    // ---------------------------------------------------------------------

    /// `fmi2SetDebugLogging`；categories 为空表示全部类别
    pub fn set_debug_logging<S: AsRef<str>>(
        &mut self,
        logging_on: bool,
        categories: &[S],
    ) -> Result<()> {
        const OP: &str = "fmi2SetDebugLogging";
        self.lifecycle.check(Operation::SetDebugLogging)?;
        let f = require(self.binding.functions().set_debug_logging, OP)?;
        let categories = CStringArray::new(OP, categories)?;
        let raw = unsafe {
            f(
                self.component,
                to_bool(logging_on),
                categories.len(),
                categories.as_ptr(),
            )
        };
        self.finish(Operation::SetDebugLogging, OP, raw)?;
        Ok(())
    }

    /// `fmi2SetupExperiment`
    pub fn setup_experiment(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> Result<()> {
        const OP: &str = "fmi2SetupExperiment";
        self.lifecycle.check(Operation::SetupExperiment)?;
        let f = require(self.binding.functions().setup_experiment, OP)?;
        let raw = unsafe {
            f(
                self.component,
                to_bool(tolerance.is_some()),
                tolerance.unwrap_or(0.0),
                start_time,
                to_bool(stop_time.is_some()),
                stop_time.unwrap_or(0.0),
            )
        };
        self.finish(Operation::SetupExperiment, OP, raw)?;
        Ok(())
    }

    fn component_call(
        &mut self,
        op: Operation,
        name: &'static str,
        entry: Option<super::functions::ComponentFn>,
    ) -> Result<()> {
        self.lifecycle.check(op)?;
        let f = require(entry, name)?;
        let raw = unsafe { f(self.component) };
        self.finish(op, name, raw)?;
        Ok(())
    }

    pub fn enter_initialization_mode(&mut self) -> Result<()> {
        let entry = self.binding.functions().enter_initialization_mode;
        self.component_call(
            Operation::EnterInitializationMode,
            "fmi2EnterInitializationMode",
            entry,
        )
    }

    pub fn exit_initialization_mode(&mut self) -> Result<()> {
        let entry = self.binding.functions().exit_initialization_mode;
        self.component_call(
            Operation::ExitInitializationMode,
            "fmi2ExitInitializationMode",
            entry,
        )
    }

    pub fn terminate(&mut self) -> Result<()> {
        let entry = self.binding.functions().terminate;
        self.component_call(Operation::Terminate, "fmi2Terminate", entry)
    }

    /// 回到刚实例化的状态
    pub fn reset(&mut self) -> Result<()> {
        let entry = self.binding.functions().reset;
        self.component_call(Operation::Reset, "fmi2Reset", entry)
    }

    // ---------------------------------------------------------------------
    // 变量读写
    // ---------------------------------------------------------------------

    pub fn get_real(&mut self, vrs: &[ValueReference]) -> Result<Vec<f64>> {
        const OP: &str = "fmi2GetReal";
        self.lifecycle.check(Operation::GetValues)?;
        let f = require(self.binding.functions().get_real, OP)?;
        if vrs.is_empty() {
            return Ok(Vec::new());
        }
        let mut values = vec![0.0; vrs.len()];
        let raw = unsafe { f(self.component, vrs.as_ptr(), vrs.len(), values.as_mut_ptr()) };
        self.finish(Operation::GetValues, OP, raw)?;
        Ok(values)
    }

    pub fn get_integer(&mut self, vrs: &[ValueReference]) -> Result<Vec<i32>> {
        const OP: &str = "fmi2GetInteger";
        self.lifecycle.check(Operation::GetValues)?;
        let f = require(self.binding.functions().get_integer, OP)?;
        if vrs.is_empty() {
            return Ok(Vec::new());
        }
        let mut values: Vec<fmi2Integer> = vec![0; vrs.len()];
        let raw = unsafe { f(self.component, vrs.as_ptr(), vrs.len(), values.as_mut_ptr()) };
        self.finish(Operation::GetValues, OP, raw)?;
        Ok(values)
    }

    pub fn get_boolean(&mut self, vrs: &[ValueReference]) -> Result<Vec<bool>> {
        const OP: &str = "fmi2GetBoolean";
        self.lifecycle.check(Operation::GetValues)?;
        let f = require(self.binding.functions().get_boolean, OP)?;
        if vrs.is_empty() {
            return Ok(Vec::new());
        }
        let mut values: Vec<fmi2Boolean> = vec![fmi2False; vrs.len()];
        let raw = unsafe { f(self.component, vrs.as_ptr(), vrs.len(), values.as_mut_ptr()) };
        self.finish(Operation::GetValues, OP, raw)?;
        Ok(values.into_iter().map(from_bool).collect())
    }

    /// 模型返回的字符串在本调用内复制出来
    pub fn get_string(&mut self, vrs: &[ValueReference]) -> Result<Vec<String>> {
        const OP: &str = "fmi2GetString";
        self.lifecycle.check(Operation::GetValues)?;
        let f = require(self.binding.functions().get_string, OP)?;
        if vrs.is_empty() {
            return Ok(Vec::new());
        }
        let mut values: Vec<fmi2String> = vec![ptr::null(); vrs.len()];
        let raw = unsafe { f(self.component, vrs.as_ptr(), vrs.len(), values.as_mut_ptr()) };
        self.finish(Operation::GetValues, OP, raw)?;
        Ok(values.into_iter().map(|p| unsafe { lossy(p) }).collect())
    }

    pub fn set_real(&mut self, vrs: &[ValueReference], values: &[f64]) -> Result<()> {
        const OP: &str = "fmi2SetReal";
        self.lifecycle.check(Operation::SetValues)?;
        let f = require(self.binding.functions().set_real, OP)?;
        check_same_len(OP, vrs.len(), values.len())?;
        if vrs.is_empty() {
            return Ok(());
        }
        let raw = unsafe { f(self.component, vrs.as_ptr(), vrs.len(), values.as_ptr()) };
        self.finish(Operation::SetValues, OP, raw)?;
        Ok(())
    }

    pub fn set_integer(&mut self, vrs: &[ValueReference], values: &[i32]) -> Result<()> {
        const OP: &str = "fmi2SetInteger";
        self.lifecycle.check(Operation::SetValues)?;
        let f = require(self.binding.functions().set_integer, OP)?;
        check_same_len(OP, vrs.len(), values.len())?;
        if vrs.is_empty() {
            return Ok(());
        }
        let raw = unsafe { f(self.component, vrs.as_ptr(), vrs.len(), values.as_ptr()) };
        self.finish(Operation::SetValues, OP, raw)?;
        Ok(())
    }

    pub fn set_boolean(&mut self, vrs: &[ValueReference], values: &[bool]) -> Result<()> {
        const OP: &str = "fmi2SetBoolean";
        self.lifecycle.check(Operation::SetValues)?;
        let f = require(self.binding.functions().set_boolean, OP)?;
        check_same_len(OP, vrs.len(), values.len())?;
        if vrs.is_empty() {
            return Ok(());
        }
        let packed: Vec<fmi2Boolean> = values.iter().copied().map(to_bool).collect();
        let raw = unsafe { f(self.component, vrs.as_ptr(), vrs.len(), packed.as_ptr()) };
        self.finish(Operation::SetValues, OP, raw)?;
        Ok(())
    }

    pub fn set_string<S: AsRef<str>>(&mut self, vrs: &[ValueReference], values: &[S]) -> Result<()> {
        const OP: &str = "fmi2SetString";
        self.lifecycle.check(Operation::SetValues)?;
        let f = require(self.binding.functions().set_string, OP)?;
        check_same_len(OP, vrs.len(), values.len())?;
        if vrs.is_empty() {
            return Ok(());
        }
        let strings = CStringArray::new(OP, values)?;
        let raw = unsafe { f(self.component, vrs.as_ptr(), vrs.len(), strings.as_ptr()) };
        self.finish(Operation::SetValues, OP, raw)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // 状态快照
    // ---------------------------------------------------------------------

    /// `fmi2GetFMUstate`：得到的快照必须交还给 [`free_state`](Self::free_state)
    pub fn get_state(&mut self) -> Result<ModelState> {
        const OP: &str = "fmi2GetFMUstate";
        self.lifecycle.check(Operation::GetState)?;
        let f = require(self.binding.functions().get_fmu_state, OP)?;
        let mut raw: fmi2FMUstate = ptr::null_mut();
        let status = unsafe { f(self.component, &mut raw) };
        let captured_in = self.lifecycle.state();
        self.finish(Operation::GetState, OP, status)?;
        Ok(ModelState::new(raw, Some(captured_in)))
    }

    /// `fmi2SetFMUstate`：实例进入快照捕获时的状态
    pub fn set_state(&mut self, state: &ModelState) -> Result<()> {
        const OP: &str = "fmi2SetFMUstate";
        self.lifecycle.check(Operation::SetState)?;
        let f = require(self.binding.functions().set_fmu_state, OP)?;
        if state.is_empty() {
            return Err(FmuError::InvalidArgument {
                operation: OP,
                detail: "state capsule is empty".to_string(),
            });
        }
        let raw = unsafe { f(self.component, state.raw) };
        self.finish(Operation::SetState, OP, raw)?;

        let resumed = state
            .captured_in()
            .unwrap_or_else(|| self.lifecycle.stepping_state());
        self.lifecycle.restore(resumed);
        debug!(instance = %self.name, ?resumed, "已恢复状态快照");
        Ok(())
    }

    /// `fmi2FreeFMUstate`；空快照直接返回
    pub fn free_state(&mut self, mut state: ModelState) -> Result<()> {
        const OP: &str = "fmi2FreeFMUstate";
        if state.is_empty() {
            return Ok(());
        }
        self.lifecycle.check(Operation::FreeState)?;
        let f = require(self.binding.functions().free_fmu_state, OP)?;
        let mut raw = state.take();
        let status = unsafe { f(self.component, &mut raw) };
        self.finish(Operation::FreeState, OP, status)?;
        Ok(())
    }

    /// `fmi2SerializedFMUstateSize` + `fmi2SerializeFMUstate`
    pub fn serialize_state(&mut self, state: &ModelState) -> Result<Vec<u8>> {
        const SIZE_OP: &str = "fmi2SerializedFMUstateSize";
        const OP: &str = "fmi2SerializeFMUstate";
        self.lifecycle.check(Operation::SerializeState)?;
        let size_fn = require(self.binding.functions().serialized_fmu_state_size, SIZE_OP)?;
        let f = require(self.binding.functions().serialize_fmu_state, OP)?;
        if state.is_empty() {
            return Err(FmuError::InvalidArgument {
                operation: OP,
                detail: "state capsule is empty".to_string(),
            });
        }

        let mut size = 0usize;
        let raw = unsafe { size_fn(self.component, state.raw, &mut size) };
        self.finish(Operation::SerializeState, SIZE_OP, raw)?;

        let mut bytes = vec![0u8; size];
        let raw = unsafe {
            f(
                self.component,
                state.raw,
                mut_ptr_or_null(&mut bytes) as *mut fmi2Byte,
                size,
            )
        };
        self.finish(Operation::SerializeState, OP, raw)?;
        trace!(instance = %self.name, size, "状态快照已序列化");
        Ok(bytes)
    }

    /// `fmi2DeSerializeFMUstate`：得到的快照恢复后进入步进（或事件）模式
    pub fn deserialize_state(&mut self, bytes: &[u8]) -> Result<ModelState> {
        const OP: &str = "fmi2DeSerializeFMUstate";
        self.lifecycle.check(Operation::SerializeState)?;
        let f = require(self.binding.functions().de_serialize_fmu_state, OP)?;
        let mut raw: fmi2FMUstate = ptr::null_mut();
        let status = unsafe {
            f(
                self.component,
                ptr_or_null(bytes) as *const fmi2Byte,
                bytes.len(),
                &mut raw,
            )
        };
        self.finish(Operation::SerializeState, OP, status)?;
        Ok(ModelState::new(raw, None))
    }

    /// `fmi2GetDirectionalDerivative`
    pub fn get_directional_derivative(
        &mut self,
        unknowns: &[ValueReference],
        knowns: &[ValueReference],
        seed: &[f64],
    ) -> Result<Vec<f64>> {
        const OP: &str = "fmi2GetDirectionalDerivative";
        self.lifecycle.check(Operation::GetDirectionalDerivative)?;
        let f = require(self.binding.functions().get_directional_derivative, OP)?;
        check_same_len(OP, knowns.len(), seed.len())?;
        if unknowns.is_empty() {
            return Ok(Vec::new());
        }
        let mut sensitivity = vec![0.0; unknowns.len()];
        let raw = unsafe {
            f(
                self.component,
                unknowns.as_ptr(),
                unknowns.len(),
                ptr_or_null(knowns),
                knowns.len(),
                ptr_or_null(seed),
                sensitivity.as_mut_ptr(),
            )
        };
        self.finish(Operation::GetDirectionalDerivative, OP, raw)?;
        Ok(sensitivity)
    }

    // ---------------------------------------------------------------------
    // Model Exchange
    // ---------------------------------------------------------------------

    pub fn enter_event_mode(&mut self) -> Result<()> {
        let entry = self.binding.functions().enter_event_mode;
        self.component_call(Operation::EnterEventMode, "fmi2EnterEventMode", entry)
    }

    pub fn new_discrete_states(&mut self) -> Result<EventInfo> {
        const OP: &str = "fmi2NewDiscreteStates";
        self.lifecycle.check(Operation::NewDiscreteStates)?;
        let f = require(self.binding.functions().new_discrete_states, OP)?;
        let mut info = fmi2EventInfo::default();
        let raw = unsafe { f(self.component, &mut info) };
        self.finish(Operation::NewDiscreteStates, OP, raw)?;
        Ok(EventInfo::from(info))
    }

    pub fn enter_continuous_time_mode(&mut self) -> Result<()> {
        let entry = self.binding.functions().enter_continuous_time_mode;
        self.component_call(
            Operation::EnterContinuousTimeMode,
            "fmi2EnterContinuousTimeMode",
            entry,
        )
    }

    /// 返回 (enterEventMode, terminateSimulation)
    pub fn completed_integrator_step(&mut self, no_set_fmu_state_prior: bool) -> Result<(bool, bool)> {
        const OP: &str = "fmi2CompletedIntegratorStep";
        self.lifecycle.check(Operation::CompletedIntegratorStep)?;
        let f = require(self.binding.functions().completed_integrator_step, OP)?;
        let mut enter_event_mode = fmi2False;
        let mut terminate_simulation = fmi2False;
        let raw = unsafe {
            f(
                self.component,
                to_bool(no_set_fmu_state_prior),
                &mut enter_event_mode,
                &mut terminate_simulation,
            )
        };
        self.finish(Operation::CompletedIntegratorStep, OP, raw)?;
        Ok((from_bool(enter_event_mode), from_bool(terminate_simulation)))
    }

    pub fn set_time(&mut self, time: f64) -> Result<()> {
        const OP: &str = "fmi2SetTime";
        self.lifecycle.check(Operation::SetTime)?;
        let f = require(self.binding.functions().set_time, OP)?;
        let raw = unsafe { f(self.component, time) };
        self.finish(Operation::SetTime, OP, raw)?;
        Ok(())
    }

    pub fn set_continuous_states(&mut self, states: &[f64]) -> Result<()> {
        const OP: &str = "fmi2SetContinuousStates";
        self.lifecycle.check(Operation::SetContinuousStates)?;
        let f = require(self.binding.functions().set_continuous_states, OP)?;
        if states.is_empty() {
            return Ok(());
        }
        let raw = unsafe { f(self.component, states.as_ptr(), states.len()) };
        self.finish(Operation::SetContinuousStates, OP, raw)?;
        Ok(())
    }

    fn real_vector(
        &mut self,
        name: &'static str,
        entry: Option<super::functions::RealVectorFn>,
        n: usize,
    ) -> Result<Vec<f64>> {
        self.lifecycle.check(Operation::GetContinuousStateValues)?;
        let f = require(entry, name)?;
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut values = vec![0.0; n];
        let raw = unsafe { f(self.component, values.as_mut_ptr(), n) };
        self.finish(Operation::GetContinuousStateValues, name, raw)?;
        Ok(values)
    }

    pub fn get_derivatives(&mut self, n: usize) -> Result<Vec<f64>> {
        let entry = self.binding.functions().get_derivatives;
        self.real_vector("fmi2GetDerivatives", entry, n)
    }

    pub fn get_event_indicators(&mut self, n: usize) -> Result<Vec<f64>> {
        let entry = self.binding.functions().get_event_indicators;
        self.real_vector("fmi2GetEventIndicators", entry, n)
    }

    pub fn get_continuous_states(&mut self, n: usize) -> Result<Vec<f64>> {
        let entry = self.binding.functions().get_continuous_states;
        self.real_vector("fmi2GetContinuousStates", entry, n)
    }

    pub fn get_nominals_of_continuous_states(&mut self, n: usize) -> Result<Vec<f64>> {
        let entry = self.binding.functions().get_nominals_of_continuous_states;
        self.real_vector("fmi2GetNominalsOfContinuousStates", entry, n)
    }

    // ---------------------------------------------------------------------
    // Co-Simulation
    // ---------------------------------------------------------------------

    pub fn set_real_input_derivatives(
        &mut self,
        vrs: &[ValueReference],
        orders: &[i32],
        values: &[f64],
    ) -> Result<()> {
        const OP: &str = "fmi2SetRealInputDerivatives";
        self.lifecycle.check(Operation::SetRealInputDerivatives)?;
        let f = require(self.binding.functions().set_real_input_derivatives, OP)?;
        check_same_len(OP, vrs.len(), orders.len())?;
        check_same_len(OP, vrs.len(), values.len())?;
        if vrs.is_empty() {
            return Ok(());
        }
        let raw = unsafe {
            f(
                self.component,
                vrs.as_ptr(),
                vrs.len(),
                orders.as_ptr(),
                values.as_ptr(),
            )
        };
        self.finish(Operation::SetRealInputDerivatives, OP, raw)?;
        Ok(())
    }

    pub fn get_real_output_derivatives(
        &mut self,
        vrs: &[ValueReference],
        orders: &[i32],
    ) -> Result<Vec<f64>> {
        const OP: &str = "fmi2GetRealOutputDerivatives";
        self.lifecycle.check(Operation::GetRealOutputDerivatives)?;
        let f = require(self.binding.functions().get_real_output_derivatives, OP)?;
        check_same_len(OP, vrs.len(), orders.len())?;
        if vrs.is_empty() {
            return Ok(Vec::new());
        }
        let mut values = vec![0.0; vrs.len()];
        let raw = unsafe {
            f(
                self.component,
                vrs.as_ptr(),
                vrs.len(),
                orders.as_ptr(),
                values.as_mut_ptr(),
            )
        };
        self.finish(Operation::GetRealOutputDerivatives, OP, raw)?;
        Ok(values)
    }

    /// `fmi2DoStep`：Discard 和 Pending 作为结果返回，不是错误
    pub fn do_step(
        &mut self,
        current_communication_point: f64,
        communication_step_size: f64,
        no_set_fmu_state_prior: bool,
    ) -> Result<StepOutcome> {
        const OP: &str = "fmi2DoStep";
        self.lifecycle.check(Operation::DoStep)?;
        let f = require(self.binding.functions().do_step, OP)?;
        let raw = unsafe {
            f(
                self.component,
                current_communication_point,
                communication_step_size,
                to_bool(no_set_fmu_state_prior),
            )
        };
        let status = Status::from_raw(raw);
        self.lifecycle.record(Operation::DoStep, status);
        trace!(
            t = current_communication_point,
            h = communication_step_size,
            ?status,
            "DoStep"
        );
        step_outcome(status)
    }

    pub fn cancel_step(&mut self) -> Result<()> {
        let entry = self.binding.functions().cancel_step;
        self.component_call(Operation::CancelStep, "fmi2CancelStep", entry)
    }

    /// `fmi2GetStatus`
    pub fn get_status(&mut self, kind: StatusKind) -> Result<Status> {
        const OP: &str = "fmi2GetStatus";
        self.lifecycle.check(Operation::GetStatus)?;
        let f = require(self.binding.functions().get_status, OP)?;
        let mut value: fmi2Status = Status::Ok.to_raw();
        let raw = unsafe { f(self.component, kind.to_raw(), &mut value) };
        self.finish(Operation::GetStatus, OP, raw)?;
        Ok(Status::from_raw(value))
    }

    pub fn get_real_status(&mut self, kind: StatusKind) -> Result<f64> {
        const OP: &str = "fmi2GetRealStatus";
        self.lifecycle.check(Operation::GetStatus)?;
        let f = require(self.binding.functions().get_real_status, OP)?;
        let mut value = 0.0;
        let raw = unsafe { f(self.component, kind.to_raw(), &mut value) };
        self.finish(Operation::GetStatus, OP, raw)?;
        Ok(value)
    }

    pub fn get_integer_status(&mut self, kind: StatusKind) -> Result<i32> {
        const OP: &str = "fmi2GetIntegerStatus";
        self.lifecycle.check(Operation::GetStatus)?;
        let f = require(self.binding.functions().get_integer_status, OP)?;
        let mut value: fmi2Integer = 0;
        let raw = unsafe { f(self.component, kind.to_raw(), &mut value) };
        self.finish(Operation::GetStatus, OP, raw)?;
        Ok(value)
    }

    pub fn get_boolean_status(&mut self, kind: StatusKind) -> Result<bool> {
        const OP: &str = "fmi2GetBooleanStatus";
        self.lifecycle.check(Operation::GetStatus)?;
        let f = require(self.binding.functions().get_boolean_status, OP)?;
        let mut value = fmi2False;
        let raw = unsafe { f(self.component, kind.to_raw(), &mut value) };
        self.finish(Operation::GetStatus, OP, raw)?;
        Ok(from_bool(value))
    }

    pub fn get_string_status(&mut self, kind: StatusKind) -> Result<String> {
        const OP: &str = "fmi2GetStringStatus";
        self.lifecycle.check(Operation::GetStatus)?;
        let f = require(self.binding.functions().get_string_status, OP)?;
        let mut value: fmi2String = ptr::null();
        let raw = unsafe { f(self.component, kind.to_raw(), &mut value) };
        self.finish(Operation::GetStatus, OP, raw)?;
        Ok(unsafe { lossy(value) })
    }

    /// 查询一次挂起中的 DoStep；结果与直接调用 DoStep 的返回一样解释
    pub fn poll_pending_step(&mut self) -> Result<StepOutcome> {
        let status = self.get_status(StatusKind::DoStepStatus)?;
        self.lifecycle.finish_pending(status);
        step_outcome(status)
    }
}

fn step_outcome(status: Status) -> Result<StepOutcome> {
    match status {
        Status::Ok => Ok(StepOutcome::Completed),
        Status::Warning => {
            warn!("DoStep 返回 Warning");
            Ok(StepOutcome::Completed)
        }
        Status::Discard => Ok(StepOutcome::Discarded),
        Status::Pending => Ok(StepOutcome::Pending),
        Status::Error | Status::Fatal => Err(FmuError::NativeStatus {
            operation: "fmi2DoStep",
            status,
        }),
    }
}

impl Drop for ModelInstance {
    fn drop(&mut self) {
        if let Some(f) = self.binding.functions().free_instance {
            unsafe { f(self.component) };
            debug!(instance = %self.name, state = ?self.lifecycle.state(), "实例已释放");
        }
    }
}

impl std::fmt::Debug for ModelInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInstance")
            .field("name", &self.name)
            .field("state", &self.lifecycle.state())
            .finish_non_exhaustive()
    }
}
