//! 实例生命周期状态机
//!
//! 原生接口只靠约定保证调用顺序。这里把状态显式化：每个实例操作在发出原生
//! 调用前先查表，非法顺序直接返回 `IllegalCall`，不会落到模型里。

use super::types::{FmuType, Status};
use crate::error::{FmuError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum LifecycleState {
    /// 刚实例化（或 Reset 之后）
    Instantiated,
    /// SetupExperiment 已调用
    ExperimentSetUp,
    InitializationMode,
    /// Model Exchange：事件模式
    EventMode,
    /// Model Exchange：连续时间模式
    ContinuousTimeMode,
    /// Co-Simulation：可以 DoStep
    StepMode,
    /// DoStep 返回了 Pending，异步计算进行中
    StepPending,
    /// CancelStep 之后
    StepCanceled,
    Terminated,
    /// 某次调用返回 Error
    Failed,
    /// 某次调用返回 Fatal，只能释放
    Broken,
}

/// 受状态机约束的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SetDebugLogging,
    SetupExperiment,
    EnterInitializationMode,
    ExitInitializationMode,
    Terminate,
    Reset,
    GetValues,
    SetValues,
    GetState,
    SetState,
    FreeState,
    SerializeState,
    GetDirectionalDerivative,
    // Model Exchange
    EnterEventMode,
    NewDiscreteStates,
    EnterContinuousTimeMode,
    CompletedIntegratorStep,
    SetTime,
    SetContinuousStates,
    GetContinuousStateValues,
    // Co-Simulation
    SetRealInputDerivatives,
    GetRealOutputDerivatives,
    DoStep,
    CancelStep,
    GetStatus,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::SetDebugLogging => "fmi2SetDebugLogging",
            Operation::SetupExperiment => "fmi2SetupExperiment",
            Operation::EnterInitializationMode => "fmi2EnterInitializationMode",
            Operation::ExitInitializationMode => "fmi2ExitInitializationMode",
            Operation::Terminate => "fmi2Terminate",
            Operation::Reset => "fmi2Reset",
            Operation::GetValues => "fmi2GetXXX",
            Operation::SetValues => "fmi2SetXXX",
            Operation::GetState => "fmi2GetFMUstate",
            Operation::SetState => "fmi2SetFMUstate",
            Operation::FreeState => "fmi2FreeFMUstate",
            Operation::SerializeState => "fmi2SerializeFMUstate",
            Operation::GetDirectionalDerivative => "fmi2GetDirectionalDerivative",
            Operation::EnterEventMode => "fmi2EnterEventMode",
            Operation::NewDiscreteStates => "fmi2NewDiscreteStates",
            Operation::EnterContinuousTimeMode => "fmi2EnterContinuousTimeMode",
            Operation::CompletedIntegratorStep => "fmi2CompletedIntegratorStep",
            Operation::SetTime => "fmi2SetTime",
            Operation::SetContinuousStates => "fmi2SetContinuousStates",
            Operation::GetContinuousStateValues => "fmi2GetDerivatives",
            Operation::SetRealInputDerivatives => "fmi2SetRealInputDerivatives",
            Operation::GetRealOutputDerivatives => "fmi2GetRealOutputDerivatives",
            Operation::DoStep => "fmi2DoStep",
            Operation::CancelStep => "fmi2CancelStep",
            Operation::GetStatus => "fmi2GetStatus",
        }
    }
}

/// 单个实例的生命周期
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    state: LifecycleState,
    fmu_type: FmuType,
}

impl Lifecycle {
    pub fn new(fmu_type: FmuType) -> Lifecycle {
        Lifecycle {
            state: LifecycleState::Instantiated,
            fmu_type,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn fmu_type(&self) -> FmuType {
        self.fmu_type
    }

    /// 当前状态下是否允许该操作
    pub fn allows(&self, op: Operation) -> bool {
        use LifecycleState as S;
        use Operation as O;

        let me = self.fmu_type == FmuType::ModelExchange;
        let cs = self.fmu_type == FmuType::CoSimulation;

        match self.state {
            S::Broken => false,
            S::Failed | S::StepCanceled => matches!(op, O::Reset | O::SetState | O::FreeState),
            S::Terminated => matches!(
                op,
                O::Reset | O::SetState | O::FreeState | O::GetValues | O::SetDebugLogging
            ),
            S::Instantiated => matches!(
                op,
                O::SetDebugLogging
                    | O::SetupExperiment
                    | O::SetValues
                    | O::Reset
                    | O::GetState
                    | O::SetState
                    | O::FreeState
                    | O::SerializeState
            ),
            S::ExperimentSetUp => matches!(
                op,
                O::SetDebugLogging
                    | O::EnterInitializationMode
                    | O::SetValues
                    | O::Reset
                    | O::GetState
                    | O::SetState
                    | O::FreeState
                    | O::SerializeState
            ),
            S::InitializationMode => matches!(
                op,
                O::SetDebugLogging
                    | O::ExitInitializationMode
                    | O::GetValues
                    | O::SetValues
                    | O::GetDirectionalDerivative
                    | O::Reset
                    | O::GetState
                    | O::SetState
                    | O::FreeState
                    | O::SerializeState
            ),
            S::StepPending => cs && matches!(op, O::CancelStep | O::GetStatus),
            S::StepMode => {
                cs && matches!(
                    op,
                    O::SetDebugLogging
                        | O::DoStep
                        | O::GetValues
                        | O::SetValues
                        | O::GetStatus
                        | O::SetRealInputDerivatives
                        | O::GetRealOutputDerivatives
                        | O::GetDirectionalDerivative
                        | O::Terminate
                        | O::Reset
                        | O::GetState
                        | O::SetState
                        | O::FreeState
                        | O::SerializeState
                )
            }
            S::EventMode => {
                me && matches!(
                    op,
                    O::SetDebugLogging
                        | O::NewDiscreteStates
                        | O::EnterContinuousTimeMode
                        | O::GetValues
                        | O::SetValues
                        | O::SetContinuousStates
                        | O::GetContinuousStateValues
                        | O::GetDirectionalDerivative
                        | O::Terminate
                        | O::Reset
                        | O::GetState
                        | O::SetState
                        | O::FreeState
                        | O::SerializeState
                )
            }
            S::ContinuousTimeMode => {
                me && matches!(
                    op,
                    O::SetDebugLogging
                        | O::EnterEventMode
                        | O::CompletedIntegratorStep
                        | O::SetTime
                        | O::SetContinuousStates
                        | O::GetContinuousStateValues
                        | O::GetValues
                        | O::SetValues
                        | O::GetDirectionalDerivative
                        | O::Terminate
                        | O::Reset
                        | O::GetState
                        | O::SetState
                        | O::FreeState
                        | O::SerializeState
                )
            }
        }
    }

    /// 调用前检查
    pub fn check(&self, op: Operation) -> Result<()> {
        if self.allows(op) {
            Ok(())
        } else {
            Err(FmuError::IllegalCall {
                operation: op.name(),
                state: self.state,
            })
        }
    }

    /// 根据原生调用结果推进状态。Error / Fatal 总是覆盖目标状态。
    pub fn record(&mut self, op: Operation, status: Status) {
        match status {
            Status::Error => {
                self.state = LifecycleState::Failed;
                return;
            }
            Status::Fatal => {
                self.state = LifecycleState::Broken;
                return;
            }
            Status::Discard => return,
            Status::Ok | Status::Warning | Status::Pending => {}
        }

        use LifecycleState as S;
        self.state = match (op, status) {
            (Operation::DoStep, Status::Pending) => S::StepPending,
            (_, Status::Pending) => self.state,
            (Operation::SetupExperiment, _) => S::ExperimentSetUp,
            (Operation::EnterInitializationMode, _) => S::InitializationMode,
            (Operation::ExitInitializationMode, _) => self.stepping_state(),
            (Operation::Terminate, _) => S::Terminated,
            (Operation::Reset, _) => S::Instantiated,
            (Operation::CancelStep, _) => S::StepCanceled,
            (Operation::EnterEventMode, _) => S::EventMode,
            (Operation::EnterContinuousTimeMode, _) => S::ContinuousTimeMode,
            _ => self.state,
        };
    }

    /// 初始化结束后的工作状态
    pub fn stepping_state(&self) -> LifecycleState {
        match self.fmu_type {
            FmuType::CoSimulation => LifecycleState::StepMode,
            FmuType::ModelExchange => LifecycleState::EventMode,
        }
    }

    /// 异步步结束（轮询到最终状态）后回到步进状态
    pub fn finish_pending(&mut self, status: Status) {
        if self.state != LifecycleState::StepPending {
            return;
        }
        match status {
            Status::Pending => {}
            Status::Error => self.state = LifecycleState::Failed,
            Status::Fatal => self.state = LifecycleState::Broken,
            Status::Ok | Status::Warning | Status::Discard => {
                self.state = LifecycleState::StepMode
            }
        }
    }

    /// 恢复状态快照后直接进入快照所在状态
    pub fn restore(&mut self, state: LifecycleState) {
        self.state = state;
    }
}
