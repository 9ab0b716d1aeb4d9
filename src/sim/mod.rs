//! 仿真驱动模块
//!
//! 选项解析与校验、Co-Simulation 主循环以及输出记录。

mod cosim;
mod driver;
mod numeric;
mod options;
mod recorder;

pub use cosim::{Deadline, LoopEnd, SimulationResult, StopReason, step_until_stop};
pub use driver::{simulate_fmu, simulate_instance};
pub use numeric::{DEFAULT_EPSILON, auto_interval, default_step_size, is_close, is_close_eps};
pub use options::{
    ResolvedOptions, ResolvedStartValue, SimulationOptions, StartValue, TypedValue,
};
pub use recorder::{Recorder, Row};
