//! 仿真驱动
//!
//! 选项解析 → 加载 → 实例化 → 初始化 → 主循环 → 结束。

use std::sync::Arc;

use tracing::{debug, info};

use super::cosim::{Deadline, SimulationResult, step_until_stop};
use super::options::{ResolvedOptions, ResolvedStartValue, SimulationOptions, TypedValue};
use super::recorder::Recorder;
use crate::archive::ArchiveLoader;
use crate::error::{FmuError, Result};
use crate::fmi2::{FmuType, LifecycleState, LogSink, ModelBinding, ModelInstance, StateGuard};
use crate::model::ModelDescription;

/// 从已解包的归档加载模型并仿真
#[tracing::instrument(skip_all, fields(model = %md.model_name))]
pub fn simulate_fmu(
    archive: &dyn ArchiveLoader,
    md: &ModelDescription,
    options: &SimulationOptions,
    sink: Arc<dyn LogSink>,
) -> Result<SimulationResult> {
    let opts = options.resolve(md)?;
    reject_model_exchange(&opts)?;
    if !opts.initialize && opts.fmu_state.is_none() {
        return Err(FmuError::InvalidOptions(
            "initialize = false requires a live instance or a serialized model state".to_string(),
        ));
    }

    let binding = ModelBinding::open(archive, md, opts.fmu_type, sink)?;
    let resource_location = archive.resource_location();
    let mut instance = binding.instantiate(
        &opts.instance_name,
        &md.guid,
        Some(resource_location.as_str()),
        opts.visible,
        opts.debug_logging,
    )?;

    run(md, &mut instance, &opts)
}

/// 在一个已经存在的实例上仿真（实例的所有权留给调用方）
#[tracing::instrument(skip_all, fields(model = %md.model_name, instance = %instance.name()))]
pub fn simulate_instance(
    md: &ModelDescription,
    instance: &mut ModelInstance,
    options: &SimulationOptions,
) -> Result<SimulationResult> {
    let opts = options.resolve(md)?;
    reject_model_exchange(&opts)?;
    if instance.fmu_type() != opts.fmu_type {
        return Err(FmuError::InvalidOptions(format!(
            "instance was created as {:?}, options request {:?}",
            instance.fmu_type(),
            opts.fmu_type
        )));
    }
    run(md, instance, &opts)
}

fn reject_model_exchange(opts: &ResolvedOptions) -> Result<()> {
    if opts.fmu_type == FmuType::ModelExchange {
        return Err(FmuError::MissingCapability(
            "ModelExchange simulation requires an ODE solver".to_string(),
        ));
    }
    Ok(())
}

fn run(
    md: &ModelDescription,
    instance: &mut ModelInstance,
    opts: &ResolvedOptions,
) -> Result<SimulationResult> {
    info!(
        start = opts.start_time,
        stop = opts.stop_time,
        interval = opts.output_interval,
        "▶️  开始仿真"
    );
    let deadline = Deadline::new(opts.timeout);

    if opts.debug_logging {
        instance.set_debug_logging(true, opts.log_categories.as_slice())?;
    }

    if let Some(bytes) = &opts.fmu_state {
        restore_serialized_state(instance, bytes)?;
    }

    if opts.initialize {
        initialize(instance, opts)?;
    }

    let mut recorder = Recorder::new(&opts.outputs);
    recorder.sample(instance, opts.start_time, false)?;

    let end = step_until_stop(instance, opts, &mut recorder, &deadline)?;

    // 取消的步之后只能 Reset / 释放
    if opts.terminate && instance.state() != LifecycleState::StepCanceled {
        instance.terminate()?;
    }

    info!(
        final_time = end.time,
        steps = end.steps,
        reason = %end.reason,
        model = %md.model_name,
        "✅ 仿真完成"
    );

    let (columns, rows) = recorder.into_parts();
    Ok(SimulationResult {
        columns,
        rows,
        final_time: end.time,
        steps: end.steps,
        stop_reason: end.reason,
    })
}

/// SetupExperiment → 起始值 → EnterInitializationMode → 起始值 → ExitInitializationMode
fn initialize(instance: &mut ModelInstance, opts: &ResolvedOptions) -> Result<()> {
    let stop_time = opts.set_stop_time.then_some(opts.stop_time);
    instance.setup_experiment(opts.relative_tolerance, opts.start_time, stop_time)?;

    apply_start_values(instance, opts.start_values.iter().filter(|s| s.before_initialization))?;
    instance.enter_initialization_mode()?;
    apply_start_values(instance, opts.start_values.iter().filter(|s| !s.before_initialization))?;
    instance.exit_initialization_mode()?;

    debug!(state = ?instance.state(), "初始化完成");
    Ok(())
}

fn apply_start_values<'a>(
    instance: &mut ModelInstance,
    values: impl Iterator<Item = &'a ResolvedStartValue>,
) -> Result<()> {
    for start in values {
        let vr = [start.value_reference];
        match &start.value {
            TypedValue::Real(v) => instance.set_real(&vr, &[*v])?,
            TypedValue::Integer(v) => instance.set_integer(&vr, &[*v])?,
            TypedValue::Boolean(v) => instance.set_boolean(&vr, &[*v])?,
            TypedValue::String(v) => instance.set_string(&vr, &[v.as_str()])?,
        }
        debug!(name = %start.name, value = ?start.value, "已设置起始值");
    }
    Ok(())
}

/// 反序列化并恢复模型状态；快照在恢复后释放
fn restore_serialized_state(instance: &mut ModelInstance, bytes: &[u8]) -> Result<()> {
    let state = instance.deserialize_state(bytes)?;
    let mut guard = StateGuard::adopt(instance, state);
    guard.restore()?;
    debug!(state = ?guard.instance().state(), "已恢复序列化的模型状态");
    guard.release()
}
