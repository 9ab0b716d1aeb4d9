//! 仿真选项
//!
//! `SimulationOptions` 是一个全部可选的配置包，可以从 JSON 读入；
//! `resolve` 按描述文档补全默认值并做校验，得到 `ResolvedOptions`。
//! 所有检查都在实例化之前完成。

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::numeric::{auto_interval, default_step_size};
use crate::error::{FmuError, Result};
use crate::fmi2::{FmuType, ValueReference};
use crate::model::{Causality, ModelDescription, ScalarKind, ScalarVariable, Variability};

/// 起始值（JSON 里按字面量类型区分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartValue {
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationOptions {
    /// 接口类型；None 时从描述文档推导
    pub fmu_type: Option<FmuType>,
    pub start_time: Option<f64>,
    pub stop_time: Option<f64>,
    pub relative_tolerance: Option<f64>,
    /// 固定步长求解器的步长
    pub step_size: Option<f64>,
    pub output_interval: Option<f64>,
    pub start_values: BTreeMap<String, StartValue>,
    /// 把描述文档里的 start 属性也作为起始值写入
    pub apply_default_start_values: bool,
    /// 要记录的变量名；None 时记录全部 output
    pub output: Option<Vec<String>>,
    /// 墙钟超时（秒）
    pub timeout: Option<f64>,
    pub debug_logging: bool,
    /// 开启调试日志时的类别；空表示全部
    pub log_categories: Vec<String>,
    pub set_input_derivatives: bool,
    pub visible: bool,
    pub initialize: bool,
    pub terminate: bool,
    /// 是否把停止时间告诉模型
    pub set_stop_time: bool,
    pub instance_name: Option<String>,
    /// 序列化的模型状态；在不初始化的情况下恢复后继续仿真
    pub fmu_state: Option<Vec<u8>>,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            fmu_type: None,
            start_time: None,
            stop_time: None,
            relative_tolerance: None,
            step_size: None,
            output_interval: None,
            start_values: BTreeMap::new(),
            apply_default_start_values: false,
            output: None,
            timeout: None,
            debug_logging: false,
            log_categories: Vec::new(),
            set_input_derivatives: false,
            visible: false,
            initialize: true,
            terminate: true,
            set_stop_time: true,
            instance_name: None,
            fmu_state: None,
        }
    }
}

/// 已按类型转换好的值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TypedValue {
    Real(f64),
    Integer(i32),
    Boolean(bool),
    String(String),
}

/// 一个要写入的起始值
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStartValue {
    pub name: String,
    pub value_reference: ValueReference,
    pub value: TypedValue,
    /// 进入初始化模式之前写入；否则在初始化模式中写入
    pub before_initialization: bool,
}

/// 补全默认值之后的选项
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub fmu_type: FmuType,
    pub start_time: f64,
    pub stop_time: f64,
    pub relative_tolerance: Option<f64>,
    pub step_size: f64,
    pub output_interval: f64,
    pub start_values: Vec<ResolvedStartValue>,
    pub outputs: Vec<ScalarVariable>,
    pub timeout: Option<Duration>,
    pub debug_logging: bool,
    pub log_categories: Vec<String>,
    pub set_input_derivatives: bool,
    pub visible: bool,
    pub initialize: bool,
    pub terminate: bool,
    pub set_stop_time: bool,
    pub instance_name: String,
    pub fmu_state: Option<Vec<u8>>,
    /// 模型是否接受可变通信步长
    pub variable_step_size: bool,
}

impl ResolvedOptions {
    pub fn duration(&self) -> f64 {
        self.stop_time - self.start_time
    }
}

impl SimulationOptions {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<SimulationOptions> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FmuError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// 补全默认值并校验
    pub fn resolve(&self, md: &ModelDescription) -> Result<ResolvedOptions> {
        md.check_version()?;

        let fmu_type = match self.fmu_type {
            Some(t) => t,
            None => md.interface_type()?,
        };
        if !md.supports(fmu_type) {
            return Err(FmuError::MissingCapability(format!("{fmu_type:?}")));
        }

        if !self.initialize && fmu_type != FmuType::CoSimulation {
            return Err(FmuError::InvalidOptions(
                "initialize = false requires the CoSimulation interface".to_string(),
            ));
        }
        if self.initialize && self.fmu_state.is_some() {
            return Err(FmuError::InvalidOptions(
                "a serialized model state can only be restored with initialize = false"
                    .to_string(),
            ));
        }

        let experiment = md.default_experiment.clone().unwrap_or_default();
        let start_time = self.start_time.or(experiment.start_time).unwrap_or(0.0);
        let stop_time = self
            .stop_time
            .or(experiment.stop_time)
            .unwrap_or(start_time + 1.0);
        if !start_time.is_finite() || !stop_time.is_finite() {
            return Err(FmuError::InvalidOptions(
                "start and stop time must be finite".to_string(),
            ));
        }
        if stop_time < start_time {
            return Err(FmuError::InvalidOptions(format!(
                "stop time {stop_time} is before start time {start_time}"
            )));
        }
        let duration = stop_time - start_time;
        let relative_tolerance = self.relative_tolerance.or(experiment.tolerance);

        let step_size = match self.step_size {
            Some(h) => h,
            None => default_step_size(duration),
        };

        let co_simulation = md.co_simulation.as_ref();
        let output_interval = match self.output_interval {
            Some(interval) => {
                if !(interval > 0.0) {
                    return Err(FmuError::InvalidOptions(format!(
                        "output interval must be positive, got {interval}"
                    )));
                }
                interval
            }
            None if duration > 0.0 => {
                let declared = co_simulation
                    .and_then(|c| c.fixed_internal_step_size)
                    .or(experiment.step_size);
                match declared {
                    Some(mut interval) => {
                        if !(interval > 0.0) {
                            return Err(FmuError::InvalidOptions(format!(
                                "declared step size must be positive, got {interval}"
                            )));
                        }
                        while duration / interval > 1000.0 {
                            interval *= 2.0;
                        }
                        interval
                    }
                    None => auto_interval(duration),
                }
            }
            // 起止时间相同，不会发生任何通信步
            None => 0.0,
        };

        if self.set_input_derivatives && !co_simulation.is_some_and(|c| c.can_interpolate_inputs) {
            return Err(FmuError::MissingCapability("canInterpolateInputs".to_string()));
        }

        let timeout = self
            .timeout
            .map(|secs| {
                Duration::try_from_secs_f64(secs).map_err(|_| {
                    FmuError::InvalidOptions(format!(
                        "timeout must be a non-negative, representable number of seconds, got {secs}"
                    ))
                })
            })
            .transpose()?;

        let start_values = self.resolve_start_values(md)?;
        let outputs = self.resolve_outputs(md)?;

        let resolved = ResolvedOptions {
            fmu_type,
            start_time,
            stop_time,
            relative_tolerance,
            step_size,
            output_interval,
            start_values,
            outputs,
            timeout,
            debug_logging: self.debug_logging,
            log_categories: self.log_categories.clone(),
            set_input_derivatives: self.set_input_derivatives,
            visible: self.visible,
            initialize: self.initialize,
            terminate: self.terminate,
            set_stop_time: self.set_stop_time,
            instance_name: self
                .instance_name
                .clone()
                .unwrap_or_else(|| md.model_name.clone()),
            fmu_state: self.fmu_state.clone(),
            variable_step_size: co_simulation
                .is_some_and(|c| c.can_handle_variable_communication_step_size),
        };

        debug!(
            fmu_type = ?resolved.fmu_type,
            start_time = resolved.start_time,
            stop_time = resolved.stop_time,
            output_interval = resolved.output_interval,
            start_values = resolved.start_values.len(),
            outputs = resolved.outputs.len(),
            "仿真选项已解析"
        );
        Ok(resolved)
    }

    fn resolve_start_values(&self, md: &ModelDescription) -> Result<Vec<ResolvedStartValue>> {
        let mut resolved = Vec::new();

        for (name, value) in &self.start_values {
            let variable = md
                .variable(name)
                .ok_or_else(|| FmuError::UnknownVariable(name.clone()))?;
            if variable.variability == Variability::Constant {
                return Err(FmuError::InvalidOptions(format!(
                    "variable {name} is constant and cannot be set"
                )));
            }
            let before_initialization = settable_phase(variable)?;
            resolved.push(ResolvedStartValue {
                name: name.clone(),
                value_reference: variable.value_reference,
                value: convert(variable, value)?,
                before_initialization,
            });
        }

        if self.apply_default_start_values {
            for variable in &md.model_variables {
                if self.start_values.contains_key(&variable.name)
                    || variable.variability == Variability::Constant
                {
                    continue;
                }
                let Some(value) = declared_start(variable) else {
                    continue;
                };
                let Ok(before_initialization) = settable_phase(variable) else {
                    continue;
                };
                resolved.push(ResolvedStartValue {
                    name: variable.name.clone(),
                    value_reference: variable.value_reference,
                    value,
                    before_initialization,
                });
            }
        }

        Ok(resolved)
    }

    fn resolve_outputs(&self, md: &ModelDescription) -> Result<Vec<ScalarVariable>> {
        match &self.output {
            Some(names) => names
                .iter()
                .map(|name| {
                    md.variable(name)
                        .cloned()
                        .ok_or_else(|| FmuError::UnknownVariable(name.clone()))
                })
                .collect(),
            None => Ok(md
                .model_variables
                .iter()
                .filter(|v| v.causality == Causality::Output)
                .cloned()
                .collect()),
        }
    }
}

/// true：进入初始化模式之前写入；false：初始化模式中写入
fn settable_phase(variable: &ScalarVariable) -> Result<bool> {
    if variable.settable_before_initialization() {
        Ok(true)
    } else if variable.settable_in_initialization() {
        Ok(false)
    } else {
        Err(FmuError::InvalidOptions(format!(
            "variable {} cannot be set before or during initialization",
            variable.name
        )))
    }
}

fn convert(variable: &ScalarVariable, value: &StartValue) -> Result<TypedValue> {
    let kind = variable.kind.scalar_kind();
    let typed = match (kind, value) {
        (ScalarKind::Real, StartValue::Real(v)) => Some(TypedValue::Real(*v)),
        (ScalarKind::Real, StartValue::Integer(v)) => Some(TypedValue::Real(*v as f64)),
        (ScalarKind::Integer, StartValue::Integer(v)) => {
            i32::try_from(*v).ok().map(TypedValue::Integer)
        }
        (ScalarKind::Boolean, StartValue::Boolean(v)) => Some(TypedValue::Boolean(*v)),
        (ScalarKind::String, StartValue::String(v)) => Some(TypedValue::String(v.clone())),
        _ => None,
    };
    typed.ok_or_else(|| {
        FmuError::InvalidOptions(format!(
            "start value {value:?} does not fit {kind:?} variable {}",
            variable.name
        ))
    })
}

fn declared_start(variable: &ScalarVariable) -> Option<TypedValue> {
    use crate::model::VariableKind;
    match &variable.kind {
        VariableKind::Real(a) => a.start.map(TypedValue::Real),
        VariableKind::Integer(a) | VariableKind::Enumeration(a) => {
            a.start.map(TypedValue::Integer)
        }
        VariableKind::Boolean(a) => a.start.map(TypedValue::Boolean),
        VariableKind::String(a) => a.start.clone().map(TypedValue::String),
    }
}
