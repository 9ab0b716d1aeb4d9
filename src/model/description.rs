//! 模型描述文档
//!
//! `modelDescription.xml` 解析后的结构化记录。XML 解析由外部完成，
//! 本 crate 只消费结果；记录可以直接从 JSON 读入（字段名沿用 XML 属性名）。

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::variable::ScalarVariable;
use crate::error::{FmuError, Result};
use crate::fmi2::FmuType;

/// 唯一支持的描述文档版本
pub const SUPPORTED_FMI_VERSION: &str = "2.0";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelExchangeCapabilities {
    pub model_identifier: String,
    #[serde(default)]
    pub needs_execution_tool: bool,
    #[serde(default)]
    pub completed_integrator_step_not_needed: bool,
    #[serde(default)]
    pub can_be_instantiated_only_once_per_process: bool,
    #[serde(default)]
    pub can_not_use_memory_management_functions: bool,
    #[serde(default, rename = "canGetAndSetFMUstate")]
    pub can_get_and_set_fmu_state: bool,
    #[serde(default, rename = "canSerializeFMUstate")]
    pub can_serialize_fmu_state: bool,
    #[serde(default)]
    pub provides_directional_derivative: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CoSimulationCapabilities {
    pub model_identifier: String,
    #[serde(default)]
    pub needs_execution_tool: bool,
    #[serde(default)]
    pub can_handle_variable_communication_step_size: bool,
    #[serde(default)]
    pub can_interpolate_inputs: bool,
    #[serde(default)]
    pub max_output_derivative_order: u32,
    #[serde(default)]
    pub can_run_asynchronuously: bool,
    #[serde(default)]
    pub can_be_instantiated_only_once_per_process: bool,
    #[serde(default)]
    pub can_not_use_memory_management_functions: bool,
    #[serde(default, rename = "canGetAndSetFMUstate")]
    pub can_get_and_set_fmu_state: bool,
    #[serde(default, rename = "canSerializeFMUstate")]
    pub can_serialize_fmu_state: bool,
    #[serde(default)]
    pub provides_directional_derivative: bool,
    /// 模型内部固定步长（若声明，作为默认输出间隔）
    #[serde(default)]
    pub fixed_internal_step_size: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefaultExperiment {
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub stop_time: Option<f64>,
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub step_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LogCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescription {
    pub fmi_version: String,
    pub model_name: String,
    pub guid: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub generation_tool: Option<String>,
    #[serde(default)]
    pub generation_date_and_time: Option<String>,
    #[serde(default)]
    pub variable_naming_convention: Option<String>,
    #[serde(default)]
    pub number_of_event_indicators: u32,
    #[serde(default)]
    pub model_exchange: Option<ModelExchangeCapabilities>,
    #[serde(default)]
    pub co_simulation: Option<CoSimulationCapabilities>,
    #[serde(default)]
    pub log_categories: Vec<LogCategory>,
    #[serde(default)]
    pub default_experiment: Option<DefaultExperiment>,
    #[serde(default)]
    pub model_variables: Vec<ScalarVariable>,
}

impl ModelDescription {
    /// 从 JSON 文本读入并检查版本
    pub fn from_json_str(text: &str) -> Result<ModelDescription> {
        let md: ModelDescription = serde_json::from_str(text)?;
        md.check_version()?;
        Ok(md)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<ModelDescription> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| FmuError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        ModelDescription::from_json_str(&text)
    }

    pub fn check_version(&self) -> Result<()> {
        if self.fmi_version != SUPPORTED_FMI_VERSION {
            return Err(FmuError::UnsupportedVersion(self.fmi_version.clone()));
        }
        Ok(())
    }

    /// 推导接口类型：两者都声明时优先 Co-Simulation
    pub fn interface_type(&self) -> Result<FmuType> {
        match (&self.co_simulation, &self.model_exchange) {
            (Some(_), _) => Ok(FmuType::CoSimulation),
            (None, Some(_)) => Ok(FmuType::ModelExchange),
            (None, None) => Err(FmuError::MissingCapability(
                "ModelExchange or CoSimulation".to_string(),
            )),
        }
    }

    pub fn supports(&self, fmu_type: FmuType) -> bool {
        match fmu_type {
            FmuType::CoSimulation => self.co_simulation.is_some(),
            FmuType::ModelExchange => self.model_exchange.is_some(),
        }
    }

    /// 指定接口类型下的模型标识符（即二进制文件名主干）
    pub fn model_identifier(&self, fmu_type: FmuType) -> Result<&str> {
        let id = match fmu_type {
            FmuType::CoSimulation => self.co_simulation.as_ref().map(|c| &c.model_identifier),
            FmuType::ModelExchange => self.model_exchange.as_ref().map(|m| &m.model_identifier),
        };
        id.map(String::as_str)
            .ok_or_else(|| FmuError::MissingCapability(format!("{fmu_type:?}")))
    }

    /// 是否声明了读写 FMU 状态的能力
    pub fn can_get_and_set_state(&self, fmu_type: FmuType) -> bool {
        match fmu_type {
            FmuType::CoSimulation => self
                .co_simulation
                .as_ref()
                .is_some_and(|c| c.can_get_and_set_fmu_state),
            FmuType::ModelExchange => self
                .model_exchange
                .as_ref()
                .is_some_and(|m| m.can_get_and_set_fmu_state),
        }
    }

    pub fn variable(&self, name: &str) -> Option<&ScalarVariable> {
        self.model_variables.iter().find(|v| v.name == name)
    }

    /// 按名字建立索引（同名只保留第一个）
    pub fn variables_by_name(&self) -> HashMap<&str, &ScalarVariable> {
        let mut map = HashMap::with_capacity(self.model_variables.len());
        for v in &self.model_variables {
            map.entry(v.name.as_str()).or_insert(v);
        }
        map
    }

    /// 连续状态个数：带 `derivative` 属性的 Real 变量数
    pub fn number_of_continuous_states(&self) -> usize {
        self.model_variables
            .iter()
            .filter(|v| {
                matches!(&v.kind, super::VariableKind::Real(a) if a.derivative.is_some())
            })
            .count()
    }
}
