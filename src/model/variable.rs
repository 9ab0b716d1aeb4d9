//! 模型变量
//!
//! 描述文档 `<ModelVariables>` 中的一条 `ScalarVariable`。

use serde::{Deserialize, Serialize};

use crate::fmi2::ValueReference;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Causality {
    Parameter,
    CalculatedParameter,
    Input,
    Output,
    #[default]
    Local,
    Independent,
}

impl Causality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Causality::Parameter => "parameter",
            Causality::CalculatedParameter => "calculatedParameter",
            Causality::Input => "input",
            Causality::Output => "output",
            Causality::Local => "local",
            Causality::Independent => "independent",
        }
    }

    /// 解析命令行/配置里的名字（与 XML 属性值相同）
    pub fn parse(s: &str) -> Option<Causality> {
        [
            Causality::Parameter,
            Causality::CalculatedParameter,
            Causality::Input,
            Causality::Output,
            Causality::Local,
            Causality::Independent,
        ]
        .into_iter()
        .find(|c| c.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Variability {
    Constant,
    Fixed,
    Tunable,
    Discrete,
    #[default]
    Continuous,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Initial {
    Exact,
    Approx,
    Calculated,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RealAttributes {
    #[serde(default)]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub start: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub nominal: Option<f64>,
    /// 若该变量是某个状态的导数，指向状态变量的序号（1 起）
    #[serde(default)]
    pub derivative: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegerAttributes {
    #[serde(default)]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub start: Option<i32>,
    #[serde(default)]
    pub min: Option<i32>,
    #[serde(default)]
    pub max: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BooleanAttributes {
    #[serde(default)]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub start: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StringAttributes {
    #[serde(default)]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
}

/// 变量的值类型及类型相关属性
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum VariableKind {
    Real(RealAttributes),
    Integer(IntegerAttributes),
    Boolean(BooleanAttributes),
    String(StringAttributes),
    /// 枚举在接口上按 Integer 读写
    Enumeration(IntegerAttributes),
}

/// 接口上实际使用的四种标量类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Real,
    Integer,
    Boolean,
    String,
}

impl VariableKind {
    pub fn scalar_kind(&self) -> ScalarKind {
        match self {
            VariableKind::Real(_) => ScalarKind::Real,
            VariableKind::Integer(_) | VariableKind::Enumeration(_) => ScalarKind::Integer,
            VariableKind::Boolean(_) => ScalarKind::Boolean,
            VariableKind::String(_) => ScalarKind::String,
        }
    }

    /// 起始值的显示文本（没有则为空串）
    pub fn start_text(&self) -> String {
        match self {
            VariableKind::Real(a) => a.start.map(|v| v.to_string()),
            VariableKind::Integer(a) | VariableKind::Enumeration(a) => {
                a.start.map(|v| v.to_string())
            }
            VariableKind::Boolean(a) => a.start.map(|v| v.to_string()),
            VariableKind::String(a) => a.start.clone(),
        }
        .unwrap_or_default()
    }

    /// Real 取单位，其余取声明类型
    pub fn unit_text(&self) -> &str {
        let text = match self {
            VariableKind::Real(a) => a.unit.as_deref().or(a.declared_type.as_deref()),
            VariableKind::Integer(a) | VariableKind::Enumeration(a) => a.declared_type.as_deref(),
            VariableKind::Boolean(a) => a.declared_type.as_deref(),
            VariableKind::String(a) => a.declared_type.as_deref(),
        };
        text.unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScalarVariable {
    pub name: String,
    pub value_reference: ValueReference,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub causality: Causality,
    #[serde(default)]
    pub variability: Variability,
    #[serde(default)]
    pub initial: Option<Initial>,
    #[serde(flatten)]
    pub kind: VariableKind,
}

impl ScalarVariable {
    /// 未显式给出 `initial` 时按 FMI 2.0 表格推导出的默认值
    pub fn effective_initial(&self) -> Option<Initial> {
        if self.initial.is_some() {
            return self.initial;
        }
        match (self.causality, self.variability) {
            (_, Variability::Constant) => Some(Initial::Exact),
            (Causality::Parameter, _) => Some(Initial::Exact),
            (Causality::CalculatedParameter, _) => Some(Initial::Calculated),
            (Causality::Output, _) | (Causality::Local, _) => Some(Initial::Calculated),
            (Causality::Input, _) | (Causality::Independent, _) => None,
        }
    }

    /// 在 Instantiated 状态（进入初始化模式之前）可设置
    pub fn settable_before_initialization(&self) -> bool {
        self.variability != Variability::Constant
            && matches!(
                self.effective_initial(),
                Some(Initial::Exact) | Some(Initial::Approx)
            )
    }

    /// 在初始化模式中可设置
    pub fn settable_in_initialization(&self) -> bool {
        self.variability != Variability::Constant
            && (self.effective_initial() == Some(Initial::Exact)
                || self.causality == Causality::Input)
    }
}
