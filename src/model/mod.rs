//! 模型描述模块
//!
//! 描述文档的结构化记录、变量表以及摘要输出。

mod description;
mod info;
mod variable;

pub use description::{
    CoSimulationCapabilities, DefaultExperiment, LogCategory, ModelDescription,
    ModelExchangeCapabilities, SUPPORTED_FMI_VERSION,
};
pub use info::describe;
pub use variable::{
    BooleanAttributes, Causality, Initial, IntegerAttributes, RealAttributes, ScalarKind,
    ScalarVariable, StringAttributes, Variability, VariableKind,
};
