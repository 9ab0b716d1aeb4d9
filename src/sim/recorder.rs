//! 输出记录
//!
//! 按值类型分组，每次采样对每种类型只发一次批量读取。

use serde::Serialize;

use super::options::TypedValue;
use crate::error::Result;
use crate::fmi2::{ModelInstance, ValueReference};
use crate::model::{ScalarKind, ScalarVariable};

/// 一行记录：时间 + 各列的值（列顺序与 `columns` 一致）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    pub time: f64,
    pub values: Vec<TypedValue>,
}

#[derive(Debug, Default)]
struct Group {
    columns: Vec<usize>,
    vrs: Vec<ValueReference>,
}

impl Group {
    fn push(&mut self, column: usize, vr: ValueReference) {
        self.columns.push(column);
        self.vrs.push(vr);
    }
}

#[derive(Debug, Default)]
pub struct Recorder {
    columns: Vec<String>,
    real: Group,
    integer: Group,
    boolean: Group,
    string: Group,
    rows: Vec<Row>,
}

impl Recorder {
    pub fn new(variables: &[ScalarVariable]) -> Recorder {
        let mut recorder = Recorder::default();
        for (column, v) in variables.iter().enumerate() {
            recorder.columns.push(v.name.clone());
            let group = match v.kind.scalar_kind() {
                ScalarKind::Real => &mut recorder.real,
                ScalarKind::Integer => &mut recorder.integer,
                ScalarKind::Boolean => &mut recorder.boolean,
                ScalarKind::String => &mut recorder.string,
            };
            group.push(column, v.value_reference);
        }
        recorder
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// 读取一行；`force` 为 false 时与上一行时间完全相同则跳过
    pub fn sample(&mut self, instance: &mut ModelInstance, time: f64, force: bool) -> Result<()> {
        if !force && self.rows.last().is_some_and(|r| r.time == time) {
            return Ok(());
        }

        let mut values = vec![TypedValue::Real(0.0); self.columns.len()];

        let reals = instance.get_real(&self.real.vrs)?;
        for (&c, v) in self.real.columns.iter().zip(reals) {
            values[c] = TypedValue::Real(v);
        }
        let integers = instance.get_integer(&self.integer.vrs)?;
        for (&c, v) in self.integer.columns.iter().zip(integers) {
            values[c] = TypedValue::Integer(v);
        }
        let booleans = instance.get_boolean(&self.boolean.vrs)?;
        for (&c, v) in self.boolean.columns.iter().zip(booleans) {
            values[c] = TypedValue::Boolean(v);
        }
        let strings = instance.get_string(&self.string.vrs)?;
        for (&c, v) in self.string.columns.iter().zip(strings) {
            values[c] = TypedValue::String(v);
        }

        self.rows.push(Row { time, values });
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Row>) {
        (self.columns, self.rows)
    }
}
