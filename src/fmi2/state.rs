//! 模型状态快照
//!
//! `ModelState` 是不透明的快照句柄，只能移动不能复制；必须交还给
//! [`ModelInstance::free_state`] 释放。`StateGuard` 在作用域结束时自动释放。

use tracing::warn;

use super::instance::ModelInstance;
use super::lifecycle::LifecycleState;
use super::types::fmi2FMUstate;
use crate::error::Result;

pub struct ModelState {
    pub(crate) raw: fmi2FMUstate,
    /// 捕获时实例所处状态；反序列化得到的快照为 None
    pub(crate) captured_in: Option<LifecycleState>,
}

impl ModelState {
    pub(crate) fn new(raw: fmi2FMUstate, captured_in: Option<LifecycleState>) -> ModelState {
        ModelState { raw, captured_in }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_null()
    }

    pub fn captured_in(&self) -> Option<LifecycleState> {
        self.captured_in
    }

    /// 取出原生句柄，之后本值为空
    pub(crate) fn take(&mut self) -> fmi2FMUstate {
        std::mem::replace(&mut self.raw, std::ptr::null_mut())
    }
}

impl std::fmt::Debug for ModelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelState")
            .field("raw", &self.raw)
            .field("captured_in", &self.captured_in)
            .finish()
    }
}

impl Drop for ModelState {
    fn drop(&mut self) {
        if !self.raw.is_null() {
            warn!(raw = ?self.raw, "状态快照未释放就被丢弃，模型侧内存泄漏");
        }
    }
}

/// 持有实例的可变借用和一个快照，离开作用域时释放快照
pub struct StateGuard<'a> {
    instance: &'a mut ModelInstance,
    state: Option<ModelState>,
}

impl<'a> StateGuard<'a> {
    /// 对当前实例拍一个快照
    pub fn capture(instance: &'a mut ModelInstance) -> Result<StateGuard<'a>> {
        let state = instance.get_state()?;
        Ok(StateGuard {
            instance,
            state: Some(state),
        })
    }

    /// 接管一个已有快照（例如反序列化得到的）
    pub fn adopt(instance: &'a mut ModelInstance, state: ModelState) -> StateGuard<'a> {
        StateGuard {
            instance,
            state: Some(state),
        }
    }

    pub fn instance(&mut self) -> &mut ModelInstance {
        self.instance
    }

    pub fn state(&self) -> Option<&ModelState> {
        self.state.as_ref()
    }

    /// 把实例恢复到快照
    pub fn restore(&mut self) -> Result<()> {
        match &self.state {
            Some(state) => self.instance.set_state(state),
            None => Ok(()),
        }
    }

    pub fn serialize(&mut self) -> Result<Vec<u8>> {
        match &self.state {
            Some(state) => self.instance.serialize_state(state),
            None => Ok(Vec::new()),
        }
    }

    /// 显式释放，返回释放结果
    pub fn release(mut self) -> Result<()> {
        match self.state.take() {
            Some(state) => self.instance.free_state(state),
            None => Ok(()),
        }
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            if let Err(e) = self.instance.free_state(state) {
                warn!(error = %e, "释放状态快照失败");
            }
        }
    }
}
