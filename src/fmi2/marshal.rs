//! 参数编组
//!
//! 数组参数打包成连续缓冲区按首元素地址传递；空数组一律传空指针，
//! 不对首元素取地址。

use std::ffi::CString;

use super::types::*;
use crate::error::{FmuError, Result};

pub(crate) fn to_bool(b: bool) -> fmi2Boolean {
    if b { fmi2True } else { fmi2False }
}

pub(crate) fn from_bool(b: fmi2Boolean) -> bool {
    b != fmi2False
}

/// 只读数组的首元素地址；空数组为空指针
pub(crate) fn ptr_or_null<T>(values: &[T]) -> *const T {
    if values.is_empty() {
        std::ptr::null()
    } else {
        values.as_ptr()
    }
}

/// 可写数组的首元素地址；空数组为空指针
pub(crate) fn mut_ptr_or_null<T>(values: &mut [T]) -> *mut T {
    if values.is_empty() {
        std::ptr::null_mut()
    } else {
        values.as_mut_ptr()
    }
}

/// 成对数组必须等长
pub(crate) fn check_same_len(operation: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(FmuError::InvalidArgument {
            operation,
            detail: format!("expected {expected} values, got {actual}"),
        });
    }
    Ok(())
}

/// Rust 字符串 -> NUL 结尾缓冲区；内部含 NUL 视为参数错误
pub(crate) fn c_string(operation: &'static str, s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| FmuError::InvalidArgument {
        operation,
        detail: format!("string {s:?} contains an interior NUL byte"),
    })
}

/// 一组 C 字符串及其指针数组；指针只在本结构存活期间有效
pub(crate) struct CStringArray {
    _owned: Vec<CString>,
    ptrs: Vec<fmi2String>,
}

impl CStringArray {
    pub(crate) fn new<S: AsRef<str>>(operation: &'static str, values: &[S]) -> Result<Self> {
        let owned = values
            .iter()
            .map(|s| c_string(operation, s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        let ptrs = owned.iter().map(|s| s.as_ptr()).collect();
        Ok(CStringArray {
            _owned: owned,
            ptrs,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.ptrs.len()
    }

    pub(crate) fn as_ptr(&self) -> *const fmi2String {
        ptr_or_null(&self.ptrs)
    }
}
