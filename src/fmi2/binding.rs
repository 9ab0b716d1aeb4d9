//! 已加载的模型二进制
//!
//! `ModelBinding` 独占一个动态库和它的入口点表。实例通过 `Arc` 共享 binding，
//! 所以库总是在最后一个实例释放之后才卸载。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use tracing::{debug, info};

use super::functions::{Fmi2Functions, require};
use super::instance::ModelInstance;
use super::logger::{
    LogContext, LogSink, allocate_memory_callback, free_memory_callback, logger_callback, lossy,
};
use super::marshal::{c_string, to_bool};
use super::types::*;
use crate::archive::ArchiveLoader;
use crate::error::{FmuError, Result};
use crate::model::ModelDescription;
use crate::platform::PlatformTriple;

pub struct ModelBinding {
    // 字段顺序保证入口点表先于库释放
    functions: Fmi2Functions,
    fmu_type: FmuType,
    sink: Arc<dyn LogSink>,
    path: Option<PathBuf>,
    _library: Option<Library>,
}

impl ModelBinding {
    /// 加载二进制并解析入口点；接口类型要求的入口点缺失时报错
    pub fn load(
        path: impl AsRef<Path>,
        fmu_type: FmuType,
        sink: Arc<dyn LogSink>,
    ) -> Result<Arc<ModelBinding>> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(FmuError::BinaryNotFound {
                path: path.to_path_buf(),
            });
        }

        debug!(path = %path.display(), "加载模型二进制");
        let library = unsafe { Library::new(path) }.map_err(|source| FmuError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        })?;

        let functions = Fmi2Functions::resolve(&library);
        functions.check_required(fmu_type)?;

        info!(path = %path.display(), ?fmu_type, "✅ 模型二进制已加载");
        Ok(Arc::new(ModelBinding {
            functions,
            fmu_type,
            sink,
            path: Some(path.to_path_buf()),
            _library: Some(library),
        }))
    }

    /// 按当前平台在归档里找到二进制并加载
    pub fn open(
        archive: &dyn ArchiveLoader,
        description: &ModelDescription,
        fmu_type: FmuType,
        sink: Arc<dyn LogSink>,
    ) -> Result<Arc<ModelBinding>> {
        let platform = PlatformTriple::current();
        let identifier = description.model_identifier(fmu_type)?;
        let path = archive.binary_path(&platform, identifier)?;
        ModelBinding::load(path, fmu_type, sink)
    }

    /// 用一张已经填好的入口点表构造（静态链接进进程的模型）
    pub fn from_functions(
        functions: Fmi2Functions,
        fmu_type: FmuType,
        sink: Arc<dyn LogSink>,
    ) -> Result<Arc<ModelBinding>> {
        functions.check_required(fmu_type)?;
        Ok(Arc::new(ModelBinding {
            functions,
            fmu_type,
            sink,
            path: None,
            _library: None,
        }))
    }

    pub fn functions(&self) -> &Fmi2Functions {
        &self.functions
    }

    pub fn fmu_type(&self) -> FmuType {
        self.fmu_type
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// `fmi2GetVersion`
    pub fn version(&self) -> Result<String> {
        let f = require(self.functions.get_version, "fmi2GetVersion")?;
        Ok(unsafe { lossy(f()) })
    }

    /// `fmi2GetTypesPlatform`
    pub fn types_platform(&self) -> Result<String> {
        let f = require(self.functions.get_types_platform, "fmi2GetTypesPlatform")?;
        Ok(unsafe { lossy(f()) })
    }

    /// `fmi2Instantiate`：返回空句柄时报 InstantiationFailed
    pub fn instantiate(
        self: &Arc<Self>,
        instance_name: &str,
        guid: &str,
        resource_location: Option<&str>,
        visible: bool,
        logging_on: bool,
    ) -> Result<ModelInstance> {
        const OP: &str = "fmi2Instantiate";
        let f = require(self.functions.instantiate, OP)?;

        let name_c = c_string(OP, instance_name)?;
        let guid_c = c_string(OP, guid)?;
        let resource_c = resource_location.map(|s| c_string(OP, s)).transpose()?;

        let context = Box::new(LogContext {
            sink: Arc::clone(&self.sink),
        });
        let callbacks = Box::new(fmi2CallbackFunctions {
            logger: Some(logger_callback()),
            allocate_memory: Some(allocate_memory_callback()),
            free_memory: Some(free_memory_callback()),
            step_finished: None,
            component_environment: &*context as *const LogContext as fmi2ComponentEnvironment,
        });

        let component = unsafe {
            f(
                name_c.as_ptr(),
                self.fmu_type.to_raw(),
                guid_c.as_ptr(),
                resource_c
                    .as_ref()
                    .map_or(std::ptr::null(), |s| s.as_ptr()),
                &*callbacks,
                to_bool(visible),
                to_bool(logging_on),
            )
        };
        if component.is_null() {
            return Err(FmuError::InstantiationFailed {
                instance_name: instance_name.to_string(),
            });
        }

        debug!(instance = instance_name, fmu_type = ?self.fmu_type, "实例化完成");
        Ok(ModelInstance::new(
            Arc::clone(self),
            component,
            instance_name,
            callbacks,
            context,
        ))
    }
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinding")
            .field("fmu_type", &self.fmu_type)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}
