//! 归档目录
//!
//! zip 解包本身不在本 crate 内完成：调用方把 FMU 解包到某个目录后，
//! 通过 [`ArchiveLoader`] 交给驱动器。这里只负责在目录里定位二进制与资源。

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{FmuError, Result};
use crate::platform::PlatformTriple;

const LIBRARY_SUFFIXES: [&str; 3] = ["so", "dll", "dylib"];

/// 已解包归档的访问接口
pub trait ArchiveLoader {
    /// 解包后的根目录（包含 `modelDescription.xml`、`binaries/`、`resources/`）
    fn root(&self) -> &Path;

    /// 归档内带有动态库的平台目录名，按名字排序
    fn supported_platforms(&self) -> Vec<String> {
        let binaries = self.root().join("binaries");
        let Ok(entries) = fs::read_dir(&binaries) else {
            return Vec::new();
        };

        let mut platforms: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir() && contains_library(&entry.path()))
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .collect();
        platforms.sort();
        platforms
    }

    /// 与宿主平台匹配的模型二进制路径；平台不在归档中时返回 LoadError。
    fn binary_path(&self, platform: &PlatformTriple, model_identifier: &str) -> Result<PathBuf> {
        let available = self.supported_platforms();
        if !available.iter().any(|p| p == &platform.platform_tag) {
            return Err(FmuError::UnsupportedPlatform {
                platform: platform.platform_tag.clone(),
                available,
            });
        }

        let path = self
            .root()
            .join("binaries")
            .join(&platform.platform_tag)
            .join(platform.library_file_name(model_identifier));
        debug!(path = %path.display(), "定位模型二进制");

        if !path.is_file() {
            return Err(FmuError::BinaryNotFound { path });
        }
        Ok(path)
    }

    /// `resources/` 目录的 file URI（传给 fmi2Instantiate）
    fn resource_location(&self) -> String {
        file_uri(&self.root().join("resources"))
    }
}

/// 磁盘上已解包的 FMU 目录
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    root: PathBuf,
}

impl ExtractedArchive {
    pub fn open(root: impl Into<PathBuf>) -> Result<ExtractedArchive> {
        let root = root.into();
        if let Err(source) = fs::metadata(&root) {
            return Err(FmuError::Read { path: root, source });
        }
        Ok(ExtractedArchive { root })
    }
}

impl ArchiveLoader for ExtractedArchive {
    fn root(&self) -> &Path {
        &self.root
    }
}

fn contains_library(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };
    entries.filter_map(|entry| entry.ok()).any(|entry| {
        entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| LIBRARY_SUFFIXES.contains(&ext))
    })
}

fn file_uri(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\\', "/");
    if path.starts_with('/') {
        format!("file://{path}")
    } else {
        format!("file:///{path}")
    }
}
