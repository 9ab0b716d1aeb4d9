//! 平台解析
//!
//! 根据宿主操作系统与指针宽度推导 FMU 归档中 `binaries/<platform>` 目录名、
//! 体系结构名与动态库后缀。

use std::fmt;

/// 宿主平台三元组（推导一次，之后不可变）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformTriple {
    /// 体系结构，例如 `x86_64` / `x86` / `aarch64`
    pub architecture: String,
    /// 归档内的平台目录名，例如 `linux64` / `win32` / `darwin64`
    pub platform_tag: String,
    /// 动态库后缀：`so` / `dll` / `dylib`
    pub library_suffix: String,
}

impl PlatformTriple {
    /// 当前进程所在平台
    pub fn current() -> PlatformTriple {
        PlatformTriple::from_parts(
            std::env::consts::OS,
            std::env::consts::ARCH,
            usize::BITS,
        )
    }

    /// 由操作系统名、体系结构名和指针位宽推导三元组。
    pub fn from_parts(os: &str, arch: &str, pointer_bits: u32) -> PlatformTriple {
        let os = os.to_ascii_lowercase();
        let arch = arch.to_ascii_lowercase();

        let (os_tag, library_suffix) = match os.as_str() {
            "windows" => ("win", "dll"),
            "macos" | "darwin" => ("darwin", "dylib"),
            other => (other, "so"),
        };

        let width = if pointer_bits >= 64 { "64" } else { "32" };
        let architecture = match arch.as_str() {
            "aarch64" | "arm64" => "aarch64".to_string(),
            "x86_64" | "amd64" | "x86" | "i386" | "i686" | "x86pc" => {
                if pointer_bits >= 64 {
                    "x86_64".to_string()
                } else {
                    "x86".to_string()
                }
            }
            other => other.to_string(),
        };

        PlatformTriple {
            architecture,
            platform_tag: format!("{os_tag}{width}"),
            library_suffix: library_suffix.to_string(),
        }
    }

    /// 给定模型标识符时的动态库文件名
    pub fn library_file_name(&self, model_identifier: &str) -> String {
        format!("{model_identifier}.{}", self.library_suffix)
    }
}

impl fmt::Display for PlatformTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.platform_tag, self.architecture)
    }
}
