//! 命令行工具依赖的通用组件.

use std::env;
use std::path::{Path, PathBuf};

const SEP: &str = "--------------------------------------------------------";

/// 指定工作线程数的环境变量.
pub const THREADS_ENV: &str = "CUT3D_THREADS";

/// 简单分隔线.
#[inline]
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 获取工作线程数.
///
/// 1. 若环境变量 `$CUT3D_THREADS` 是正整数, 则返回其值;
/// 2. 否则, 返回可并行核心数.
pub fn threads_from_env_or_cpus() -> usize {
    env::var(THREADS_ENV)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(cpus)
}

/// 将以 `~/` 开头的路径展开到用户主目录下. 其余路径原样返回.
///
/// 无法确定主目录时也原样返回.
pub fn expand_home<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpus() {
        assert!(cpus() >= 1);
        assert!(threads_from_env_or_cpus() >= 1);
    }

    #[test]
    fn test_sep_to() {
        let mut buf = Vec::new();
        sep_to(&mut buf).unwrap();
        assert_eq!(buf.len(), SEP.len() + 1);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("a/b.nii"), PathBuf::from("a/b.nii"));
        assert_eq!(expand_home("/a/~/b"), PathBuf::from("/a/~/b"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/x.npy"), home.join("x.npy"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
