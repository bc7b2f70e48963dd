//! 3D 二值图割分割命令行工具.
//!
//! - `cut3d masks`: 以前景 / 背景掩膜为种子, 在 sheetness (或亮度) 体数据上分割,
//!   输出前景 255, 背景 0.
//! - `cut3d labels`: 以标签体数据中的两个标签值为种子, 输出沿用这两个标签值.
//!
//! 输入输出均支持 `.nii`, `.nii.gz` 与 `(z, H, W)` 顺序的 `.npy`.

mod report;
mod runner;

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

/// 基于 6-邻域网格图最小割的 3D 二值分割.
#[derive(Debug, Parser)]
#[command(name = "cut3d", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Mode,

    #[command(flatten)]
    options: Options,
}

/// 分割方式.
#[derive(Debug, Subcommand)]
pub enum Mode {
    /// 以前景 / 背景掩膜为种子. 输出前景 255, 背景 0.
    Masks {
        /// sheetness 或亮度体数据.
        image: PathBuf,
        /// 前景掩膜, 非零体素为前景种子.
        foreground: PathBuf,
        /// 背景掩膜, 非零体素为背景种子.
        background: PathBuf,
        /// 输出标签.
        output: PathBuf,
        /// 边界项高斯模型的噪声参数 (例如 50).
        sigma: f64,
        /// 边界方向: 0 不限, 1 亮到暗, 2 暗到亮.
        direction: u8,
    },

    /// 以标签体数据中的两个标签值为种子. 输出沿用这两个标签值.
    Labels {
        /// sheetness 体数据.
        sheetness: PathBuf,
        /// 种子标签.
        labels: PathBuf,
        /// 输出标签.
        output: PathBuf,
        /// 边界项高斯模型的噪声参数.
        sigma: f64,
        /// 前景标签值.
        foreground: u8,
        /// 背景标签值.
        background: u8,
        /// 边界方向: 0 不限, 1 亮到暗, 2 暗到亮.
        #[arg(long, default_value_t = 1)]
        direction: u8,
    },
}

/// 两种方式共用的选项.
#[derive(Debug, Args)]
pub struct Options {
    /// 工作线程数. 缺省时读取 `$CUT3D_THREADS`, 再缺省时使用全部核心.
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// 最大流引擎的分块边长.
    #[arg(long, global = true, default_value_t = cut_berry::consts::DEFAULT_BLOCK_SIZE)]
    block_size: usize,

    /// 引导体数据中等于该值的体素直接判为背景.
    #[arg(long, global = true, default_value_t = 0.0, allow_negative_numbers = true)]
    ignore: f32,

    /// 不忽略任何体素.
    #[arg(long, global = true, conflicts_with = "ignore")]
    no_ignore: bool,

    /// 容量的数值类型.
    #[arg(long, global = true, value_enum, default_value_t = WeightKind::I8)]
    weight: WeightKind,

    /// 将输出的中间一层切片另存为 png.
    #[arg(long, global = true)]
    preview: Option<PathBuf>,
}

/// 可选的容量类型.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum WeightKind {
    /// `u8`.
    U8,
    /// `i8`.
    I8,
    /// `u16`.
    U16,
    /// `i32`.
    I32,
    /// `f32`.
    F32,
}

fn main() -> ExitCode {
    let _ = simple_logger::init_with_level(log::Level::Info);
    let cli = Cli::parse();

    match runner::run(&cli) {
        Ok(report) => {
            report.analyze();
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
