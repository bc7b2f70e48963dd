//! 运行时错误.

use crate::Idx3d;
use std::path::PathBuf;
use thiserror::Error;

/// 图构建、求解与查询的运行时错误.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum GraphError {
    /// 体数据的某一维度为 0, 或体素总数溢出.
    #[error("invalid volume dimensions {width}x{height}x{depth}")]
    InvalidDimensions {
        /// 宽 (x 方向).
        width: usize,
        /// 高 (y 方向).
        height: usize,
        /// 深 (z 方向).
        depth: usize,
    },

    /// 试图写入负数 (或 NaN) 容量.
    #[error("negative capacity {0}")]
    NegativeCapacity(f64),

    /// N-link 的两个端点并非仅在单一坐标轴上相差 1.
    #[error("voxels {0:?} and {1:?} are not 6-adjacent")]
    InvalidAdjacency(Idx3d, Idx3d),

    /// 索引越界.
    #[error("voxel {pos:?} out of volume with shape {shape:?}")]
    OutOfBounds {
        /// 越界的 `(z, h, w)` 索引.
        pos: Idx3d,
        /// 体数据形状 `(z, h, w)`.
        shape: Idx3d,
    },

    /// 在求解前查询分割结果或流量.
    #[error("graph has not been solved yet")]
    QueryBeforeSolve,

    /// 求解后再次修改或再次求解.
    #[error("graph has already been solved")]
    AlreadySolved,

    /// 容量矩阵的数组下标不在 `0..8` 内.
    #[error("capacity slot {0} out of range")]
    InvalidSlot(usize),

    /// 容量矩阵或引擎内存分配失败.
    #[error("failed to allocate {0} voxels")]
    AllocationFailure(usize),

    /// 参与计算的体数据形状不一致.
    #[error("volume shapes differ: {0:?} vs {1:?}")]
    ShapeMismatch(Idx3d, Idx3d),

    /// 非法的 sigma (必须有限且为正).
    #[error("invalid sigma {0}")]
    InvalidSigma(f64),

    /// 无法创建工作线程池.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// 图构建 / 求解运行时错误.
pub type GraphResult<T> = Result<T, GraphError>;

/// 体数据读写错误.
#[derive(Debug, Error)]
pub enum VolumeError {
    /// NIfTI 读写错误.
    #[error("nifti error on `{path}`: {source}")]
    Nifti {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: nifti::NiftiError,
    },

    /// npy 读取错误.
    #[error("failed to read npy `{path}`: {source}")]
    ReadNpy {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: ndarray_npy::ReadNpyError,
    },

    /// npy 写入错误.
    #[error("failed to write npy `{path}`: {source}")]
    WriteNpy {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: ndarray_npy::WriteNpyError,
    },

    /// 图像 (切片预览) 写入错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// 数组形状与元信息不一致.
    #[error("array shape does not match header dimensions")]
    Shape,

    /// 某一维体素数超出 nii header 的表示范围.
    #[error("volume shape {0:?} exceeds the nifti dimension limit")]
    DimensionOverflow(Idx3d),

    /// 切片索引越界.
    #[error("slice {index} out of range (depth {depth})")]
    SliceOutOfRange {
        /// 请求的切片.
        index: usize,
        /// 切片个数.
        depth: usize,
    },
}

/// 体数据读写结果.
pub type VolumeResult<T> = Result<T, VolumeError>;
