#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 基于 6-邻域网格图的最小割/最大流, 对 3D 体数据进行前景/背景二值分割.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 流程
//!
//! 体数据 -> [`GraphCutFilter`] 按光栅顺序遍历 -> 能量策略计算容量
//! -> [`GridGraph`] 写入容量矩阵 -> 最大流引擎求解 -> 逐体素读取所属一侧 -> 输出标签.
//!
//! # 注意
//!
//! 1. 所有三维索引均为 `(z, h, w)` 顺序. 通常所说的 `(x, y, z)` 即 `(w, h, z)`,
//!   因此平坦下标 `x + W * y + W * H * z` 恰好是 `(z, h, w)` 的行优先偏移.
//! 2. 求解是一次性的. 求解后网格图不可再修改, 需要重新分割时请新建一个.
//!
//! # 开发计划
//!
//! ### 网格图适配器 ✅
//!
//! 坐标 <-> 平坦下标 <-> 引擎节点编号, 容量矩阵, 方向到容量数组的映射.
//!
//! 实现位于 `cut-berry/src/graph`.
//!
//! ### 6-邻域网格最大流引擎 ✅
//!
//! Boykov-Kolmogorov 增广路算法, 节点分块编号.
//! 终端容量预抵消与结果读取可以借助 `rayon` 并行.
//!
//! 实现位于 `cut-berry/src/maxflow`.
//!
//! ### 能量项策略 ✅
//!
//! 硬约束, 亮度差高斯边界项, 带方向的 sheetness 边界项.
//!
//! 实现位于 `cut-berry/src/energy`.
//!
//! ### nii / npy 体数据读写, 切片预览 ✅
//!
//! 实现位于 `cut-berry/src/volume`.
//!
//! ### 增量求解 ⌛️
//!
//! 求解后修改少量容量并复用搜索树重新求解. 目前不支持.

/// 三维索引, 同时也可一定程度上用作非负整数向量.
pub type Idx3d = (usize, usize, usize);

pub mod consts;
pub mod cut;
pub mod energy;
pub mod error;
pub mod extract;
pub mod graph;
pub mod maxflow;
pub mod prelude;
pub mod volume;
pub mod weight;

pub use consts::Segment;
pub use cut::{BuildStats, CutParams, GraphCutFilter};
pub use energy::{BoundaryDirection, EnergyPolicy, EnergyTerm, Seeds, Sigma};
pub use error::{GraphError, GraphResult, VolumeError, VolumeResult};
pub use extract::Segmentation;
pub use graph::{CapacityMatrix, GridGraph};
pub use volume::{LabelVolume, ScanVolume, SliceWritePng};
pub use weight::Weight;
