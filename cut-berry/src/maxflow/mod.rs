//! 最小割/最大流引擎.
//!
//! 引擎只接受一次性提交的容量矩阵, 求解后可查询每个节点所属的一侧与总流量.
//! 节点编号由引擎决定, 与容量矩阵使用的平坦下标不一定相同.

mod grid;
mod layout;

use crate::consts::Segment;
use crate::error::GraphResult;
use crate::graph::CapacityMatrix;
use crate::weight::Weight;
use crate::Idx3d;

pub use grid::GridMaxFlow;

/// 引擎内部的节点编号.
pub type NodeId = u32;

/// 网格图最大流引擎需要满足的契约.
pub trait MaxFlowEngine: Sized + Send + Sync {
    /// 为 `(z, h, w)` 形状的体数据创建引擎.
    ///
    /// `parallelism` 为工作线程数, `block_size` 为引擎内部分块粒度.
    /// 两者都只影响性能, 不影响结果.
    fn with_shape(shape: Idx3d, parallelism: usize, block_size: usize) -> GraphResult<Self>;

    /// `(z, h, w)` 对应的节点编号.
    fn node_id(&self, pos: Idx3d) -> NodeId;

    /// 提交容量矩阵. 只能在求解前调用一次.
    fn set_caps<W: Weight>(&mut self, caps: &CapacityMatrix<W>) -> GraphResult<()>;

    /// 计算最大流. 阻塞直至完成.
    fn compute_maxflow(&mut self);

    /// 节点 `node` 在最小割中所属的一侧.
    fn segment(&self, node: NodeId) -> Segment;

    /// 总流量, 等于最小割的权重.
    fn flow(&self) -> f64;

    /// 在引擎的工作线程中执行 `op`. 默认直接在当前线程执行.
    #[cfg(feature = "rayon")]
    fn install<R: Send, F: FnOnce() -> R + Send>(&self, op: F) -> R {
        op()
    }
}
