//! 三维网格图适配器.
//!
//! [`GridGraph`] 持有容量矩阵, 以 `(z, h, w)` 坐标接收 T-link 与 N-link 容量,
//! 并把求解委托给最大流引擎. 只有适配器同时知道平坦下标与引擎节点编号.

mod capacity;

pub use capacity::CapacityMatrix;

use crate::consts::{Segment, CAPACITY_SLOTS, SINK_SLOT, SOURCE_SLOT};
use crate::error::{GraphError, GraphResult};
use crate::maxflow::{GridMaxFlow, MaxFlowEngine, NodeId};
use crate::weight::Weight;
use crate::Idx3d;
use std::mem;
use std::time::Instant;

/// 6-邻域中, 从 `center` 指向 `neighbour` 的容量数组下标.
///
/// 设 `n = dx + 2 * dy + 3 * dz`, 则 `n >= 0` 时为 `2n + 1`, 否则为 `-2n`.
/// 于是 -x/+x 落在 2/3, -y/+y 落在 4/5, -z/+z 落在 6/7.
///
/// 两点不是仅在单一坐标轴上相差 1 时返回 `InvalidAdjacency`.
pub fn capacity_slot(center: Idx3d, neighbour: Idx3d) -> GraphResult<usize> {
    let delta = |a: usize, b: usize| b as isize - a as isize;
    let (dz, dy, dx) = (
        delta(center.0, neighbour.0),
        delta(center.1, neighbour.1),
        delta(center.2, neighbour.2),
    );
    if dx.abs() + dy.abs() + dz.abs() != 1 {
        return Err(GraphError::InvalidAdjacency(center, neighbour));
    }

    let n = dx + 2 * dy + 3 * dz;
    Ok((if n >= 0 { 2 * n + 1 } else { -2 * n }) as usize)
}

/// `(z, h, w)` 在形状为 `shape` 的体数据中的平坦下标 `x + W * y + W * H * z`.
#[inline]
pub fn flat_index((_, h, w): Idx3d, (z, y, x): Idx3d) -> usize {
    (z * h + y) * w + x
}

/// 6-邻域网格图.
///
/// 生命周期: 构造 -> 多次写入容量 -> 一次 [`GridGraph::solve`] -> 查询.
/// 求解会取走容量矩阵, 此后任何写入都返回 `AlreadySolved`.
pub struct GridGraph<W: Weight, E: MaxFlowEngine = GridMaxFlow> {
    /// `(depth, height, width)`.
    shape: Idx3d,
    caps: CapacityMatrix<W>,
    engine: E,
    solved: bool,
}

impl<W: Weight, E: MaxFlowEngine> GridGraph<W, E> {
    /// 为 `width * height * depth` 的体数据创建网格图.
    ///
    /// `parallelism` 为引擎工作线程数, `block_size` 为引擎分块粒度, 两者只影响性能.
    pub fn new(
        width: usize,
        height: usize,
        depth: usize,
        parallelism: usize,
        block_size: usize,
    ) -> GraphResult<Self> {
        let invalid = GraphError::InvalidDimensions {
            width,
            height,
            depth,
        };
        if width == 0 || height == 0 || depth == 0 {
            return Err(invalid);
        }
        let len = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth))
            .ok_or(invalid)?;

        let shape = (depth, height, width);
        let caps = CapacityMatrix::try_new(len)?;
        let engine = E::with_shape(shape, parallelism, block_size)?;

        let edges = (width - 1) * height * depth
            + width * (height - 1) * depth
            + width * height * (depth - 1);
        log::info!(
            "grid graph {width}x{height}x{depth} ({}): {len} vertices, {edges} edges, {parallelism} workers",
            W::NAME
        );

        Ok(Self {
            shape,
            caps,
            engine,
            solved: false,
        })
    }

    /// 以 `(depth, height, width)` 形状创建网格图.
    #[inline]
    pub fn with_shape(shape: Idx3d, parallelism: usize, block_size: usize) -> GraphResult<Self> {
        let (d, h, w) = shape;
        Self::new(w, h, d, parallelism, block_size)
    }

    /// `(depth, height, width)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.shape
    }

    /// 体素 (节点) 个数.
    #[inline]
    pub fn len(&self) -> usize {
        let (d, h, w) = self.shape;
        d * h * w
    }

    /// 图是否为空. 构造成功的图总是非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 是否已求解.
    #[inline]
    pub fn is_solved(&self) -> bool {
        self.solved
    }

    #[inline]
    fn check_bounds(&self, pos: Idx3d) -> GraphResult<()> {
        let (d, h, w) = self.shape;
        if pos.0 < d && pos.1 < h && pos.2 < w {
            Ok(())
        } else {
            Err(GraphError::OutOfBounds {
                pos,
                shape: self.shape,
            })
        }
    }

    #[inline]
    fn check_mutable(&self) -> GraphResult<()> {
        if self.solved {
            Err(GraphError::AlreadySolved)
        } else {
            Ok(())
        }
    }

    #[inline]
    fn check_capacity(value: W) -> GraphResult<()> {
        if value.is_valid_capacity() {
            Ok(())
        } else {
            Err(GraphError::NegativeCapacity(value.as_f64()))
        }
    }

    /// 容量矩阵中 `pos` 的平坦下标.
    pub fn array_index(&self, pos: Idx3d) -> GraphResult<usize> {
        self.check_bounds(pos)?;
        Ok(flat_index(self.shape, pos))
    }

    /// 引擎中 `pos` 的节点编号.
    pub fn node_id(&self, pos: Idx3d) -> GraphResult<NodeId> {
        self.check_bounds(pos)?;
        Ok(self.engine.node_id(pos))
    }

    /// 覆盖写入 `pos` 的终端容量.
    pub fn add_terminal_edge(&mut self, pos: Idx3d, foreground: W, background: W) -> GraphResult<()> {
        self.check_mutable()?;
        Self::check_capacity(foreground)?;
        Self::check_capacity(background)?;
        let i = self.array_index(pos)?;
        self.caps.set(SOURCE_SLOT, i, foreground);
        self.caps.set(SINK_SLOT, i, background);
        Ok(())
    }

    /// 覆盖写入一对相邻体素之间的双向容量.
    pub fn add_neighbour_edge(
        &mut self,
        a: Idx3d,
        b: Idx3d,
        a_to_b: W,
        b_to_a: W,
    ) -> GraphResult<()> {
        self.check_mutable()?;
        Self::check_capacity(a_to_b)?;
        Self::check_capacity(b_to_a)?;
        let (ia, ib) = (self.array_index(a)?, self.array_index(b)?);
        let forward = capacity_slot(a, b)?;
        let backward = capacity_slot(b, a)?;
        self.caps.set(forward, ia, a_to_b);
        self.caps.set(backward, ib, b_to_a);
        Ok(())
    }

    /// 容量矩阵第 `slot` 个数组中 `pos` 处的值. 求解后容量矩阵已被取走.
    ///
    /// `slot` 不小于 `CAPACITY_SLOTS` 时返回 `InvalidSlot`.
    pub fn capacity(&self, slot: usize, pos: Idx3d) -> GraphResult<W> {
        self.check_mutable()?;
        if slot >= CAPACITY_SLOTS {
            return Err(GraphError::InvalidSlot(slot));
        }
        let i = self.array_index(pos)?;
        Ok(self.caps.get(slot, i))
    }

    /// 把容量矩阵一次性提交给引擎并计算最小割. 只能调用一次.
    pub fn solve(&mut self) -> GraphResult<()> {
        self.check_mutable()?;
        let since = Instant::now();
        let caps = mem::take(&mut self.caps);
        self.engine.set_caps(&caps)?;
        drop(caps);
        self.engine.compute_maxflow();
        self.solved = true;
        log::info!(
            "solved {:?} in {:?}, max flow {}",
            self.shape,
            since.elapsed(),
            self.engine.flow()
        );
        Ok(())
    }

    /// `pos` 在最小割中所属的一侧.
    pub fn segmentation(&self, pos: Idx3d) -> GraphResult<Segment> {
        if !self.solved {
            return Err(GraphError::QueryBeforeSolve);
        }
        self.check_bounds(pos)?;
        Ok(self.engine.segment(self.engine.node_id(pos)))
    }

    /// 最大流 (最小割权重), 饱和转换为权重类型.
    pub fn max_flow(&self) -> GraphResult<W> {
        self.max_flow_f64().map(W::from_f64)
    }

    /// 以 `f64` 累加得到的最大流.
    pub fn max_flow_f64(&self) -> GraphResult<f64> {
        if self.solved {
            Ok(self.engine.flow())
        } else {
            Err(GraphError::QueryBeforeSolve)
        }
    }

    /// 在引擎的工作线程中执行 `op`.
    #[cfg(feature = "rayon")]
    pub fn install<R: Send, F: FnOnce() -> R + Send>(&self, op: F) -> R {
        self.engine.install(op)
    }
}
