//! 网格节点的分块编号.

use crate::error::{GraphError, GraphResult};
use crate::Idx3d;
use itertools::iproduct;

/// 将体数据切分为边长为 `tile` 的立方块, 按块优先、块内行优先的顺序为体素编号.
///
/// 同一块内的体素在引擎内部数组中连续存储. 体数据边缘处的块可能不完整.
#[derive(Debug, Clone)]
pub(crate) struct TileLayout {
    /// `(z, h, w)` 形状.
    shape: Idx3d,
    tile: usize,
    /// 平坦下标 -> 节点编号.
    node_of: Vec<u32>,
    /// 节点编号 -> 平坦下标.
    flat_of: Vec<u32>,
}

impl TileLayout {
    /// 为 `shape` 创建分块编号. `tile` 会被限制在 `[1, 最长边]` 内.
    pub fn new(shape: Idx3d, tile: usize) -> GraphResult<Self> {
        let (d, h, w) = shape;
        let len = d * h * w;
        if len > u32::MAX as usize {
            return Err(GraphError::AllocationFailure(len));
        }
        let tile = tile.clamp(1, d.max(h).max(w).max(1));

        let mut node_of = alloc(len)?;
        let mut flat_of = alloc(len)?;
        let mut next = 0u32;
        for (tz, th, tw) in iproduct!(
            (0..d).step_by(tile),
            (0..h).step_by(tile),
            (0..w).step_by(tile)
        ) {
            for (z, y, x) in iproduct!(
                tz..(tz + tile).min(d),
                th..(th + tile).min(h),
                tw..(tw + tile).min(w)
            ) {
                let flat = (z * h + y) * w + x;
                node_of[flat] = next;
                flat_of[next as usize] = flat as u32;
                next += 1;
            }
        }
        debug_assert_eq!(next as usize, len);

        Ok(Self {
            shape,
            tile,
            node_of,
            flat_of,
        })
    }

    /// 节点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.flat_of.len()
    }

    /// 单个完整块的体素个数.
    #[inline]
    pub fn tile_volume(&self) -> usize {
        self.tile.saturating_pow(3)
    }

    /// 平坦下标对应的节点编号.
    #[inline]
    pub fn node_of(&self, flat: usize) -> u32 {
        self.node_of[flat]
    }

    /// `(z, h, w)` 对应的节点编号. 不检查越界.
    #[inline]
    pub fn node_id(&self, (z, y, x): Idx3d) -> u32 {
        let (_, h, w) = self.shape;
        self.node_of[(z * h + y) * w + x]
    }

    /// 节点 `node` 在方向 `dir` 上的邻居. 方向编号与容量矩阵一致:
    /// 0/1 为 -x/+x, 2/3 为 -y/+y, 4/5 为 -z/+z. 越界时返回 `None`.
    #[inline]
    pub fn neighbour(&self, node: u32, dir: usize) -> Option<u32> {
        let (d, h, w) = self.shape;
        let flat = self.flat_of[node as usize] as usize;
        let (x, y, z) = (flat % w, (flat / w) % h, flat / (w * h));
        let target = match dir {
            0 => (x > 0).then(|| flat - 1),
            1 => (x + 1 < w).then(|| flat + 1),
            2 => (y > 0).then(|| flat - w),
            3 => (y + 1 < h).then(|| flat + w),
            4 => (z > 0).then(|| flat - w * h),
            5 => (z + 1 < d).then(|| flat + w * h),
            _ => None,
        }?;
        Some(self.node_of[target])
    }
}

fn alloc(len: usize) -> GraphResult<Vec<u32>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| GraphError::AllocationFailure(len))?;
    v.resize(len, 0);
    Ok(v)
}
