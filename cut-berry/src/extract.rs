//! 从已求解的网格图中读取分割结果.

use crate::cut::{BuildStats, CutParams};
use crate::error::{GraphError, GraphResult};
use crate::graph::GridGraph;
use crate::maxflow::MaxFlowEngine;
use crate::weight::Weight;
use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 分割结果: 输出标签, 最大流与建图计数.
#[derive(Debug, Clone)]
pub struct Segmentation<W: Weight> {
    labels: Array3<u8>,
    max_flow: W,
    stats: BuildStats,
}

impl<W: Weight> Segmentation<W> {
    pub(crate) fn new(labels: Array3<u8>, max_flow: W, stats: BuildStats) -> Self {
        Self {
            labels,
            max_flow,
            stats,
        }
    }

    /// `(z, h, w)` 顺序的输出标签.
    #[inline]
    pub fn labels(&self) -> &Array3<u8> {
        &self.labels
    }

    /// 取出输出标签.
    pub fn into_labels(self) -> Array3<u8> {
        self.labels
    }

    /// 最小割权重.
    #[inline]
    pub fn max_flow(&self) -> W {
        self.max_flow
    }

    /// 建图计数.
    #[inline]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// 值为 `label` 的体素个数.
    pub fn count(&self, label: u8) -> usize {
        self.labels.iter().filter(|&&p| p == label).count()
    }
}

/// 逐体素生成输出标签: 命中忽略值的体素为背景值, 其余按最小割所属一侧取前景或背景值.
///
/// 开启 `rayon` 时按 z 切片在引擎线程池中并行.
pub fn extract_labels<W: Weight, E: MaxFlowEngine>(
    graph: &GridGraph<W, E>,
    guide: ArrayView3<f32>,
    params: &CutParams,
) -> GraphResult<Array3<u8>> {
    if !graph.is_solved() {
        return Err(GraphError::QueryBeforeSolve);
    }
    if guide.dim() != graph.shape() {
        return Err(GraphError::ShapeMismatch(guide.dim(), graph.shape()));
    }

    let mut labels = Array3::from_elem(graph.shape(), params.background());
    let fill = |z: usize, mut out: ArrayViewMut2<u8>| -> GraphResult<()> {
        let slice = guide.index_axis(Axis(0), z);
        for ((y, x), p) in out.indexed_iter_mut() {
            if !params.is_ignored(slice[(y, x)]) {
                *p = params.label_of(graph.segmentation((z, y, x))?);
            }
        }
        Ok(())
    };

    #[cfg(feature = "rayon")]
    graph.install(|| {
        labels
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .try_for_each(|(z, out)| fill(z, out))
    })?;
    #[cfg(not(feature = "rayon"))]
    labels
        .axis_iter_mut(Axis(0))
        .enumerate()
        .try_for_each(|(z, out)| fill(z, out))?;

    Ok(labels)
}
