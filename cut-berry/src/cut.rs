//! 遍历体数据, 构建网格图并求解.

use crate::consts::gray::{DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
use crate::consts::{Segment, DEFAULT_BLOCK_SIZE};
use crate::energy::EnergyTerm;
use crate::error::{GraphError, GraphResult};
use crate::extract::{extract_labels, Segmentation};
use crate::graph::GridGraph;
use crate::weight::Weight;
use crate::Idx3d;
use ndarray::ArrayView3;
use std::time::Instant;

/// 分割参数.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CutParams {
    foreground: u8,
    background: u8,
    ignore: Option<f32>,
    parallelism: usize,
    block_size: usize,
}

impl Default for CutParams {
    fn default() -> Self {
        Self {
            foreground: DEFAULT_FOREGROUND,
            background: DEFAULT_BACKGROUND,
            ignore: Some(0.0),
            parallelism: default_parallelism(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        fn default_parallelism() -> usize {
            rayon::current_num_threads()
        }
    } else {
        fn default_parallelism() -> usize {
            1
        }
    }
}

impl CutParams {
    /// 输出中前景体素的值.
    pub fn with_foreground(mut self, value: u8) -> Self {
        self.foreground = value;
        self
    }

    /// 输出中背景体素的值.
    pub fn with_background(mut self, value: u8) -> Self {
        self.background = value;
        self
    }

    /// 引导体数据中等于 `value` 的体素直接判为背景. `None` 表示不忽略任何体素.
    pub fn with_ignore(mut self, value: Option<f32>) -> Self {
        self.ignore = value;
        self
    }

    /// 最大流引擎的工作线程数, 至少为 1.
    pub fn with_parallelism(mut self, n: usize) -> Self {
        self.parallelism = n.max(1);
        self
    }

    /// 最大流引擎的分块边长.
    pub fn with_block_size(mut self, n: usize) -> Self {
        self.block_size = n.max(1);
        self
    }

    /// 输出前景值.
    #[inline]
    pub fn foreground(&self) -> u8 {
        self.foreground
    }

    /// 输出背景值.
    #[inline]
    pub fn background(&self) -> u8 {
        self.background
    }

    /// 忽略值.
    #[inline]
    pub fn ignore(&self) -> Option<f32> {
        self.ignore
    }

    /// 工作线程数.
    #[inline]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// 分块边长.
    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// 引导体素值是否命中忽略值.
    #[inline]
    pub fn is_ignored(&self, value: f32) -> bool {
        self.ignore == Some(value)
    }

    /// 分割结果对应的输出值.
    #[inline]
    pub fn label_of(&self, segment: Segment) -> u8 {
        match segment {
            Segment::Source => self.foreground,
            Segment::Sink => self.background,
        }
    }
}

/// 建图过程的计数.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuildStats {
    /// 命中忽略值, 直接连到汇点的体素数.
    pub ignored: usize,
    /// 按能量函数写入 T-link 的体素数.
    pub terminal_links: usize,
    /// 写入的 N-link (双向边对) 数.
    pub neighbour_links: usize,
}

/// 三个正向邻居: +x, +y, +z. 超出体数据的返回 `None`.
#[inline]
fn forward_neighbours((z, y, x): Idx3d, (d, h, w): Idx3d) -> [Option<Idx3d>; 3] {
    [
        (x + 1 < w).then_some((z, y, x + 1)),
        (y + 1 < h).then_some((z, y + 1, x)),
        (z + 1 < d).then_some((z + 1, y, x)),
    ]
}

/// 基于能量策略的二值图割分割.
#[derive(Debug, Clone, Default)]
pub struct GraphCutFilter {
    params: CutParams,
}

impl GraphCutFilter {
    /// 以 `params` 创建.
    pub fn new(params: CutParams) -> Self {
        Self { params }
    }

    /// 分割参数.
    pub fn params(&self) -> &CutParams {
        &self.params
    }

    /// 按光栅顺序遍历 `guide`, 用 `policy` 计算容量并写入新建的网格图.
    ///
    /// 命中忽略值的体素硬连到背景, 不再计算区域项, 也不写它的正向 N-link.
    /// 其余体素写入 T-link, 并与 +x, +y, +z 方向上存在的邻居写入双向 N-link.
    pub fn build<W: Weight, P: EnergyTerm>(
        &self,
        guide: ArrayView3<f32>,
        policy: &P,
    ) -> GraphResult<(GridGraph<W>, BuildStats)> {
        let shape = guide.dim();
        if shape != policy.shape() {
            return Err(GraphError::ShapeMismatch(shape, policy.shape()));
        }
        let mut graph =
            GridGraph::<W>::with_shape(shape, self.params.parallelism, self.params.block_size)?;
        let mut stats = BuildStats::default();

        for (pos, &value) in guide.indexed_iter() {
            if self.params.is_ignored(value) {
                graph.add_terminal_edge(pos, W::zero(), W::infinity())?;
                stats.ignored += 1;
                continue;
            }

            let fg = policy.regional_term(pos, Segment::Source);
            let bg = policy.regional_term(pos, Segment::Sink);
            graph.add_terminal_edge(pos, fg, bg)?;
            stats.terminal_links += 1;

            for next in forward_neighbours(pos, shape).into_iter().flatten() {
                let forward = policy.boundary_term(pos, next);
                let backward = policy.boundary_term(next, pos);
                graph.add_neighbour_edge(pos, next, forward, backward)?;
                stats.neighbour_links += 1;
            }
        }

        log::debug!("graph built: {stats:?}");
        Ok((graph, stats))
    }

    /// 建图, 求解, 并生成输出标签.
    pub fn segment<W: Weight, P: EnergyTerm>(
        &self,
        guide: ArrayView3<f32>,
        policy: &P,
    ) -> GraphResult<Segmentation<W>> {
        let since = Instant::now();
        let (mut graph, stats) = self.build::<W, P>(guide, policy)?;
        graph.solve()?;
        let labels = extract_labels(&graph, guide, &self.params)?;
        let max_flow = graph.max_flow()?;
        log::info!("segmentation finished in {:?}", since.elapsed());
        Ok(Segmentation::new(labels, max_flow, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::{forward_neighbours, CutParams, GraphCutFilter};
    use crate::energy::{BoundaryDirection, DirectionalSheetness, EnergyPolicy, HardLabel};
    use crate::energy::{Intensity, Seeds, Sigma};
    use crate::error::GraphError;
    use crate::weight::Weight;
    use itertools::iproduct;
    use ndarray::Array3;

    const FG: u8 = 1;
    const BG: u8 = 2;

    fn filter() -> GraphCutFilter {
        GraphCutFilter::new(
            CutParams::default()
                .with_foreground(FG)
                .with_background(BG)
                .with_parallelism(2),
        )
    }

    fn as_guide(labels: &Array3<u8>) -> Array3<f32> {
        labels.mapv(f32::from)
    }

    #[test]
    fn test_forward_neighbours() {
        let shape = (3, 3, 3);
        assert_eq!(
            forward_neighbours((0, 0, 0), shape),
            [Some((0, 0, 1)), Some((0, 1, 0)), Some((1, 0, 0))]
        );
        assert_eq!(forward_neighbours((2, 2, 2), shape), [None, None, None]);
        let visits: usize = iproduct!(0..3, 0..3, 0..3)
            .map(|p| forward_neighbours(p, shape).iter().flatten().count())
            .sum();
        assert_eq!(visits, 54);
    }

    #[test]
    fn test_params() {
        let p = CutParams::default();
        assert_eq!(p.foreground(), 1);
        assert_eq!(p.background(), 0);
        assert_eq!(p.ignore(), Some(0.0));
        assert_eq!(p.block_size(), 100);
        assert!(p.parallelism() >= 1);
        assert!(p.is_ignored(0.0));
        assert!(!p.with_ignore(None).is_ignored(0.0));
        assert_eq!(p.with_parallelism(0).parallelism(), 1);
    }

    #[test]
    fn test_hard_corners_cut_scaled_links() {
        // 两个角点为背景种子, 其余全为前景种子, sheetness 处处相同.
        let mut labels = Array3::from_elem((3, 3, 3), FG);
        labels[(0, 0, 0)] = BG;
        labels[(2, 2, 2)] = BG;
        let sheetness = Array3::<f32>::zeros((3, 3, 3));
        let guide = as_guide(&labels);
        let policy = DirectionalSheetness::new(
            Seeds::labels(labels.view(), FG, BG),
            sheetness.view(),
            Sigma::default(),
            BoundaryDirection::BrightToDark,
        )
        .unwrap();

        let res = filter().segment::<i8, _>(guide.view(), &policy).unwrap();
        // 每个角点有 3 条 N-link.
        assert_eq!(res.max_flow(), 6 * 21);
        assert_eq!(res.stats().ignored, 0);
        assert_eq!(res.stats().neighbour_links, 54);
        for p in iproduct!(0..3, 0..3, 0..3) {
            let expected = if p == (0, 0, 0) || p == (2, 2, 2) { BG } else { FG };
            assert_eq!(res.labels()[p], expected, "{p:?}");
        }
        assert_eq!(res.count(BG), 2);
        assert_eq!(res.count(FG), 25);

        let res = filter().segment::<u8, _>(guide.view(), &policy).unwrap();
        assert_eq!(res.max_flow(), 6 * 42);
    }

    #[test]
    fn test_bright_to_dark_neighbours() {
        let unlabeled = FG + BG;
        let mut labels = Array3::from_elem((3, 3, 3), unlabeled);
        labels[(0, 0, 0)] = BG;
        labels[(2, 2, 2)] = FG;
        let mut sheetness = Array3::<f32>::zeros((3, 3, 3));
        sheetness[(2, 2, 2)] = 50.0;
        sheetness[(2, 2, 1)] = 50.0;
        sheetness[(2, 2, 0)] = 100.0;
        let guide = as_guide(&labels);
        let policy = DirectionalSheetness::new(
            Seeds::labels(labels.view(), FG, BG),
            sheetness.view(),
            Sigma::default(),
            BoundaryDirection::BrightToDark,
        )
        .unwrap();

        // 由暗到亮的边保持强连接, 由亮到暗的边几乎免费切断.
        let res = filter().segment::<i8, _>(guide.view(), &policy).unwrap();
        assert_eq!(res.max_flow(), 0);
        for p in iproduct!(0..3, 0..3, 0..3) {
            let expected = match p {
                (2, 2, _) => FG,
                _ => BG,
            };
            assert_eq!(res.labels()[p], expected, "{p:?}");
        }
    }

    #[test]
    fn test_against_direction_cuts_at_scale() {
        // 前景种子紧邻背景种子, 两者之间只有一条需要割断的边.
        let labels = Array3::from_shape_vec((1, 1, 2), vec![FG, BG]).unwrap();
        let guide = as_guide(&labels);
        let cut_of = |sheetness: [f32; 2], direction| {
            let sheetness = Array3::from_shape_vec((1, 1, 2), sheetness.to_vec()).unwrap();
            let policy = DirectionalSheetness::new(
                Seeds::labels(labels.view(), FG, BG),
                sheetness.view(),
                Sigma::default(),
                direction,
            )
            .unwrap();
            let i = filter().segment::<i8, _>(guide.view(), &policy).unwrap();
            let u = filter().segment::<u16, _>(guide.view(), &policy).unwrap();
            assert_eq!(i.labels().as_slice(), Some([FG, BG].as_slice()));
            assert_eq!(u.labels().as_slice(), Some([FG, BG].as_slice()));
            (i.max_flow(), u.max_flow())
        };

        // 由暗到亮, 与期望方向相反: 固定为缩放后的 1.
        let scaled = (i8::from_f64(i8::weight_scale()), u16::from_f64(u16::weight_scale()));
        assert_eq!(scaled, (21, 10922));
        assert_eq!(cut_of([50.0, 100.0], BoundaryDirection::BrightToDark), scaled);
        assert_eq!(cut_of([100.0, 50.0], BoundaryDirection::DarkToBright), scaled);

        // 方向一致时按高斯权重, 差值远大于 sigma, 几乎免费切断.
        assert_eq!(cut_of([100.0, 50.0], BoundaryDirection::BrightToDark), (0, 0));
        // 不限方向, 亮度相同: 满权重.
        assert_eq!(cut_of([7.0, 7.0], BoundaryDirection::NoDirection), scaled);
    }

    #[test]
    fn test_ignored_voxels_are_background() {
        // 未标注体素值为 0, 与忽略值相同.
        let mut labels = Array3::<u8>::zeros((3, 3, 3));
        labels[(0, 0, 0)] = BG;
        labels[(2, 2, 2)] = FG;
        let guide = as_guide(&labels);
        let policy = HardLabel::new(Seeds::labels(labels.view(), FG, BG));

        let res = filter().segment::<i16, _>(guide.view(), &policy).unwrap();
        assert_eq!(res.max_flow(), 0);
        assert_eq!(res.stats().ignored, 25);
        assert_eq!(res.stats().terminal_links, 2);
        assert_eq!(res.count(FG), 1);
        assert_eq!(res.labels()[(2, 2, 2)], FG);

        // 不忽略时, 未标注体素同样默认为背景.
        let f = GraphCutFilter::new(filter().params().with_ignore(None));
        let res = f.segment::<i16, _>(guide.view(), &policy).unwrap();
        assert_eq!(res.stats().ignored, 0);
        assert_eq!(res.count(FG), 1);
    }

    #[test]
    fn test_masks_with_intensity() {
        // 左半亮, 右半暗. 两侧各放一个种子, 边界应落在亮度跳变处.
        let shape = (2, 3, 6);
        let image = Array3::from_shape_fn(shape, |(_, _, x)| if x < 3 { 1.0f32 } else { 0.5 });
        let mut fg = Array3::<u8>::zeros(shape);
        let mut bg = Array3::<u8>::zeros(shape);
        fg[(0, 1, 0)] = 1;
        bg[(1, 1, 5)] = 1;
        let policy: EnergyPolicy = Intensity::new(
            Seeds::masks(fg.view(), bg.view()).unwrap(),
            image.view(),
            Sigma::default(),
        )
        .unwrap()
        .into();

        let f = GraphCutFilter::new(CutParams::default().with_foreground(255));
        let res = f.segment::<f32, _>(image.view(), &policy).unwrap();
        for (pos, &v) in res.labels().indexed_iter() {
            assert_eq!(v, if pos.2 < 3 { 255 } else { 0 }, "{pos:?}");
        }
        assert!(res.max_flow() < f32::weight_scale() as f32);
    }

    #[test]
    fn test_shape_mismatch() {
        let labels = Array3::<u8>::zeros((2, 2, 2));
        let guide = Array3::<f32>::zeros((2, 2, 3));
        let policy = HardLabel::new(Seeds::labels(labels.view(), FG, BG));
        assert_eq!(
            filter().segment::<u8, _>(guide.view(), &policy).err(),
            Some(GraphError::ShapeMismatch((2, 2, 3), (2, 2, 2)))
        );
    }
}
