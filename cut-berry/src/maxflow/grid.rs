//! 6-邻域网格上的 Boykov-Kolmogorov 增广路算法.

use super::layout::TileLayout;
use super::{MaxFlowEngine, NodeId};
use crate::consts::{Segment, NEIGHBOURS, SINK_SLOT, SOURCE_SLOT};
use crate::error::{GraphError, GraphResult};
use crate::graph::CapacityMatrix;
use crate::weight::Weight;
use crate::Idx3d;
use std::collections::VecDeque;
use std::time::Instant;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};
        use rayon::{ThreadPool, ThreadPoolBuilder};
    }
}

/// 节点所在的搜索树.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Tree {
    Free,
    Source,
    Sink,
}

/// 节点在搜索树中的父节点.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Parent {
    /// 自由节点.
    None,

    /// 直接连接到终端.
    Terminal,

    /// 失去父节点, 等待收养.
    Orphan,

    /// 父节点是方向 `dir` 上的邻居.
    Edge(u8),
}

/// 方向 `dir` 的反方向.
#[inline]
const fn opposite(dir: usize) -> usize {
    dir ^ 1
}

/// 专用于 6-邻域网格的最大流引擎.
///
/// 节点按 [`TileLayout`] 分块编号. 残量以 `f64` 存储,
/// 因此有界整数权重的累加不会溢出权重类型.
pub struct GridMaxFlow {
    layout: TileLayout,

    /// `residual[p][dir]`: 边 `p -> neighbour(p, dir)` 的残量.
    residual: Vec<[f64; NEIGHBOURS]>,

    /// 正数为源点到节点的残量, 负数为节点到汇点的残量.
    terminal: Vec<f64>,

    tree: Vec<Tree>,
    parent: Vec<Parent>,
    stamp: Vec<u64>,
    dist: Vec<u32>,
    queued: Vec<bool>,

    active: VecDeque<NodeId>,
    orphans: VecDeque<NodeId>,
    time: u64,
    flow: f64,

    #[cfg(feature = "rayon")]
    pool: ThreadPool,
}

impl MaxFlowEngine for GridMaxFlow {
    fn with_shape(shape: Idx3d, parallelism: usize, block_size: usize) -> GraphResult<Self> {
        let layout = TileLayout::new(shape, block_size)?;
        let n = layout.len();

        #[cfg(feature = "rayon")]
        let pool = ThreadPoolBuilder::new()
            .num_threads(parallelism.max(1))
            .build()
            .map_err(|e| GraphError::ThreadPool(e.to_string()))?;
        #[cfg(not(feature = "rayon"))]
        let _ = parallelism;

        Ok(Self {
            layout,
            residual: filled(n, [0.0; NEIGHBOURS])?,
            terminal: filled(n, 0.0)?,
            tree: filled(n, Tree::Free)?,
            parent: filled(n, Parent::None)?,
            stamp: filled(n, 0)?,
            dist: filled(n, 0)?,
            queued: filled(n, false)?,
            active: VecDeque::new(),
            orphans: VecDeque::new(),
            time: 0,
            flow: 0.0,
            #[cfg(feature = "rayon")]
            pool,
        })
    }

    #[inline]
    fn node_id(&self, pos: Idx3d) -> NodeId {
        self.layout.node_id(pos)
    }

    fn set_caps<W: Weight>(&mut self, caps: &CapacityMatrix<W>) -> GraphResult<()> {
        debug_assert_eq!(caps.len(), self.layout.len());
        let mut sink = filled(caps.len(), 0.0)?;
        for flat in 0..caps.len() {
            let id = self.layout.node_of(flat) as usize;
            for (dir, r) in self.residual[id].iter_mut().enumerate() {
                *r = caps.get(dir + 2, flat).as_f64();
            }
            self.terminal[id] = caps.get(SOURCE_SLOT, flat).as_f64();
            sink[id] = caps.get(SINK_SLOT, flat).as_f64();
        }

        // 源点与汇点同时流经的部分直接计入总流量.
        self.flow = self.cancel_terminals(&sink);
        self.init_trees();
        Ok(())
    }

    fn compute_maxflow(&mut self) {
        let since = Instant::now();
        let mut paths = 0usize;
        while let Some(p) = self.next_active() {
            if let Some((s, dir)) = self.grow(p) {
                self.time += 1;
                paths += 1;
                self.augment(s, dir);
                self.adopt_orphans();

                // `p` 仍在树中时继续从它生长.
                if self.parent[p as usize] != Parent::None {
                    self.activate_front(p);
                }
            }
        }

        log::debug!(
            "max-flow: {paths} augmenting paths, flow {}, {:?}",
            self.flow,
            since.elapsed()
        );

        // 残量网络不再需要, 只保留节点归属.
        self.residual = Vec::new();
        self.terminal = Vec::new();
        self.stamp = Vec::new();
        self.dist = Vec::new();
        self.queued = Vec::new();
        self.parent = Vec::new();
    }

    #[inline]
    fn segment(&self, node: NodeId) -> Segment {
        match self.tree[node as usize] {
            Tree::Source => Segment::Source,
            Tree::Sink | Tree::Free => Segment::Sink,
        }
    }

    #[inline]
    fn flow(&self) -> f64 {
        self.flow
    }

    #[cfg(feature = "rayon")]
    fn install<R: Send, F: FnOnce() -> R + Send>(&self, op: F) -> R {
        self.pool.install(op)
    }
}

impl GridMaxFlow {
    /// `terminal` 中已存有源点容量; 将其与 `sink` 相减, 返回被抵消的流量.
    #[cfg(feature = "rayon")]
    fn cancel_terminals(&mut self, sink: &[f64]) -> f64 {
        let min_len = self.layout.tile_volume();
        let terminal = &mut self.terminal;
        self.pool.install(|| {
            terminal
                .par_iter_mut()
                .zip(sink)
                .with_min_len(min_len)
                .map(|(t, &s)| {
                    let both = t.min(s);
                    *t -= s;
                    both
                })
                .sum()
        })
    }

    /// `terminal` 中已存有源点容量; 将其与 `sink` 相减, 返回被抵消的流量.
    #[cfg(not(feature = "rayon"))]
    fn cancel_terminals(&mut self, sink: &[f64]) -> f64 {
        self.terminal
            .iter_mut()
            .zip(sink)
            .map(|(t, &s)| {
                let both = t.min(s);
                *t -= s;
                both
            })
            .sum()
    }

    /// 以终端残量非零的节点初始化两棵搜索树.
    fn init_trees(&mut self) {
        for id in 0..self.layout.len() {
            let r = self.terminal[id];
            let tree = if r > 0.0 {
                Tree::Source
            } else if r < 0.0 {
                Tree::Sink
            } else {
                continue;
            };
            self.tree[id] = tree;
            self.parent[id] = Parent::Terminal;
            self.stamp[id] = 0;
            self.dist[id] = 1;
            self.activate(id as NodeId);
        }
    }

    #[inline]
    fn activate(&mut self, p: NodeId) {
        if !self.queued[p as usize] {
            self.queued[p as usize] = true;
            self.active.push_back(p);
        }
    }

    #[inline]
    fn activate_front(&mut self, p: NodeId) {
        if !self.queued[p as usize] {
            self.queued[p as usize] = true;
            self.active.push_front(p);
        }
    }

    /// 取出下一个仍在树中的活跃节点.
    fn next_active(&mut self) -> Option<NodeId> {
        while let Some(p) = self.active.pop_front() {
            self.queued[p as usize] = false;
            if self.parent[p as usize] != Parent::None {
                return Some(p);
            }
        }
        None
    }

    #[inline]
    fn neighbour(&self, p: NodeId, dir: usize) -> Option<NodeId> {
        self.layout.neighbour(p, dir)
    }

    /// 父节点.
    #[inline]
    fn parent_of(&self, p: NodeId) -> Option<(usize, NodeId)> {
        match self.parent[p as usize] {
            Parent::Edge(dir) => {
                let dir = dir as usize;
                let Some(q) = self.neighbour(p, dir) else {
                    unreachable!("parent edge leaves the grid")
                };
                Some((dir, q))
            }
            _ => None,
        }
    }

    /// 树 `tree` 中, 节点 `p` 与其方向 `dir` 上的邻居 `q` 之间沿生长方向的残量.
    /// 源树沿 `p -> q`, 汇树沿 `q -> p`.
    #[inline]
    fn tree_cap(&self, tree: Tree, p: NodeId, q: NodeId, dir: usize) -> f64 {
        match tree {
            Tree::Source => self.residual[p as usize][dir],
            Tree::Sink => self.residual[q as usize][opposite(dir)],
            Tree::Free => 0.0,
        }
    }

    /// 从活跃节点 `p` 生长. 若两棵树相遇, 返回 `(源树节点, 指向汇树节点的方向)`.
    fn grow(&mut self, p: NodeId) -> Option<(NodeId, usize)> {
        let tree = self.tree[p as usize];
        let pi = p as usize;
        for dir in 0..NEIGHBOURS {
            let Some(q) = self.neighbour(p, dir) else {
                continue;
            };
            if self.tree_cap(tree, p, q, dir) <= 0.0 {
                continue;
            }
            let qi = q as usize;
            match self.tree[qi] {
                Tree::Free => {
                    self.tree[qi] = tree;
                    self.parent[qi] = Parent::Edge(opposite(dir) as u8);
                    self.stamp[qi] = self.stamp[pi];
                    self.dist[qi] = self.dist[pi] + 1;
                    self.activate(q);
                }
                t if t != tree => {
                    return Some(match tree {
                        Tree::Source => (p, dir),
                        _ => (q, opposite(dir)),
                    });
                }
                _ => {
                    // 让 `q` 挂到更短的路径上.
                    if self.stamp[qi] <= self.stamp[pi] && self.dist[qi] > self.dist[pi] {
                        self.parent[qi] = Parent::Edge(opposite(dir) as u8);
                        self.stamp[qi] = self.stamp[pi];
                        self.dist[qi] = self.dist[pi] + 1;
                    }
                }
            }
        }
        None
    }

    /// 沿 `源点 -> ... -> s -> t -> ... -> 汇点` 增广, 其中 `t` 为 `s` 在 `dir` 上的邻居.
    fn augment(&mut self, s: NodeId, dir: usize) {
        let Some(t) = self.neighbour(s, dir) else {
            unreachable!("bridge edge leaves the grid")
        };

        // 瓶颈.
        let mut bottleneck = self.residual[s as usize][dir];
        let mut i = s;
        while let Some((pd, j)) = self.parent_of(i) {
            bottleneck = bottleneck.min(self.residual[j as usize][opposite(pd)]);
            i = j;
        }
        bottleneck = bottleneck.min(self.terminal[i as usize]);
        let mut i = t;
        while let Some((pd, j)) = self.parent_of(i) {
            bottleneck = bottleneck.min(self.residual[i as usize][pd]);
            i = j;
        }
        bottleneck = bottleneck.min(-self.terminal[i as usize]);
        debug_assert!(bottleneck > 0.0);

        self.residual[s as usize][dir] -= bottleneck;
        self.residual[t as usize][opposite(dir)] += bottleneck;

        // 源树一侧.
        let mut i = s;
        while let Some((pd, j)) = self.parent_of(i) {
            self.residual[i as usize][pd] += bottleneck;
            let r = &mut self.residual[j as usize][opposite(pd)];
            *r -= bottleneck;
            if *r <= 0.0 {
                self.set_orphan(i);
            }
            i = j;
        }
        self.terminal[i as usize] -= bottleneck;
        if self.terminal[i as usize] <= 0.0 {
            self.set_orphan(i);
        }

        // 汇树一侧.
        let mut i = t;
        while let Some((pd, j)) = self.parent_of(i) {
            self.residual[j as usize][opposite(pd)] += bottleneck;
            let r = &mut self.residual[i as usize][pd];
            *r -= bottleneck;
            if *r <= 0.0 {
                self.set_orphan(i);
            }
            i = j;
        }
        self.terminal[i as usize] += bottleneck;
        if self.terminal[i as usize] >= 0.0 {
            self.set_orphan(i);
        }

        self.flow += bottleneck;
    }

    #[inline]
    fn set_orphan(&mut self, p: NodeId) {
        self.parent[p as usize] = Parent::Orphan;
        self.orphans.push_back(p);
    }

    fn adopt_orphans(&mut self) {
        while let Some(p) = self.orphans.pop_front() {
            self.adopt(p);
        }
    }

    /// 从 `q` 沿父节点走到终端的距离. 路径上出现孤儿时返回 `None`.
    /// 找到时顺便更新路径上的时间戳与距离.
    fn origin_distance(&mut self, q: NodeId) -> Option<u32> {
        let mut j = q;
        let mut d = 0u32;
        let total = loop {
            let ji = j as usize;
            if self.stamp[ji] == self.time {
                break d + self.dist[ji];
            }
            d += 1;
            match self.parent[ji] {
                Parent::Terminal => {
                    self.stamp[ji] = self.time;
                    self.dist[ji] = 1;
                    break d;
                }
                Parent::Edge(_) => {
                    let (_, next) = self.parent_of(j)?;
                    j = next;
                }
                Parent::Orphan | Parent::None => return None,
            }
        };

        let mut j = q;
        let mut d = total;
        while self.stamp[j as usize] != self.time {
            self.stamp[j as usize] = self.time;
            self.dist[j as usize] = d;
            d = d.saturating_sub(1);
            match self.parent_of(j) {
                Some((_, next)) => j = next,
                None => break,
            }
        }
        Some(total)
    }

    /// 为孤儿 `p` 寻找同一棵树中的新父节点; 找不到则将其释放为自由节点.
    fn adopt(&mut self, p: NodeId) {
        let pi = p as usize;
        let tree = self.tree[pi];

        let mut best: Option<(usize, u32)> = None;
        for dir in 0..NEIGHBOURS {
            let Some(q) = self.neighbour(p, dir) else {
                continue;
            };
            if self.tree[q as usize] != tree {
                continue;
            }
            // 父节点 `q` 到 `p` 的生长方向与 `p` 到 `q` 相反.
            if self.tree_cap(tree, q, p, opposite(dir)) <= 0.0 {
                continue;
            }
            if let Some(d) = self.origin_distance(q) {
                if best.map_or(true, |(_, bd)| d < bd) {
                    best = Some((dir, d));
                }
            }
        }

        if let Some((dir, d)) = best {
            self.parent[pi] = Parent::Edge(dir as u8);
            self.stamp[pi] = self.time;
            self.dist[pi] = d + 1;
            return;
        }

        for dir in 0..NEIGHBOURS {
            let Some(q) = self.neighbour(p, dir) else {
                continue;
            };
            let qi = q as usize;
            if self.tree[qi] != tree {
                continue;
            }
            if self.tree_cap(tree, q, p, opposite(dir)) > 0.0 {
                self.activate(q);
            }
            if self.parent[qi] == Parent::Edge(opposite(dir) as u8) {
                self.set_orphan(q);
            }
        }
        self.tree[pi] = Tree::Free;
        self.parent[pi] = Parent::None;
    }
}

/// 分配长度为 `len` 的数组, 失败时返回 `AllocationFailure`.
fn filled<T: Clone>(len: usize, value: T) -> GraphResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| GraphError::AllocationFailure(len))?;
    v.resize(len, value);
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::{GridMaxFlow, MaxFlowEngine};
    use crate::consts::Segment;
    use crate::graph::CapacityMatrix;
    use itertools::iproduct;

    /// 简单的线性同余发生器, 让测试可复现.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, modulo: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) % modulo
        }
    }

    /// `(z, h, w)` 形状下 `dir` 方向的邻居平坦下标.
    fn neighbour_flat((d, h, w): (usize, usize, usize), flat: usize, dir: usize) -> Option<usize> {
        let (x, y, z) = (flat % w, (flat / w) % h, flat / (w * h));
        match dir {
            0 => (x > 0).then(|| flat - 1),
            1 => (x + 1 < w).then(|| flat + 1),
            2 => (y > 0).then(|| flat - w),
            3 => (y + 1 < h).then(|| flat + w),
            4 => (z > 0).then(|| flat - w * h),
            5 => (z + 1 < d).then(|| flat + w * h),
            _ => None,
        }
    }

    /// 穷举所有划分得到的最小割.
    fn brute_force_min_cut(shape: (usize, usize, usize), caps: &CapacityMatrix<u8>) -> f64 {
        let n = caps.len();
        (0u32..(1 << n))
            .map(|mask| {
                let in_source = |v: usize| mask & (1 << v) != 0;
                let mut cut = 0.0;
                for v in 0..n {
                    if in_source(v) {
                        cut += caps.get(1, v) as f64;
                        for dir in 0..6 {
                            if let Some(u) = neighbour_flat(shape, v, dir) {
                                if !in_source(u) {
                                    cut += caps.get(dir + 2, v) as f64;
                                }
                            }
                        }
                    } else {
                        cut += caps.get(0, v) as f64;
                    }
                }
                cut
            })
            .fold(f64::INFINITY, f64::min)
    }

    fn random_caps(shape: (usize, usize, usize), rng: &mut Lcg) -> CapacityMatrix<u8> {
        let n = shape.0 * shape.1 * shape.2;
        let mut caps = CapacityMatrix::<u8>::try_new(n).unwrap();
        for v in 0..n {
            caps.set(0, v, rng.next(12) as u8);
            caps.set(1, v, rng.next(12) as u8);
            for slot in 2..8 {
                caps.set(slot, v, rng.next(8) as u8);
            }
        }
        caps
    }

    #[test]
    fn test_flow_equals_brute_force_min_cut() {
        let mut rng = Lcg(20240601);
        for shape in [(1, 2, 4), (2, 2, 2), (1, 3, 3), (2, 2, 3), (1, 1, 5)] {
            for block in [1, 2, 100] {
                let caps = random_caps(shape, &mut rng);
                let mut engine = GridMaxFlow::with_shape(shape, 2, block).unwrap();
                engine.set_caps(&caps).unwrap();
                engine.compute_maxflow();
                assert_eq!(engine.flow(), brute_force_min_cut(shape, &caps), "{shape:?}");
            }
        }
    }

    #[test]
    fn test_cut_partition_matches_flow() {
        // 求解得到的划分本身就是一个最小割.
        let mut rng = Lcg(7);
        let shape = (2, 3, 3);
        let caps = random_caps(shape, &mut rng);
        let mut engine = GridMaxFlow::with_shape(shape, 1, 2).unwrap();
        engine.set_caps(&caps).unwrap();
        engine.compute_maxflow();

        let (d, h, w) = shape;
        let side: Vec<bool> = iproduct!(0..d, 0..h, 0..w)
            .map(|p| engine.segment(engine.node_id(p)) == Segment::Source)
            .collect();
        let mut cut = 0.0;
        for v in 0..side.len() {
            if side[v] {
                cut += caps.get(1, v) as f64;
                for dir in 0..6 {
                    if let Some(u) = neighbour_flat(shape, v, dir) {
                        if !side[u] {
                            cut += caps.get(dir + 2, v) as f64;
                        }
                    }
                }
            } else {
                cut += caps.get(0, v) as f64;
            }
        }
        assert_eq!(cut, engine.flow());
    }
}
