//! 容量矩阵.

use crate::consts::{CAPACITY_SLOTS, SINK_SLOT};
use crate::error::{GraphError, GraphResult};
use crate::weight::Weight;

/// 8 个平行的稠密数组, 每个体素在每个数组中占一项, 以平坦下标寻址.
///
/// 0: 源点 (前景) 终端容量, 默认 0.
/// 1: 汇点 (背景) 终端容量, 默认为类型最大值.
/// 2..=7: 到 -x, +x, -y, +y, -z, +z 方向邻居的容量, 默认 0.
#[derive(Debug, Clone)]
pub struct CapacityMatrix<W: Weight> {
    slots: Vec<Vec<W>>,
}

impl<W: Weight> Default for CapacityMatrix<W> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<W: Weight> CapacityMatrix<W> {
    /// 为 `len` 个体素分配容量矩阵.
    pub fn try_new(len: usize) -> GraphResult<Self> {
        let mut slots = Vec::with_capacity(CAPACITY_SLOTS);
        for slot in 0..CAPACITY_SLOTS {
            let init = if slot == SINK_SLOT {
                W::infinity()
            } else {
                W::zero()
            };
            let mut v = Vec::new();
            v.try_reserve_exact(len)
                .map_err(|_| GraphError::AllocationFailure(len))?;
            v.resize(len, init);
            slots.push(v);
        }
        Ok(Self { slots })
    }

    /// 体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.first().map_or(0, Vec::len)
    }

    /// 是否为空矩阵 (尚未分配, 或已被求解取走).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 第 `slot` 个数组中, 平坦下标 `flat` 处的容量.
    #[inline]
    pub fn get(&self, slot: usize, flat: usize) -> W {
        self.slots[slot][flat]
    }

    /// 覆盖写入第 `slot` 个数组中平坦下标 `flat` 处的容量.
    #[inline]
    pub fn set(&mut self, slot: usize, flat: usize, value: W) {
        self.slots[slot][flat] = value;
    }

    /// 第 `slot` 个数组.
    #[inline]
    pub fn slot(&self, slot: usize) -> &[W] {
        &self.slots[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::CapacityMatrix;

    #[test]
    fn test_defaults() {
        let caps = CapacityMatrix::<i8>::try_new(27).unwrap();
        assert_eq!(caps.len(), 27);
        assert!(caps.slot(0).iter().all(|&c| c == 0));
        assert!(caps.slot(1).iter().all(|&c| c == i8::MAX));
        for slot in 2..8 {
            assert!(caps.slot(slot).iter().all(|&c| c == 0));
        }
    }

    #[test]
    fn test_set_overwrites() {
        let mut caps = CapacityMatrix::<f32>::try_new(4).unwrap();
        caps.set(3, 2, 1.5);
        caps.set(3, 2, 0.25);
        assert_eq!(caps.get(3, 2), 0.25);
        assert_eq!(caps.get(3, 1), 0.0);
        assert!(CapacityMatrix::<u8>::default().is_empty());
    }
}
