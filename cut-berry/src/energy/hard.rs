//! 仅由种子决定的能量.

use super::{EnergyTerm, Seeds};
use crate::consts::Segment;
use crate::weight::Weight;
use crate::Idx3d;

/// 只有硬约束, 没有软代价: 边界项恒为 0.
#[derive(Debug, Clone, Copy)]
pub struct HardLabel<'a> {
    seeds: Seeds<'a>,
}

impl<'a> HardLabel<'a> {
    /// 以种子构造.
    pub fn new(seeds: Seeds<'a>) -> Self {
        Self { seeds }
    }

    /// 种子.
    pub fn seeds(&self) -> &Seeds<'a> {
        &self.seeds
    }
}

impl EnergyTerm for HardLabel<'_> {
    fn shape(&self) -> Idx3d {
        self.seeds.shape()
    }

    #[inline]
    fn regional_term<W: Weight>(&self, pos: Idx3d, segment: Segment) -> W {
        self.seeds.regional_term(pos, segment)
    }

    #[inline]
    fn boundary_term<W: Weight>(&self, _a: Idx3d, _b: Idx3d) -> W {
        W::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::HardLabel;
    use crate::consts::Segment;
    use crate::energy::{EnergyTerm, Seeds};
    use ndarray::Array3;

    #[test]
    fn test_hard_label_terms() {
        let labels = Array3::from_shape_vec((1, 2, 2), vec![1u8, 0, 0, 9]).unwrap();
        let policy = HardLabel::new(Seeds::labels(labels.view(), 1, 0));
        assert_eq!(policy.shape(), (1, 2, 2));
        assert_eq!(policy.regional_term::<u16>((0, 0, 0), Segment::Source), u16::MAX);
        assert_eq!(policy.regional_term::<u16>((0, 0, 1), Segment::Sink), u16::MAX);
        assert_eq!(policy.regional_term::<u16>((0, 1, 1), Segment::Source), 0);
        assert_eq!(policy.regional_term::<u16>((0, 1, 1), Segment::Sink), 0);
        assert_eq!(policy.boundary_term::<u16>((0, 0, 0), (0, 0, 1)), 0);
    }
}
