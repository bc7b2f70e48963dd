//! 带方向的 sheetness 边界项.

use super::{check_shape, BoundaryDirection, EnergyTerm, Seeds, Sigma};
use crate::consts::Segment;
use crate::error::GraphResult;
use crate::weight::Weight;
use crate::Idx3d;
use ndarray::ArrayView3;

/// 仅当 `a -> b` 的变化符合期望方向 `d`, 即 `d * (S(a) - S(b)) >= 0` 时,
/// 才使用高斯边界强度; 否则强度固定为 1. 两者都乘以 `scale`.
///
/// 因此 `B(a, b)` 与 `B(b, a)` 一般不同.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalSheetness<'a> {
    seeds: Seeds<'a>,
    sheetness: ArrayView3<'a, f32>,
    sigma: Sigma,
    direction: BoundaryDirection,
}

impl<'a> DirectionalSheetness<'a> {
    /// `sheetness` 与 `seeds` 形状必须一致.
    pub fn new(
        seeds: Seeds<'a>,
        sheetness: ArrayView3<'a, f32>,
        sigma: Sigma,
        direction: BoundaryDirection,
    ) -> GraphResult<Self> {
        check_shape(sheetness.dim(), &seeds)?;
        Ok(Self {
            seeds,
            sheetness,
            sigma,
            direction,
        })
    }

    /// 期望的边界方向.
    pub fn direction(&self) -> BoundaryDirection {
        self.direction
    }

    /// 噪声参数.
    pub fn sigma(&self) -> Sigma {
        self.sigma
    }
}

impl EnergyTerm for DirectionalSheetness<'_> {
    fn shape(&self) -> Idx3d {
        self.sheetness.dim()
    }

    #[inline]
    fn regional_term<W: Weight>(&self, pos: Idx3d, segment: Segment) -> W {
        self.seeds.regional_term(pos, segment)
    }

    #[inline]
    fn boundary_term<W: Weight>(&self, a: Idx3d, b: Idx3d) -> W {
        let (sa, sb) = (self.sheetness[a] as f64, self.sheetness[b] as f64);
        let strength = if self.direction.admits(sa, sb) {
            self.sigma.gaussian(sa - sb)
        } else {
            1.0
        };
        W::from_f64(W::weight_scale() * strength)
    }
}
