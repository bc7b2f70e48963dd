//! 亮度差高斯边界项.

use super::{check_shape, EnergyTerm, Seeds, Sigma};
use crate::consts::Segment;
use crate::error::GraphResult;
use crate::weight::Weight;
use crate::Idx3d;
use ndarray::ArrayView3;

/// `B(a, b) = scale * exp(-(I(a) - I(b))^2 / (2 sigma^2))`.
///
/// 亮度相近的邻居之间切割代价高, 差异大的邻居之间切割代价低. 结果关于 `a`, `b` 对称.
#[derive(Debug, Clone, Copy)]
pub struct Intensity<'a> {
    seeds: Seeds<'a>,
    image: ArrayView3<'a, f32>,
    sigma: Sigma,
}

impl<'a> Intensity<'a> {
    /// `image` 与 `seeds` 形状必须一致.
    pub fn new(seeds: Seeds<'a>, image: ArrayView3<'a, f32>, sigma: Sigma) -> GraphResult<Self> {
        check_shape(image.dim(), &seeds)?;
        Ok(Self {
            seeds,
            image,
            sigma,
        })
    }

    /// 噪声参数.
    pub fn sigma(&self) -> Sigma {
        self.sigma
    }
}

impl EnergyTerm for Intensity<'_> {
    fn shape(&self) -> Idx3d {
        self.image.dim()
    }

    #[inline]
    fn regional_term<W: Weight>(&self, pos: Idx3d, segment: Segment) -> W {
        self.seeds.regional_term(pos, segment)
    }

    #[inline]
    fn boundary_term<W: Weight>(&self, a: Idx3d, b: Idx3d) -> W {
        let difference = self.image[a] as f64 - self.image[b] as f64;
        W::from_f64(W::weight_scale() * self.sigma.gaussian(difference))
    }
}
