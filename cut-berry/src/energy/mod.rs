//! 能量项策略.
//!
//! 每个体素计算一次区域项 (T-link), 每对有序邻居计算一次边界项 (N-link).
//! 三种策略共用同一套基于种子的区域项, 区别只在边界项:
//!
//! | 策略 | 边界项 |
//! |---|---|
//! | [`HardLabel`] | 恒为 0 |
//! | [`Intensity`] | `scale * exp(-(I(a) - I(b))^2 / (2 sigma^2))` |
//! | [`DirectionalSheetness`] | 方向吻合时同上, 否则为 `scale` |
//!
//! 其中 `scale` 为 [`Weight::weight_scale`].

mod hard;
mod intensity;
mod sheetness;

pub use hard::HardLabel;
pub use intensity::Intensity;
pub use sheetness::DirectionalSheetness;

use crate::consts::{gray::is_marked, Segment, DEFAULT_SIGMA};
use crate::error::{GraphError, GraphResult};
use crate::weight::Weight;
use crate::Idx3d;
use ndarray::ArrayView3;
use ordered_float::NotNan;

/// 能量函数: 区域项与边界项.
pub trait EnergyTerm {
    /// 策略所需体数据的 `(z, h, w)` 形状.
    fn shape(&self) -> Idx3d;

    /// 将 `pos` 划入 `segment` 的反面所需付出的代价, 即 `segment` 一侧的终端容量.
    fn regional_term<W: Weight>(&self, pos: Idx3d, segment: Segment) -> W;

    /// 从 `a` 到 `b` 的 N-link 容量. 一般而言与 `(b, a)` 不同.
    fn boundary_term<W: Weight>(&self, a: Idx3d, b: Idx3d) -> W;
}

/// 硬约束种子.
#[derive(Debug, Clone, Copy)]
pub enum Seeds<'a> {
    /// 前景 / 背景掩膜, 非零体素为种子. 两者重叠时前景优先.
    Masks {
        /// 前景掩膜.
        foreground: ArrayView3<'a, u8>,
        /// 背景掩膜.
        background: ArrayView3<'a, u8>,
    },

    /// 标签体数据, 等于 `foreground` 的体素为前景种子, 等于 `background` 的为背景种子.
    Labels {
        /// 标签.
        labels: ArrayView3<'a, u8>,
        /// 前景标签值.
        foreground: u8,
        /// 背景标签值.
        background: u8,
    },
}

impl<'a> Seeds<'a> {
    /// 以前景 / 背景掩膜构造种子. 两个掩膜形状必须一致.
    pub fn masks(foreground: ArrayView3<'a, u8>, background: ArrayView3<'a, u8>) -> GraphResult<Self> {
        let (f, b) = (foreground.dim(), background.dim());
        if f != b {
            return Err(GraphError::ShapeMismatch(f, b));
        }
        Ok(Self::Masks {
            foreground,
            background,
        })
    }

    /// 以标签体数据及前景 / 背景标签值构造种子.
    pub fn labels(labels: ArrayView3<'a, u8>, foreground: u8, background: u8) -> Self {
        Self::Labels {
            labels,
            foreground,
            background,
        }
    }

    /// `(z, h, w)` 形状.
    pub fn shape(&self) -> Idx3d {
        match self {
            Self::Masks { foreground, .. } => foreground.dim(),
            Self::Labels { labels, .. } => labels.dim(),
        }
    }

    /// `pos` 被硬约束到的一侧. 不是种子时返回 `None`.
    #[inline]
    pub fn hard_segment(&self, pos: Idx3d) -> Option<Segment> {
        match self {
            Self::Masks {
                foreground,
                background,
            } => {
                if is_marked(foreground[pos]) {
                    Some(Segment::Source)
                } else if is_marked(background[pos]) {
                    Some(Segment::Sink)
                } else {
                    None
                }
            }
            Self::Labels {
                labels,
                foreground,
                background,
            } => {
                let p = labels[pos];
                if p == *foreground {
                    Some(Segment::Source)
                } else if p == *background {
                    Some(Segment::Sink)
                } else {
                    None
                }
            }
        }
    }

    /// 种子一侧取无穷大容量, 否则为 0.
    #[inline]
    pub fn regional_term<W: Weight>(&self, pos: Idx3d, segment: Segment) -> W {
        if self.hard_segment(pos) == Some(segment) {
            W::infinity()
        } else {
            W::zero()
        }
    }
}

/// 边界项高斯模型中的噪声参数, 有限且为正.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sigma(NotNan<f64>);

impl Sigma {
    /// 检查并构造. `sigma` 必须有限且大于 0.
    pub fn new(sigma: f64) -> GraphResult<Self> {
        if sigma.is_finite() && sigma > 0.0 {
            NotNan::new(sigma)
                .map(Self)
                .map_err(|_| GraphError::InvalidSigma(sigma))
        } else {
            Err(GraphError::InvalidSigma(sigma))
        }
    }

    /// 数值.
    #[inline]
    pub fn get(&self) -> f64 {
        self.0.into_inner()
    }

    /// 归一化的高斯边界强度 `exp(-d^2 / (2 sigma^2))`, 取值 `(0, 1]`.
    #[inline]
    pub fn gaussian(&self, difference: f64) -> f64 {
        let s = self.get();
        (-difference.powi(2) / (2.0 * s * s)).exp()
    }
}

impl Default for Sigma {
    fn default() -> Self {
        // 常量, 不会是 NaN.
        Self(NotNan::new(DEFAULT_SIGMA).unwrap())
    }
}

impl TryFrom<f64> for Sigma {
    type Error = GraphError;

    fn try_from(value: f64) -> GraphResult<Self> {
        Self::new(value)
    }
}

/// 期望的边界方向.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundaryDirection {
    /// 不区分方向.
    NoDirection,

    /// 边界处由亮到暗.
    #[default]
    BrightToDark,

    /// 边界处由暗到亮.
    DarkToBright,
}

impl BoundaryDirection {
    /// 命令行编码: 0 不区分, 1 亮到暗, 2 暗到亮. 其余值视为不区分.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::BrightToDark,
            2 => Self::DarkToBright,
            _ => Self::NoDirection,
        }
    }

    /// 命令行编码.
    pub fn code(&self) -> u8 {
        match self {
            Self::NoDirection => 0,
            Self::BrightToDark => 1,
            Self::DarkToBright => 2,
        }
    }

    /// 方向系数 `d`: 亮到暗 +1, 暗到亮 -1, 不区分 0.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Self::NoDirection => 0.0,
            Self::BrightToDark => 1.0,
            Self::DarkToBright => -1.0,
        }
    }

    /// `a -> b` 的亮度变化是否符合期望方向, 即 `d * (a - b) >= 0`.
    #[inline]
    pub fn admits(&self, a: f64, b: f64) -> bool {
        self.sign() * (a - b) >= 0.0
    }
}

/// 三种能量策略的统一表示.
#[derive(Debug, Clone, Copy)]
pub enum EnergyPolicy<'a> {
    /// 仅硬约束.
    HardLabel(HardLabel<'a>),
    /// 亮度差高斯边界项.
    Intensity(Intensity<'a>),
    /// 带方向的 sheetness 边界项.
    DirectionalSheetness(DirectionalSheetness<'a>),
}

impl EnergyPolicy<'_> {
    /// 策略名, 仅用于日志.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HardLabel(_) => "hard-label",
            Self::Intensity(_) => "intensity",
            Self::DirectionalSheetness(_) => "directional-sheetness",
        }
    }
}

impl<'a> From<HardLabel<'a>> for EnergyPolicy<'a> {
    fn from(p: HardLabel<'a>) -> Self {
        Self::HardLabel(p)
    }
}

impl<'a> From<Intensity<'a>> for EnergyPolicy<'a> {
    fn from(p: Intensity<'a>) -> Self {
        Self::Intensity(p)
    }
}

impl<'a> From<DirectionalSheetness<'a>> for EnergyPolicy<'a> {
    fn from(p: DirectionalSheetness<'a>) -> Self {
        Self::DirectionalSheetness(p)
    }
}

impl EnergyTerm for EnergyPolicy<'_> {
    fn shape(&self) -> Idx3d {
        match self {
            Self::HardLabel(p) => p.shape(),
            Self::Intensity(p) => p.shape(),
            Self::DirectionalSheetness(p) => p.shape(),
        }
    }

    #[inline]
    fn regional_term<W: Weight>(&self, pos: Idx3d, segment: Segment) -> W {
        match self {
            Self::HardLabel(p) => p.regional_term(pos, segment),
            Self::Intensity(p) => p.regional_term(pos, segment),
            Self::DirectionalSheetness(p) => p.regional_term(pos, segment),
        }
    }

    #[inline]
    fn boundary_term<W: Weight>(&self, a: Idx3d, b: Idx3d) -> W {
        match self {
            Self::HardLabel(p) => p.boundary_term(a, b),
            Self::Intensity(p) => p.boundary_term(a, b),
            Self::DirectionalSheetness(p) => p.boundary_term(a, b),
        }
    }
}

/// 检查引导体数据与种子形状一致.
fn check_shape(image: Idx3d, seeds: &Seeds) -> GraphResult<()> {
    let s = seeds.shape();
    if image == s {
        Ok(())
    } else {
        Err(GraphError::ShapeMismatch(image, s))
    }
}

#[cfg(test)]
mod tests {
    use super::{BoundaryDirection, Seeds, Sigma};
    use crate::consts::Segment;
    use crate::error::GraphError;
    use ndarray::Array3;

    #[test]
    fn test_mask_seeds_foreground_wins() {
        let mut fg = Array3::<u8>::zeros((1, 1, 3));
        let mut bg = Array3::<u8>::zeros((1, 1, 3));
        fg[(0, 0, 0)] = 1;
        fg[(0, 0, 1)] = 255;
        bg[(0, 0, 1)] = 1;
        bg[(0, 0, 2)] = 7;
        let seeds = Seeds::masks(fg.view(), bg.view()).unwrap();
        assert_eq!(seeds.hard_segment((0, 0, 0)), Some(Segment::Source));
        assert_eq!(seeds.hard_segment((0, 0, 1)), Some(Segment::Source));
        assert_eq!(seeds.hard_segment((0, 0, 2)), Some(Segment::Sink));

        assert_eq!(seeds.regional_term::<i8>((0, 0, 0), Segment::Source), i8::MAX);
        assert_eq!(seeds.regional_term::<i8>((0, 0, 0), Segment::Sink), 0);
        assert_eq!(seeds.regional_term::<f32>((0, 0, 2), Segment::Sink), f32::MAX);
    }

    #[test]
    fn test_label_seeds() {
        let labels = Array3::from_shape_vec((1, 1, 4), vec![1u8, 2, 3, 0]).unwrap();
        let seeds = Seeds::labels(labels.view(), 1, 2);
        assert_eq!(seeds.hard_segment((0, 0, 0)), Some(Segment::Source));
        assert_eq!(seeds.hard_segment((0, 0, 1)), Some(Segment::Sink));
        assert_eq!(seeds.hard_segment((0, 0, 2)), None);
        assert_eq!(seeds.hard_segment((0, 0, 3)), None);
        assert_eq!(seeds.regional_term::<u8>((0, 0, 2), Segment::Source), 0);
        assert_eq!(seeds.regional_term::<u8>((0, 0, 2), Segment::Sink), 0);
    }

    #[test]
    fn test_mask_shapes_must_agree() {
        let fg = Array3::<u8>::zeros((2, 2, 2));
        let bg = Array3::<u8>::zeros((2, 2, 3));
        assert_eq!(
            Seeds::masks(fg.view(), bg.view()).err(),
            Some(GraphError::ShapeMismatch((2, 2, 2), (2, 2, 3)))
        );
    }

    #[test]
    fn test_sigma() {
        assert_eq!(Sigma::default().get(), 0.1);
        assert_eq!(Sigma::new(0.0), Err(GraphError::InvalidSigma(0.0)));
        assert_eq!(Sigma::new(-2.0), Err(GraphError::InvalidSigma(-2.0)));
        assert!(Sigma::new(f64::NAN).is_err());
        assert!(Sigma::new(f64::INFINITY).is_err());

        let s = Sigma::new(50.0).unwrap();
        assert_eq!(s.gaussian(0.0), 1.0);
        assert!((s.gaussian(50.0) - (-0.5f64).exp()).abs() < 1e-12);
        assert!(s.gaussian(1000.0) < 1e-50);
    }

    #[test]
    fn test_boundary_direction() {
        for code in 0..3 {
            assert_eq!(BoundaryDirection::from_code(code).code(), code);
        }
        assert_eq!(BoundaryDirection::from_code(9), BoundaryDirection::NoDirection);

        let b2d = BoundaryDirection::BrightToDark;
        assert!(b2d.admits(2.0, 1.0));
        assert!(b2d.admits(1.0, 1.0));
        assert!(!b2d.admits(1.0, 2.0));

        let d2b = BoundaryDirection::DarkToBright;
        assert!(d2b.admits(1.0, 2.0));
        assert!(!d2b.admits(2.0, 1.0));

        assert!(BoundaryDirection::NoDirection.admits(1.0, 2.0));
        assert!(BoundaryDirection::NoDirection.admits(2.0, 1.0));
    }
}
