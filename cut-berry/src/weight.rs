//! 边权 (容量) 类型.
//!
//! 图的容量可以是有界整数, 也可以是浮点数. 所有与类型极值有关的常量
//! (例如边界项的缩放系数) 都在运行时由 [`Weight`] 的数值极限推导.

use crate::consts::NEIGHBOURS;
use num::{Bounded, NumCast, ToPrimitive, Zero};
use std::fmt::{Debug, Display};

/// 可作为图容量的数值类型.
pub trait Weight:
    Copy + PartialOrd + Debug + Display + Bounded + Zero + NumCast + Send + Sync + 'static
{
    /// 类型名, 仅用于日志.
    const NAME: &'static str;

    /// 类型在 `max` 附近可表示值的间距. 整数类型为 0.
    fn epsilon() -> f64;

    /// 硬约束使用的 "无穷大" 容量, 即类型最大值.
    #[inline]
    fn infinity() -> Self {
        Self::max_value()
    }

    /// 转换为 `f64`.
    #[inline]
    fn as_f64(self) -> f64 {
        ToPrimitive::to_f64(&self).unwrap_or(f64::NAN)
    }

    /// 从 `f64` 截断 (整数) 转换. 超出表示范围时取饱和值, NaN 取 0.
    fn from_f64(value: f64) -> Self;

    /// 边界项缩放系数 `(max - 1) / 6 - epsilon`.
    ///
    /// 保证 6 条满权重的边界项之和严格小于 [`Weight::infinity`],
    /// 因此任意软约束之和都不会压过硬约束.
    #[inline]
    fn weight_scale() -> f64 {
        let max = Self::max_value().as_f64();
        (max - 1.0) / NEIGHBOURS as f64 - Self::epsilon()
    }

    /// 是否为合法容量 (非负, 且不是 NaN).
    #[inline]
    fn is_valid_capacity(self) -> bool {
        self >= Self::zero()
    }
}

macro_rules! impl_int_weight {
    ($($t: ty),+) => {
        $(
            impl Weight for $t {
                const NAME: &'static str = stringify!($t);

                #[inline]
                fn epsilon() -> f64 {
                    0.0
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    // `as` 对浮点到整数的转换本身就是截断 + 饱和.
                    value as $t
                }
            }
        )+
    };
}

macro_rules! impl_float_weight {
    ($($t: ident),+) => {
        $(
            impl Weight for $t {
                const NAME: &'static str = stringify!($t);

                #[inline]
                fn epsilon() -> f64 {
                    $t::MAX as f64 * $t::EPSILON as f64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    if value.is_nan() {
                        0.0
                    } else {
                        value.clamp($t::MIN as f64, $t::MAX as f64) as $t
                    }
                }
            }
        )+
    };
}

impl_int_weight!(u8, i8, u16, i16, u32, i32);
impl_float_weight!(f32, f64);

#[cfg(test)]
mod tests {
    use super::Weight;

    fn assert_ordering<W: Weight>() {
        let scale = W::from_f64(W::weight_scale()).as_f64();
        assert!(scale > 0.0, "{}", W::NAME);
        assert!(6.0 * scale < W::infinity().as_f64(), "{}", W::NAME);
    }

    #[test]
    fn test_soft_sum_below_infinity() {
        assert_ordering::<u8>();
        assert_ordering::<i8>();
        assert_ordering::<u16>();
        assert_ordering::<i16>();
        assert_ordering::<u32>();
        assert_ordering::<i32>();
        assert_ordering::<f32>();
        assert_ordering::<f64>();
    }

    #[test]
    fn test_scale_values() {
        // (127 - 1) / 6 = 21
        assert_eq!(i8::from_f64(i8::weight_scale()), 21);
        // (255 - 1) / 6 = 42.33
        assert_eq!(u8::from_f64(u8::weight_scale()), 42);
        assert!(f32::from_f64(f32::weight_scale()) < f32::MAX / 6.0);
    }

    #[test]
    fn test_from_f64_saturates() {
        assert_eq!(u8::from_f64(-3.0), 0);
        assert_eq!(u8::from_f64(1e9), u8::MAX);
        assert_eq!(i8::from_f64(21.9), 21);
        assert_eq!(f32::from_f64(f64::MAX), f32::MAX);
        assert_eq!(f32::from_f64(f64::NAN), 0.0);
    }

    #[test]
    fn test_capacity_validity() {
        assert!(0i8.is_valid_capacity());
        assert!(!(-1i8).is_valid_capacity());
        assert!(!f32::NAN.is_valid_capacity());
        assert!(f32::MAX.is_valid_capacity());
    }
}
