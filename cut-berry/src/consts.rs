//! 通用常量.

/// 单通道标签值.
pub mod gray {
    /// 输出标签中, 背景的默认像素值.
    pub const DEFAULT_BACKGROUND: u8 = 0;

    /// 输出标签中, 前景的默认像素值.
    pub const DEFAULT_FOREGROUND: u8 = 1;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 掩膜体素是否被标记 (非零)?
    #[inline]
    pub const fn is_marked(p: u8) -> bool {
        p != 0
    }
}

/// 边界项高斯模型的默认噪声参数.
pub const DEFAULT_SIGMA: f64 = 0.1;

/// 最大流引擎默认的分块边长 (体素个数).
pub const DEFAULT_BLOCK_SIZE: usize = 100;

/// 6-邻域中, 每个体素的邻居个数.
pub const NEIGHBOURS: usize = 6;

/// 容量矩阵的数组个数: 源点 + 汇点 + 6 个方向.
pub const CAPACITY_SLOTS: usize = NEIGHBOURS + 2;

/// 容量矩阵中源点 (前景) 终端容量的下标.
pub const SOURCE_SLOT: usize = 0;

/// 容量矩阵中汇点 (背景) 终端容量的下标.
pub const SINK_SLOT: usize = 1;

/// 体素经最小割后所属的一侧.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    /// 源点一侧, 代表前景.
    Source,

    /// 汇点一侧, 代表背景.
    Sink,
}

impl Segment {
    /// 是否为前景.
    #[inline]
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Source)
    }

    /// 是否为背景.
    #[inline]
    pub fn is_background(&self) -> bool {
        !self.is_foreground()
    }

    /// 另一侧.
    #[inline]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Source => Self::Sink,
            Self::Sink => Self::Source,
        }
    }
}
