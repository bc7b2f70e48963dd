//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;

pub use crate::consts::gray::{DEFAULT_BACKGROUND, DEFAULT_FOREGROUND};
pub use crate::consts::{Segment, DEFAULT_BLOCK_SIZE, DEFAULT_SIGMA};

pub use crate::cut::{BuildStats, CutParams, GraphCutFilter};
pub use crate::energy::{
    BoundaryDirection, DirectionalSheetness, EnergyPolicy, EnergyTerm, HardLabel, Intensity, Seeds,
    Sigma,
};
pub use crate::error::{GraphError, GraphResult, VolumeError, VolumeResult};
pub use crate::extract::Segmentation;
pub use crate::graph::GridGraph;
pub use crate::volume::{LabelVolume, ScanVolume, SliceWritePng};
pub use crate::weight::Weight;
