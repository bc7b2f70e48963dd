//! 水平切片的 png 预览.

use super::{LabelVolume, ScanVolume};
use crate::consts::gray::{is_marked, BLACK, WHITE};
use crate::error::{VolumeError, VolumeResult};
use image::{GrayImage, Luma};
use ndarray::{ArrayView2, Axis};
use std::path::Path;

/// 可以将第 `z` 层水平切片以 **可视化友好** 的方式保存为灰度图.
pub trait SliceWritePng {
    /// 将第 `z` 层切片保存到 `path`. `z` 越界时返回 `SliceOutOfRange`.
    fn save_slice_png<P: AsRef<Path>>(&self, z: usize, path: P) -> VolumeResult<()>;
}

fn check_slice(z: usize, depth: usize) -> VolumeResult<()> {
    if z < depth {
        Ok(())
    } else {
        Err(VolumeError::SliceOutOfRange { index: z, depth })
    }
}

fn write_gray<T: Copy, P: AsRef<Path>>(
    slice: ArrayView2<T>,
    path: P,
    f: impl Fn(T) -> u8,
) -> VolumeResult<()> {
    let (height, width) = slice.dim();
    let mut buf = GrayImage::new(width as u32, height as u32);
    for ((h, w), &pix) in slice.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, Luma([f(pix)]));
    }
    buf.save(path)?;
    Ok(())
}

/// 未标记的体素为黑色, 其余为白色.
impl SliceWritePng for LabelVolume {
    fn save_slice_png<P: AsRef<Path>>(&self, z: usize, path: P) -> VolumeResult<()> {
        check_slice(z, self.shape().0)?;
        let slice = self.data.index_axis(Axis(0), z);
        write_gray(slice, path, |p| if is_marked(p) { WHITE } else { BLACK })
    }
}

/// 按切片内的最小 / 最大值线性拉伸到 `[0, 255]`.
impl SliceWritePng for ScanVolume {
    fn save_slice_png<P: AsRef<Path>>(&self, z: usize, path: P) -> VolumeResult<()> {
        check_slice(z, self.shape().0)?;
        let slice = self.data.index_axis(Axis(0), z);
        let (lo, hi) = slice
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let span = if hi > lo { hi - lo } else { 1.0 };
        write_gray(slice, path, |v| {
            (((v - lo) / span).clamp(0.0, 1.0) * WHITE as f32).round() as u8
        })
    }
}
