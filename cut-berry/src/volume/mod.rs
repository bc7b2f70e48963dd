//! 体数据读写.
//!
//! nii 文件按 `[W, H, z]` 存储体素, 读入后统一转换为 `(z, H, W)` 标准布局,
//! 写出时再转换回去. npy 文件直接按 `(z, H, W)` 读写.

mod save;

pub use save::SliceWritePng;

use crate::error::{VolumeError, VolumeResult};
use crate::Idx3d;
use ndarray::{Array3, ArrayView3, ArrayViewMut3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};
use std::ops::{Index, IndexMut};
use std::path::Path;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// `path` 是否是 npy 文件.
pub fn is_npy<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("npy"))
}

/// 按 `data` 的形状生成最简 header, 体素间距为 1 mm.
///
/// nii 每一维最多 `u16::MAX` 个体素, 超出时返回 `DimensionOverflow`.
fn header_for(shape: Idx3d) -> VolumeResult<BoxedHeader> {
    let (z, h, w) = shape;
    let extent = |n: usize| u16::try_from(n).map_err(|_| VolumeError::DimensionOverflow(shape));
    let mut header = Box::<NiftiHeader>::default();
    header.dim = [3, extent(w)?, extent(h)?, extent(z)?, 1, 1, 1, 1];
    header.pixdim[1..4].fill(1.0);
    Ok(header)
}

macro_rules! impl_volume {
    ($($(#[$doc: meta])* $name: ident => $elem: ty),+) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone)]
            pub struct $name {
                header: BoxedHeader,
                data: Array3<$elem>,
            }

            impl $name {
                /// 打开 nii / nii.gz 文件.
                pub fn open<P: AsRef<Path>>(path: P) -> VolumeResult<Self> {
                    let path = path.as_ref();
                    let nifti = |source| VolumeError::Nifti {
                        path: path.to_path_buf(),
                        source,
                    };
                    let obj = ReaderOptions::new().read_file(path).map_err(nifti)?;
                    let header = Box::new(obj.header().clone());

                    // [W, H, z] -> [z, H, W].
                    let data = obj
                        .into_volume()
                        .into_ndarray::<$elem>()
                        .map_err(nifti)?
                        .permuted_axes([2, 1, 0].as_slice());
                    let data = data
                        .into_dimensionality::<ndarray::Ix3>()
                        .map_err(|_| VolumeError::Shape)?
                        .as_standard_layout()
                        .into_owned();

                    log::debug!("opened {} {:?}", path.display(), data.dim());
                    Ok(Self { header, data })
                }

                /// 打开 `(z, H, W)` 顺序的 npy 文件.
                pub fn open_npy<P: AsRef<Path>>(path: P) -> VolumeResult<Self> {
                    let path = path.as_ref();
                    let data: Array3<$elem> =
                        ndarray_npy::read_npy(path).map_err(|source| VolumeError::ReadNpy {
                            path: path.to_path_buf(),
                            source,
                        })?;
                    Self::from_array(data)
                }

                /// 按扩展名打开 npy 或 nii 文件.
                pub fn load<P: AsRef<Path>>(path: P) -> VolumeResult<Self> {
                    if is_npy(&path) {
                        Self::open_npy(path)
                    } else {
                        Self::open(path)
                    }
                }

                /// 以 `(z, H, W)` 数据直接创建, 体素间距为 1 mm.
                pub fn from_array(data: Array3<$elem>) -> VolumeResult<Self> {
                    Ok(Self {
                        header: header_for(data.dim())?,
                        data,
                    })
                }

                /// 以另一体数据的 header 为模板创建. 形状必须一致.
                pub fn with_header_of<H: AsRef<NiftiHeader>>(
                    template: &H,
                    data: Array3<$elem>,
                ) -> VolumeResult<Self> {
                    let header = Box::new(template.as_ref().clone());
                    let [_, w, h, z, ..] = header.dim;
                    if (z as usize, h as usize, w as usize) != data.dim() {
                        return Err(VolumeError::Shape);
                    }
                    Ok(Self { header, data })
                }

                /// 以 nii 格式写出. 文件名以 `.gz` 结尾时压缩.
                pub fn save<P: AsRef<Path>>(&self, path: P) -> VolumeResult<()> {
                    let path = path.as_ref();
                    WriterOptions::new(path)
                        .reference_header(&self.header)
                        .write_nifti(&self.data.view().permuted_axes([2, 1, 0]))
                        .map_err(|source| VolumeError::Nifti {
                            path: path.to_path_buf(),
                            source,
                        })
                }

                /// 以 `(z, H, W)` 顺序的 npy 格式写出.
                pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> VolumeResult<()> {
                    let path = path.as_ref();
                    ndarray_npy::write_npy(path, &self.data).map_err(|source| {
                        VolumeError::WriteNpy {
                            path: path.to_path_buf(),
                            source,
                        }
                    })
                }

                /// 按扩展名写出 npy 或 nii 文件.
                pub fn store<P: AsRef<Path>>(&self, path: P) -> VolumeResult<()> {
                    if is_npy(&path) {
                        self.save_npy(path)
                    } else {
                        self.save(path)
                    }
                }

                /// `(z, H, W)` 形状.
                #[inline]
                pub fn shape(&self) -> Idx3d {
                    self.data.dim()
                }

                /// 体素分辨率, 以毫米为单位, `[z, H, W]` 顺序.
                #[inline]
                pub fn pix_dim(&self) -> [f64; 3] {
                    let [_, w, h, z, ..] = self.header.pixdim;
                    [z as f64, h as f64, w as f64]
                }

                /// nii header.
                #[inline]
                pub fn header(&self) -> &NiftiHeader {
                    &self.header
                }

                /// 数据的不可变视图.
                #[inline]
                pub fn data(&self) -> ArrayView3<'_, $elem> {
                    self.data.view()
                }

                /// 数据的可变视图.
                #[inline]
                pub fn data_mut(&mut self) -> ArrayViewMut3<'_, $elem> {
                    self.data.view_mut()
                }

                /// 取出数据.
                pub fn into_array(self) -> Array3<$elem> {
                    self.data
                }
            }

            impl AsRef<NiftiHeader> for $name {
                fn as_ref(&self) -> &NiftiHeader {
                    &self.header
                }
            }

            impl Index<Idx3d> for $name {
                type Output = $elem;

                #[inline]
                fn index(&self, index: Idx3d) -> &Self::Output {
                    &self.data[index]
                }
            }

            impl IndexMut<Idx3d> for $name {
                #[inline]
                fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
                    &mut self.data[index]
                }
            }
        )+
    };
}

impl_volume!(
    /// 3D 扫描或 sheetness 等连续值体数据, 体素值以 `f32` 保存.
    ScanVolume => f32,
    /// 3D 标签或掩膜, 体素值以 `u8` 保存.
    LabelVolume => u8
);

impl LabelVolume {
    /// 转换为 `f32` 引导体数据, 用于忽略值判断.
    pub fn to_guide(&self) -> Array3<f32> {
        self.data.mapv(f32::from)
    }
}
