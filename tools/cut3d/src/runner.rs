//! 程序运行函数.

use crate::report::CutReport;
use crate::{Cli, Mode, Options, WeightKind};
use cut_berry::prelude::*;
use ndarray::{Array3, ArrayView3};
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

/// `masks` 方式输出的前景值.
const MASK_FOREGROUND: u8 = 255;

/// `masks` 方式输出的背景值.
const MASK_BACKGROUND: u8 = 0;

/// 运行失败的原因.
#[derive(Debug, Error)]
pub enum RunError {
    /// 读写失败.
    #[error(transparent)]
    Volume(#[from] VolumeError),

    /// 建图或求解失败.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl Options {
    fn params(&self) -> CutParams {
        let threads = self.threads.unwrap_or_else(utils::threads_from_env_or_cpus);
        CutParams::default()
            .with_parallelism(threads)
            .with_block_size(self.block_size)
            .with_ignore((!self.no_ignore).then_some(self.ignore))
    }
}

/// 按 `kind` 选择容量类型, 分割并返回标签与最大流.
fn cut_with(
    kind: WeightKind,
    filter: &GraphCutFilter,
    guide: ArrayView3<f32>,
    policy: &EnergyPolicy,
) -> GraphResult<(Array3<u8>, String, BuildStats)> {
    fn go<W: Weight>(
        filter: &GraphCutFilter,
        guide: ArrayView3<f32>,
        policy: &EnergyPolicy,
    ) -> GraphResult<(Array3<u8>, String, BuildStats)> {
        let seg = filter.segment::<W, _>(guide, policy)?;
        let flow = seg.max_flow().to_string();
        let stats = *seg.stats();
        Ok((seg.into_labels(), flow, stats))
    }

    match kind {
        WeightKind::U8 => go::<u8>(filter, guide, policy),
        WeightKind::I8 => go::<i8>(filter, guide, policy),
        WeightKind::U16 => go::<u16>(filter, guide, policy),
        WeightKind::I32 => go::<i32>(filter, guide, policy),
        WeightKind::F32 => go::<f32>(filter, guide, policy),
    }
}

/// 写出结果, 并按需写出中间切片预览.
fn store(
    template: &ScanVolume,
    labels: Array3<u8>,
    output: &Path,
    preview: Option<&Path>,
) -> Result<(), RunError> {
    let out = LabelVolume::with_header_of(template, labels)?;
    out.store(output)?;
    log::info!("saved {}", output.display());

    if let Some(png) = preview {
        let z = out.shape().0 / 2;
        out.save_slice_png(z, png)?;
        log::info!("slice {z} previewed at {}", png.display());
    }
    Ok(())
}

/// 以前景 / 背景掩膜为种子分割.
fn run_masks(
    opts: &Options,
    image: &Path,
    foreground: &Path,
    background: &Path,
    output: &Path,
    sigma: f64,
    direction: u8,
) -> Result<CutReport, RunError> {
    let since = Instant::now();
    let image = ScanVolume::load(utils::expand_home(image))?;
    let fg = LabelVolume::load(utils::expand_home(foreground))?;
    let bg = LabelVolume::load(utils::expand_home(background))?;
    log::info!("image {:?} loaded in {:?}", image.shape(), since.elapsed());

    let params = opts
        .params()
        .with_foreground(MASK_FOREGROUND)
        .with_background(MASK_BACKGROUND);
    let seeds = Seeds::masks(fg.data(), bg.data())?;
    let direction = BoundaryDirection::from_code(direction);
    let policy: EnergyPolicy =
        DirectionalSheetness::new(seeds, image.data(), Sigma::new(sigma)?, direction)?.into();

    let filter = GraphCutFilter::new(params);
    let (labels, flow, stats) = cut_with(opts.weight, &filter, image.data(), &policy)?;
    let report = CutReport::new("masks", opts.weight, policy.name(), &labels, &params)
        .with_flow(flow, stats);
    store(&image, labels, &utils::expand_home(output), opts.preview.as_deref())?;
    Ok(report.finish(since.elapsed()))
}

/// 以标签体数据中的两个标签值为种子分割.
#[allow(clippy::too_many_arguments)]
fn run_labels(
    opts: &Options,
    sheetness: &Path,
    labels: &Path,
    output: &Path,
    sigma: f64,
    foreground: u8,
    background: u8,
    direction: u8,
) -> Result<CutReport, RunError> {
    let since = Instant::now();
    let sheetness = ScanVolume::load(utils::expand_home(sheetness))?;
    let seeds = LabelVolume::load(utils::expand_home(labels))?;
    log::info!("sheetness {:?} loaded in {:?}", sheetness.shape(), since.elapsed());

    let params = opts
        .params()
        .with_foreground(foreground)
        .with_background(background);
    let direction = BoundaryDirection::from_code(direction);
    let policy: EnergyPolicy = DirectionalSheetness::new(
        Seeds::labels(seeds.data(), foreground, background),
        sheetness.data(),
        Sigma::new(sigma)?,
        direction,
    )?
    .into();

    // 忽略值与种子标签比较: 未标注体素直接判为背景.
    let guide = seeds.to_guide();
    let filter = GraphCutFilter::new(params);
    let (out, flow, stats) = cut_with(opts.weight, &filter, guide.view(), &policy)?;
    let report = CutReport::new("labels", opts.weight, policy.name(), &out, &params)
        .with_flow(flow, stats);
    store(&sheetness, out, &utils::expand_home(output), opts.preview.as_deref())?;
    Ok(report.finish(since.elapsed()))
}

/// 实际运行.
pub fn run(cli: &Cli) -> Result<CutReport, RunError> {
    let opts = &cli.options;
    match &cli.command {
        Mode::Masks {
            image,
            foreground,
            background,
            output,
            sigma,
            direction,
        } => run_masks(opts, image, foreground, background, output, *sigma, *direction),
        Mode::Labels {
            sheetness,
            labels,
            output,
            sigma,
            foreground,
            background,
            direction,
        } => run_labels(
            opts,
            sheetness,
            labels,
            output,
            *sigma,
            *foreground,
            *background,
            *direction,
        ),
    }
}
