//! 分割结果报告.

use crate::WeightKind;
use cut_berry::prelude::*;
use ndarray::Array3;
use std::io::{self, Write};
use std::time::Duration;

/// 一次分割的统计.
#[derive(Debug, Clone)]
pub struct CutReport {
    mode: &'static str,
    weight: WeightKind,
    policy: &'static str,
    shape: Idx3d,
    foreground: usize,
    background: usize,
    max_flow: String,
    stats: BuildStats,
    elapsed: Duration,
}

impl CutReport {
    /// 按输出标签统计前景 / 背景体素数.
    pub fn new(
        mode: &'static str,
        weight: WeightKind,
        policy: &'static str,
        labels: &Array3<u8>,
        params: &CutParams,
    ) -> Self {
        let count = |v: u8| labels.iter().filter(|&&p| p == v).count();
        Self {
            mode,
            weight,
            policy,
            shape: labels.dim(),
            foreground: count(params.foreground()),
            background: count(params.background()),
            max_flow: String::new(),
            stats: BuildStats::default(),
            elapsed: Duration::ZERO,
        }
    }

    /// 记录最大流与建图计数.
    pub fn with_flow(mut self, max_flow: String, stats: BuildStats) -> Self {
        self.max_flow = max_flow;
        self.stats = stats;
        self
    }

    /// 记录总耗时.
    pub fn finish(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// 体素总数.
    #[inline]
    pub fn voxels(&self) -> usize {
        let (d, h, w) = self.shape;
        d * h * w
    }

    /// 命中忽略值的体素数.
    #[inline]
    pub fn ignored(&self) -> usize {
        self.stats.ignored
    }

    /// 将报告写进 `w` 中.
    fn describe_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        const S4: &str = "    ";

        #[inline]
        fn ratio(part: usize, total: usize) -> String {
            match total {
                0 => "/".to_string(),
                t => format!("{:.2}%", part as f64 * 100.0 / t as f64),
            }
        }

        let (d, h, w_) = self.shape;
        let n = self.voxels();
        writeln!(w, "Cut `{}` ({}, {:?} capacities):", self.mode, self.policy, self.weight)?;
        writeln!(w, "{S4}Volume: {w_}x{h}x{d} ({n} voxels)")?;
        writeln!(w, "{S4}Ignored voxels: {}", self.stats.ignored)?;
        writeln!(w, "{S4}Terminal links: {}", self.stats.terminal_links)?;
        writeln!(w, "{S4}Neighbour links: {}", self.stats.neighbour_links)?;
        writeln!(w, "{S4}Max flow: {}", self.max_flow)?;
        writeln!(
            w,
            "{S4}Foreground: {} ({})",
            self.foreground,
            ratio(self.foreground, n)
        )?;
        writeln!(
            w,
            "{S4}Background: {} ({})",
            self.background,
            ratio(self.background, n)
        )?;
        write!(w, "{S4}Total time: {} ms", self.elapsed.as_millis())?;
        Ok(())
    }

    /// 将报告连同上下分隔线写进 `w` 中.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        utils::sep_to(&mut w)?;
        self.describe_into(&mut w)?;
        writeln!(w)?;
        utils::sep_to(&mut w)
    }

    /// 打印报告.
    pub fn analyze(&self) {
        if let Err(e) = self.write_to(io::stdout().lock()) {
            log::warn!("failed to print report: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CutReport;
    use crate::WeightKind;
    use cut_berry::prelude::*;
    use ndarray::Array3;
    use std::time::Duration;

    #[test]
    fn test_describe() {
        let mut labels = Array3::<u8>::zeros((2, 2, 2));
        labels[(0, 0, 0)] = 1;
        labels[(1, 1, 1)] = 1;
        let report = CutReport::new(
            "labels",
            WeightKind::I8,
            "directional-sheetness",
            &labels,
            &CutParams::default(),
        )
        .with_flow("42".to_string(), BuildStats::default())
        .finish(Duration::from_millis(7));

        assert_eq!(report.voxels(), 8);
        let mut buf = Vec::new();
        report.describe_into(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Max flow: 42"));
        assert!(text.contains("Foreground: 2 (25.00%)"));
        assert!(text.contains("Background: 6 (75.00%)"));
        assert!(text.ends_with("7 ms"));

        let mut framed = Vec::new();
        report.write_to(&mut framed).unwrap();
        let framed = String::from_utf8(framed).unwrap();
        let lines: Vec<_> = framed.lines().collect();
        assert!(lines[0].starts_with("----"));
        assert_eq!(lines[0], *lines.last().unwrap());
        assert_eq!(lines[1], "Cut `labels` (directional-sheetness, I8 capacities):");
    }
}
