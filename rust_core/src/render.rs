//! Diagnostic report for a promoted coupling matrix.
//!
//! Rendering is optional; the promoter only calls a renderer when one is
//! configured. The plotters heatmap needs the `plots` feature.

use crate::error::Result;
use crate::ising::IsingCouplings;
use crate::promotion::ModelKey;
use std::path::Path;

pub trait ReportRenderer: Send + Sync {
    fn render(&self, couplings: &IsingCouplings, key: &ModelKey, path: &Path) -> Result<()>;
}

/// Heatmap of the full-sum coupling matrix with zero entries left blank,
/// hidden indices first. Rows run top to bottom as in a matrix plot.
#[cfg(feature = "plots")]
#[derive(Debug, Clone)]
pub struct HeatmapRenderer {
    pub size: (u32, u32),
}

#[cfg(feature = "plots")]
impl Default for HeatmapRenderer {
    fn default() -> Self {
        Self { size: (800, 800) }
    }
}

#[cfg(feature = "plots")]
impl ReportRenderer for HeatmapRenderer {
    fn render(&self, couplings: &IsingCouplings, key: &ModelKey, path: &Path) -> Result<()> {
        self.draw(couplings, key, path)
            .map_err(|e| crate::error::Error::Render(e.to_string()))
    }
}

#[cfg(feature = "plots")]
impl HeatmapRenderer {
    fn draw(
        &self,
        couplings: &IsingCouplings,
        key: &ModelKey,
        path: &Path,
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        use plotters::prelude::*;

        let m = couplings.num_hidden;
        let n = couplings.num_visible;
        let size = (m + n) as f64;
        let w = &couplings.w_full;

        let (lo, hi) = w
            .iter()
            .filter(|&&v| v != 0.0)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let bound = lo.abs().max(hi.abs()).max(f64::MIN_POSITIVE);

        let root = SVGBackend::new(path, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let title = format!(
            "W matrix for RBM with {} spins and alpha = {}, with M = {}, N = {}, M+N = {}",
            key.nspins,
            key.alpha,
            m,
            n,
            m + n
        );
        let mut chart = ChartBuilder::on(&root)
            .margin(40)
            .caption(title, ("sans-serif", 16))
            .build_cartesian_2d(0f64..size, 0f64..size)?;

        // row i is drawn at the top-down position i
        chart.draw_series(w.indexed_iter().filter(|(_, &v)| v != 0.0).map(
            |((i, j), &v)| {
                let top = size - i as f64;
                Rectangle::new(
                    [(j as f64, top - 1.0), (j as f64 + 1.0, top)],
                    diverging(v / bound).filled(),
                )
            },
        ))?;

        // hidden / visible boundary
        let boundary = m as f64;
        chart.draw_series(LineSeries::new(
            vec![(boundary, 0.0), (boundary, size)],
            &BLACK.mix(0.4),
        ))?;
        chart.draw_series(LineSeries::new(
            vec![(0.0, size - boundary), (size, size - boundary)],
            &BLACK.mix(0.4),
        ))?;

        let style = ("sans-serif", 14).into_font().color(&BLACK);
        let x_ticks = [(0, "h_1"), (m.saturating_sub(1), "h_M"), (m + n - 1, "S_N")];
        for (idx, label) in x_ticks {
            let (px, py) = chart.backend_coord(&(idx as f64 + 0.5, 0.0));
            root.draw(&Text::new(label, (px - 8, py + 6), style.clone()))?;
        }
        let y_ticks = [(0, "h_1"), (m, "S_1"), (m + n - 1, "S_N")];
        for (idx, label) in y_ticks {
            let (px, py) = chart.backend_coord(&(0.0, size - idx as f64 - 0.5));
            root.draw(&Text::new(label, (px - 32, py - 7), style.clone()))?;
        }

        root.present()?;
        Ok(())
    }
}

/// Blue for negative, red for positive couplings; `t` in [-1, 1].
#[cfg(feature = "plots")]
fn diverging(t: f64) -> plotters::style::RGBColor {
    let t = t.clamp(-1.0, 1.0);
    let fade = |x: f64| (255.0 * (1.0 - x)).round() as u8;
    if t >= 0.0 {
        plotters::style::RGBColor(255, fade(t), fade(t))
    } else {
        plotters::style::RGBColor(fade(-t), fade(-t), 255)
    }
}
