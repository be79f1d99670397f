//! Surface renderers
//!
//! The plot generator only knows [`SurfaceRenderer`]. [`PlottersRenderer`]
//! draws with the `plotters` bitmap backend and a bundled font, so the bytes
//! it writes depend on nothing but the bundle and the resolution.
//!
//! plotters treats Y as the vertical axis in 3D, so pressure is drawn on Y
//! and depth runs along Z.

use std::path::Path;
use std::sync::OnceLock;

use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use thiserror::Error;

use crate::services::surface::{SurfaceBundle, PRESSURE_MAX, PRESSURE_MIN};

// Bitstream Vera license: assets/LICENSE-DejaVu.txt
static FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");
static FONT_REGISTERED: OnceLock<bool> = OnceLock::new();

const CAPTION: &str = "Soil hardness";

/// Canvas size in inches
const FIGURE_INCHES: (u32, u32) = (12, 8);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Surface has no data")]
    EmptySurface,

    #[error("Bundled font could not be loaded")]
    Font,

    #[error("Drawing failed: {0}")]
    Drawing(String),
}

fn drawing<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Drawing(e.to_string())
}

/// Anything that can turn a bundle into an image file
pub trait SurfaceRenderer {
    fn render(&self, bundle: &SurfaceBundle, out_path: &Path) -> Result<(), RenderError>;
}

/// PNG renderer: 12 x 8 inch canvas at the configured DPI
#[derive(Debug, Clone)]
pub struct PlottersRenderer {
    dpi: u32,
}

impl PlottersRenderer {
    pub fn new(dpi: u32) -> Self {
        Self { dpi: dpi.max(10) }
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (FIGURE_INCHES.0 * self.dpi, FIGURE_INCHES.1 * self.dpi)
    }

    /// Font size in pixels for a size given in points
    fn pt(&self, points: f64) -> f64 {
        points * self.dpi as f64 / 72.0
    }
}

fn ensure_font() -> Result<(), RenderError> {
    let ok = *FONT_REGISTERED
        .get_or_init(|| register_font("sans-serif", FontStyle::Normal, FONT_DATA).is_ok());
    if ok {
        Ok(())
    } else {
        Err(RenderError::Font)
    }
}

fn pressure_color(pressure: f64) -> RGBColor {
    ViridisRGB::get_color_normalized(
        pressure.clamp(PRESSURE_MIN, PRESSURE_MAX),
        PRESSURE_MIN,
        PRESSURE_MAX,
    )
}

impl SurfaceRenderer for PlottersRenderer {
    fn render(&self, bundle: &SurfaceBundle, out_path: &Path) -> Result<(), RenderError> {
        if bundle.is_empty() {
            return Err(RenderError::EmptySurface);
        }
        ensure_font()?;

        let (width, height) = self.canvas_size();
        let root = BitMapBackend::new(out_path, (width, height)).into_drawing_area();
        root.fill(&WHITE).map_err(drawing)?;

        let legend_width = width / 10;
        let (plot_area, legend_area) = root.split_horizontally(width - legend_width);

        self.draw_surface(&plot_area, bundle)?;
        self.draw_colorbar(&legend_area)?;

        root.present().map_err(drawing)?;
        Ok(())
    }
}

impl PlottersRenderer {
    fn draw_surface<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
        bundle: &SurfaceBundle,
    ) -> Result<(), RenderError> {
        let block_count = bundle.blocks.len();
        let x_max = (block_count.max(2) - 1) as f64;
        let depth_min = *bundle.depths.first().unwrap_or(&0) as f64;
        let depth_max = (*bundle.depths.last().unwrap_or(&1) as f64).max(depth_min + 1.0);

        let mut chart = ChartBuilder::on(area)
            .caption(CAPTION, ("sans-serif", self.pt(14.0)))
            .margin(self.pt(10.0) as u32)
            .build_cartesian_3d(0.0..x_max, PRESSURE_MIN..PRESSURE_MAX, depth_min..depth_max)
            .map_err(drawing)?;

        chart.with_projection(|mut pb| {
            pb.yaw = 0.6;
            pb.pitch = 0.25;
            pb.scale = 0.85;
            pb.into_matrix()
        });

        let block_label = |x: &f64| {
            let index = x.round();
            if (x - index).abs() < 1e-6 && index >= 0.0 && (index as usize) < block_count {
                bundle.blocks[index as usize].clone()
            } else {
                String::new()
            }
        };
        let depth_label = |z: &f64| format!("{:.0} cm", z);
        let pressure_label = |y: &f64| format!("{:.0}", y);

        chart
            .configure_axes()
            .label_style(("sans-serif", self.pt(9.0)))
            .x_labels(block_count.max(2))
            .x_formatter(&block_label)
            .y_formatter(&pressure_label)
            .z_formatter(&depth_label)
            .light_grid_style(BLACK.mix(0.1))
            .max_light_lines(2)
            .draw()
            .map_err(drawing)?;

        // One quad per grid cell whose four corners all hold a value
        let mut quads = Vec::new();
        for i in 0..block_count.saturating_sub(1) {
            for j in 0..bundle.depths.len().saturating_sub(1) {
                let corners = [(i, j), (i + 1, j), (i + 1, j + 1), (i, j + 1)];
                let values: Option<Vec<f64>> =
                    corners.iter().map(|&(b, d)| bundle.get(b, d)).collect();
                let Some(values) = values else {
                    continue;
                };

                let points: Vec<(f64, f64, f64)> = corners
                    .iter()
                    .zip(&values)
                    .map(|(&(b, d), &p)| (b as f64, p.clamp(PRESSURE_MIN, PRESSURE_MAX), bundle.depths[d] as f64))
                    .collect();
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                quads.push(Polygon::new(points, pressure_color(mean).mix(0.8).filled()));
            }
        }
        chart.draw_series(quads).map_err(drawing)?;

        // A single block has no area to fill; draw its profile instead
        if block_count == 1 {
            let profile: Vec<(f64, f64, f64)> = bundle
                .depths
                .iter()
                .enumerate()
                .filter_map(|(j, &d)| bundle.get(0, j).map(|p| (0.0, p, d as f64)))
                .collect();
            chart
                .draw_series(std::iter::once(PathElement::new(
                    profile,
                    pressure_color(PRESSURE_MAX / 2.0).stroke_width(2),
                )))
                .map_err(drawing)?;
        }

        Ok(())
    }

    fn draw_colorbar<DB: DrawingBackend>(
        &self,
        area: &DrawingArea<DB, plotters::coord::Shift>,
    ) -> Result<(), RenderError> {
        let mut chart = ChartBuilder::on(area)
            .margin_top(self.pt(60.0) as u32)
            .margin_bottom(self.pt(60.0) as u32)
            .margin_right(self.pt(10.0) as u32)
            .y_label_area_size(self.pt(40.0) as u32)
            .build_cartesian_2d(0.0..1.0, PRESSURE_MIN..PRESSURE_MAX)
            .map_err(drawing)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .disable_x_axis()
            .y_labels(7)
            .y_desc("kPa")
            .label_style(("sans-serif", self.pt(9.0)))
            .axis_desc_style(("sans-serif", self.pt(10.0)))
            .draw()
            .map_err(drawing)?;

        let steps = 100;
        let step = (PRESSURE_MAX - PRESSURE_MIN) / steps as f64;
        chart
            .draw_series((0..steps).map(|k| {
                let low = PRESSURE_MIN + k as f64 * step;
                Rectangle::new(
                    [(0.0, low), (1.0, low + step)],
                    pressure_color(low + step / 2.0).filled(),
                )
            }))
            .map_err(drawing)?;

        Ok(())
    }
}
