//! 3D surface generation (C6)
//!
//! One image per ledger, named after the ledger and its sampling date, stored
//! under `<media>/land/` and referenced from the ledger's land. Rendering goes
//! to a `.partial.png` sibling that is renamed into place, so the final path
//! only ever holds a complete image.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::{ledgers, masters, measurements};
use crate::error::PlotError;
use crate::services::renderer::{PlottersRenderer, SurfaceRenderer};
use crate::services::surface::{build_surface, SurfaceBundle, SurfaceReduction};
use hardness_common::time;

/// Media subdirectory holding land images
pub const LAND_MEDIA_DIR: &str = "land";

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotRunSummary {
    pub generated: usize,
    pub errors: Vec<String>,
}

impl PlotRunSummary {
    pub fn display_string(&self) -> String {
        format!("{} plots generated, {} errors", self.generated, self.errors.len())
    }
}

/// File name of a ledger's surface image
pub fn plot_file_name(land_ledger_id: i64, sampling_date: &chrono::NaiveDate) -> String {
    format!(
        "soil_hardness_land_ledger_id_{}_{}_3d_surface.png",
        land_ledger_id,
        time::compact_date(sampling_date)
    )
}

pub struct PlotGenerator {
    pool: SqlitePool,
    media_dir: PathBuf,
    reduction: SurfaceReduction,
    renderer: Box<dyn SurfaceRenderer + Send + Sync>,
}

impl PlotGenerator {
    /// Generator using the default PNG renderer
    pub fn new(pool: SqlitePool, media_dir: PathBuf, reduction: SurfaceReduction, dpi: u32) -> Self {
        Self::with_renderer(pool, media_dir, reduction, Box::new(PlottersRenderer::new(dpi)))
    }

    pub fn with_renderer(
        pool: SqlitePool,
        media_dir: PathBuf,
        reduction: SurfaceReduction,
        renderer: Box<dyn SurfaceRenderer + Send + Sync>,
    ) -> Self {
        Self {
            pool,
            media_dir,
            reduction,
            renderer,
        }
    }

    /// Grid for a ledger, without rendering
    pub async fn surface_for_ledger(&self, land_ledger_id: i64) -> Result<SurfaceBundle, PlotError> {
        ledgers::load_ledger_context(&self.pool, land_ledger_id)
            .await?
            .ok_or(PlotError::LedgerNotFound(land_ledger_id))?;

        let rows = measurements::load_surface_rows(&self.pool, land_ledger_id).await?;
        if rows.is_empty() {
            return Err(PlotError::NoAssociatedData(land_ledger_id));
        }

        Ok(build_surface(&rows, self.reduction))
    }

    /// Render one ledger and attach the image to its land
    ///
    /// Returns the absolute path of the written image. Re-running replaces the
    /// previous image.
    pub async fn generate_for_ledger(&self, land_ledger_id: i64) -> Result<PathBuf, PlotError> {
        let context = ledgers::load_ledger_context(&self.pool, land_ledger_id)
            .await?
            .ok_or(PlotError::LedgerNotFound(land_ledger_id))?;
        let rows = measurements::load_surface_rows(&self.pool, land_ledger_id).await?;
        if rows.is_empty() {
            return Err(PlotError::NoAssociatedData(land_ledger_id));
        }
        let bundle = build_surface(&rows, self.reduction);
        debug!(
            "Ledger {}: {} blocks x {} depths, {} filled cells ({} reduction)",
            land_ledger_id,
            bundle.blocks.len(),
            bundle.depths.len(),
            bundle.filled_cells(),
            self.reduction
        );

        let file_name = plot_file_name(land_ledger_id, &context.ledger.sampling_date);
        let out_dir = self.media_dir.join(LAND_MEDIA_DIR);
        tokio::fs::create_dir_all(&out_dir).await?;

        let final_path = out_dir.join(&file_name);
        let partial_path = partial_path_for(&final_path);
        if let Err(e) = self.renderer.render(&bundle, &partial_path) {
            let _ = tokio::fs::remove_file(&partial_path).await;
            return Err(e.into());
        }
        tokio::fs::rename(&partial_path, &final_path).await?;

        let relative = format!("{}/{}", LAND_MEDIA_DIR, file_name);
        masters::set_land_image(&self.pool, context.ledger.land_id, &relative).await?;

        info!(
            "Ledger {}: surface written to {} (land '{}')",
            land_ledger_id,
            final_path.display(),
            context.land_name
        );
        Ok(final_path)
    }

    /// Render the given ledgers, or every ledger with bound rows when `None`
    ///
    /// A failing ledger is logged and counted; the batch continues.
    pub async fn generate_plots(&self, land_ledger_ids: Option<&[i64]>) -> Result<PlotRunSummary, PlotError> {
        let ids = match land_ledger_ids {
            Some(ids) => ids.to_vec(),
            None => measurements::associated_ledger_ids(&self.pool).await?,
        };

        let mut summary = PlotRunSummary::default();
        for id in ids {
            match self.generate_for_ledger(id).await {
                Ok(_) => summary.generated += 1,
                Err(e) => {
                    warn!("Plot for ledger {} failed: {}", id, e);
                    summary.errors.push(format!("ledger {}: {}", id, e));
                }
            }
        }

        info!("Plot run finished: {}", summary.display_string());
        Ok(summary)
    }
}

fn partial_path_for(final_path: &Path) -> PathBuf {
    let stem = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    final_path.with_file_name(format!("{}.partial.png", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_plot_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            plot_file_name(7, &date),
            "soil_hardness_land_ledger_id_7_20240115_3d_surface.png"
        );
    }

    #[test]
    fn test_partial_path_keeps_png_extension() {
        let path = Path::new("/media/land/a_3d_surface.png");
        assert_eq!(
            partial_path_for(path),
            PathBuf::from("/media/land/a_3d_surface.partial.png")
        );
    }
}
