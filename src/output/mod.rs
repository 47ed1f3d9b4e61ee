//! Output projections: ways to write a finished scene list (and its cut
//! points) out to formats other tools consume.
//!
//! `stats_csv` lives on [`crate::stats_manager::StatsManager`] itself
//! (`save_csv`/`load_csv`) since it operates on the per-frame metric cache
//! rather than the scene list; the rest of these projections all take a
//! `&[Scene]` and a sink.

pub mod edl;
pub mod html;
pub mod image_export;
pub mod otio;
pub mod qp;
pub mod scene_list_csv;

pub use edl::write_edl;
pub use html::{write_html_report, HtmlReportOptions};
pub use image_export::{
    encode_and_write, export_scene_images, render_filename, schedule_picks, ImageExportConfig, ImageFormat,
    ResizeSpec, ScheduledPick,
};
pub use otio::write_otio;
pub use qp::write_qp_file;
pub use scene_list_csv::{write_scene_list_csv, SceneListCsvOptions};
