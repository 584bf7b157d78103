pub mod frame;
pub mod value_display;

pub use frame::ChartFrame;
pub use value_display::format_value_lines;

use tracing::{debug, info};

/// Consumer of chart frames (a chart widget, a terminal view, ...)
pub trait Renderer: Send + Sync {
    fn render(&self, frame: &ChartFrame);

    /// Latest-value text block; optional for renderers without one
    fn show_values(&self, _lines: &[String]) {}
}

/// Renderer that writes frames to the log
#[derive(Debug, Clone, Default)]
pub struct TracingRenderer {
    pub show_values: bool,
}

impl Renderer for TracingRenderer {
    fn render(&self, frame: &ChartFrame) {
        match (frame.time_labels.first(), frame.time_labels.last()) {
            (Some(first), Some(last)) => info!(
                "Chart: {} channels, {} points, {} .. {}",
                frame.series.len(),
                frame.len(),
                first,
                last
            ),
            _ => info!("Chart: {} channels, no data", frame.series.len()),
        }
    }

    fn show_values(&self, lines: &[String]) {
        if !self.show_values {
            return;
        }
        for line in lines {
            info!("{}", line.trim_end());
        }
        debug!("{} value lines shown", lines.len());
    }
}
