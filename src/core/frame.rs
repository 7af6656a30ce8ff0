use std::io::Write;

use super::colors::Color;
use super::display::{DisplayError, DisplayWriter};
use super::telemetry::GpuSample;

/// Ratio limits that decide when a metric renders in the alarm color.
///
/// Each field is configuration, exposed as a CLI flag with these defaults.
#[derive(Clone, Copy, Debug)]
pub struct Thresholds {
    /// Load fraction above which the load field renders as an alarm.
    pub load_limit: f64,
    /// Temperature ceiling in Celsius; readings over it render as an alarm.
    pub temp_ceiling_c: f64,
    /// Used/total memory ratio above which the memory field renders as an alarm.
    pub mem_limit: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            load_limit: 0.7,
            temp_ceiling_c: 90.0,
            mem_limit: 0.8,
        }
    }
}

/// The two buckets of the threshold classifier.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Level {
    Nominal,
    Alarm,
}

/// Classify `value / max_value` against `limit`.
///
/// The boundary is inclusive: a ratio exactly at the limit is still nominal.
/// A zero (or negative) `max_value` reads as fully saturated rather than
/// raising a division fault.
pub fn classify(value: f64, max_value: f64, limit: f64) -> Level {
    if max_value <= 0.0 {
        return Level::Alarm;
    }
    if value / max_value <= limit {
        Level::Nominal
    } else {
        Level::Alarm
    }
}

const NOMINAL_COLOR: Color = Color::Green;
const ALARM_COLOR: Color = Color::Red;

/// Renders one colored status line per GPU into the writer's frame buffer.
///
/// Never flushes; the caller owns the flush discipline.
pub struct FrameBuilder {
    pub thresholds: Thresholds,
    pub accent: Color,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            accent: Color::Blue,
        }
    }
}

impl FrameBuilder {
    pub fn new(thresholds: Thresholds, accent: Color) -> Self {
        Self { thresholds, accent }
    }

    pub fn render<W: Write>(
        &self,
        w: &mut DisplayWriter<W>,
        samples: &[GpuSample],
    ) -> Result<(), DisplayError> {
        for sample in samples {
            self.render_sample(w, sample)?;
        }
        Ok(())
    }

    fn render_sample<W: Write>(
        &self,
        w: &mut DisplayWriter<W>,
        gpu: &GpuSample,
    ) -> Result<(), DisplayError> {
        w.set_fg(self.accent);
        w.write_str(&format!("GPU{}", gpu.id))?;
        w.reset_colors();

        self.colorify(w, gpu.load, 1.0, self.thresholds.load_limit);
        w.write_str(&format!(" {:.0}%", gpu.load * 100.0))?;

        self.colorify(w, gpu.temperature_c, self.thresholds.temp_ceiling_c, 1.0);
        w.write_str(&format!(" {:.0}C", gpu.temperature_c))?;

        self.colorify(w, gpu.memory_used_mb, gpu.memory_total_mb, self.thresholds.mem_limit);
        w.write_line(&format!(
            " {:.0}/{:.0} MB",
            gpu.memory_used_mb, gpu.memory_total_mb
        ))?;

        Ok(())
    }

    fn colorify<W: Write>(&self, w: &mut DisplayWriter<W>, value: f64, max_value: f64, limit: f64) {
        let color = match classify(value, max_value, limit) {
            Level::Nominal => NOMINAL_COLOR,
            Level::Alarm => ALARM_COLOR,
        };
        w.set_fg(color);
    }
}
