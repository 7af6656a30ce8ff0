use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use super::display::{DisplayError, DisplayWriter};
use super::frame::FrameBuilder;
use super::telemetry::MetricSource;

// Granularity of the end-of-cycle sleep; keeps ctrl-c latency low.
const SLEEP_STEP: Duration = Duration::from_millis(200);

/// The fixed-period render loop: collect, build one frame, flush, sleep.
pub struct Monitor<S: MetricSource, W: Write> {
    source: S,
    writer: DisplayWriter<W>,
    frame: FrameBuilder,
}

impl<S: MetricSource, W: Write> Monitor<S, W> {
    pub fn new(source: S, writer: DisplayWriter<W>, frame: FrameBuilder) -> Self {
        Self {
            source,
            writer,
            frame,
        }
    }

    /// One full cycle: clear, home, neutral colors, one line per GPU, flush.
    ///
    /// Transport errors propagate; there is no retry, the process is expected
    /// to die and be restarted externally.
    pub fn render_cycle(&mut self) -> Result<(), DisplayError> {
        self.writer.clear_screen();
        self.writer.cursor_home();
        self.writer.reset_colors();

        let samples = self.source.sample();
        self.frame.render(&mut self.writer, &samples)?;

        self.writer.flush()
    }

    /// Render every `interval` until `running` clears.
    pub fn run(&mut self, interval: Duration, running: &AtomicBool) -> Result<(), DisplayError> {
        info!(interval_secs = interval.as_secs(), "monitor loop started");
        while running.load(Ordering::SeqCst) {
            self.render_cycle()?;
            sleep_interruptible(interval, running);
        }
        info!("monitor loop stopped");
        Ok(())
    }
}

// Sleep in small steps so an external stop is honored promptly instead of
// after a full interval.
fn sleep_interruptible(total: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + total;
    while running.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(SLEEP_STEP.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::telemetry::GpuSample;

    struct StaticSource(Vec<GpuSample>);

    impl MetricSource for StaticSource {
        fn sample(&mut self) -> Vec<GpuSample> {
            self.0.clone()
        }
    }

    fn gpu(id: u32) -> GpuSample {
        GpuSample {
            id,
            load: 0.9,
            temperature_c: 95.0,
            memory_used_mb: 9000.0,
            memory_total_mb: 10000.0,
        }
    }

    #[test]
    fn test_empty_cycle_is_exactly_the_preamble() {
        let mut out = Vec::new();
        {
            let writer = DisplayWriter::new(&mut out);
            let mut monitor =
                Monitor::new(StaticSource(Vec::new()), writer, FrameBuilder::default());
            monitor.render_cycle().unwrap();
        }
        // clear, cursor home, white foreground, black background, nothing else
        assert_eq!(out, b"\x1bc\x1b[H\x1b[37m\x1b[40m");
    }

    #[test]
    fn test_cycle_round_trips_frame_to_transport() {
        let mut out = Vec::new();
        {
            let writer = DisplayWriter::new(&mut out);
            let mut monitor = Monitor::new(StaticSource(vec![gpu(0)]), writer, FrameBuilder::default());
            monitor.render_cycle().unwrap();
            // Buffer is empty once the frame is on the wire
            assert!(monitor.writer.pending().is_empty());
        }

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("\x1bc\x1b[H\x1b[37m\x1b[40m"));
        assert!(text.contains("GPU0"));
        assert!(text.ends_with("\n\r"));
    }

    #[test]
    fn test_each_cycle_is_a_fresh_frame() {
        let mut out = Vec::new();
        {
            let writer = DisplayWriter::new(&mut out);
            let mut monitor = Monitor::new(StaticSource(vec![gpu(0)]), writer, FrameBuilder::default());
            monitor.render_cycle().unwrap();
            monitor.render_cycle().unwrap();
        }

        let text = String::from_utf8(out).unwrap();
        // Two cycles, two clears, two records
        assert_eq!(text.matches("\x1bc").count(), 2);
        assert_eq!(text.matches("GPU0").count(), 2);
    }

    #[test]
    fn test_run_exits_when_flag_already_cleared() {
        let mut out = Vec::new();
        let writer = DisplayWriter::new(&mut out);
        let mut monitor = Monitor::new(StaticSource(Vec::new()), writer, FrameBuilder::default());
        let running = AtomicBool::new(false);
        monitor
            .run(Duration::from_secs(3600), &running)
            .unwrap();
        // No cycle ran
        drop(monitor);
        assert!(out.is_empty());
    }

    #[test]
    fn test_interruptible_sleep_returns_early() {
        let running = AtomicBool::new(false);
        let start = Instant::now();
        sleep_interruptible(Duration::from_secs(60), &running);
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
