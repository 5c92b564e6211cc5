use std::collections::VecDeque;
use std::time::Duration;

/// Rolling display-frame statistics for the FPS overlay.
///
/// Every presented frame is recorded; `rendered` tells whether the raymarch
/// pass actually ran or the previous image was re-presented.
#[derive(Debug, Clone)]
pub struct FrameStats {
    samples: VecDeque<Duration>,
    capacity: usize,
    rendered: u64,
    reused: u64,
}

impl FrameStats {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            rendered: 0,
            reused: 0,
        }
    }

    pub fn record(&mut self, dt: Duration, rendered: bool) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(dt);
        if rendered {
            self.rendered += 1;
        } else {
            self.reused += 1;
        }
    }

    pub fn mean_frame_time(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    pub fn worst_frame_time(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or(Duration::ZERO)
    }

    /// Frames per second over the sample window; zero before any samples.
    pub fn fps(&self) -> f64 {
        let mean = self.mean_frame_time().as_secs_f64();
        if mean > 0.0 { 1.0 / mean } else { 0.0 }
    }

    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    pub fn reused(&self) -> u64 {
        self.reused
    }
}
