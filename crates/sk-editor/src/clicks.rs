//! Single/double click separation.
//!
//! A single click is held back for `delay_ms` and only then acted on. A
//! double click acts at once and marks the single clicks it was built
//! from to be skipped when their delay runs out.

use sk_core::SketchConfig;
use sk_render::kurbo::Point;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Click {
    Single(Point),
    Double(Point),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    due_ms: f64,
    at: Point,
}

#[derive(Debug, Clone)]
pub struct ClickDebouncer {
    delay_ms: f64,
    skip_per_double: u32,
    pending: VecDeque<Pending>,
    skip: u32,
}

impl ClickDebouncer {
    pub fn new(delay_ms: f64, skip_per_double: u32) -> Self {
        Self {
            delay_ms,
            skip_per_double,
            pending: VecDeque::new(),
            skip: 0,
        }
    }

    pub fn from_config(config: &SketchConfig) -> Self {
        Self::new(config.click_delay_ms as f64, config.double_click_skip)
    }

    /// Record a single click; it fires from [`ClickDebouncer::poll`] once
    /// the delay has passed.
    pub fn click(&mut self, now_ms: f64, at: Point) {
        self.pending.push_back(Pending {
            due_ms: now_ms + self.delay_ms,
            at,
        });
    }

    /// Record a double click. It fires immediately; up to `skip_per_double`
    /// pending single clicks are discarded.
    pub fn double_click(&mut self, at: Point) -> Click {
        let pending = u32::try_from(self.pending.len()).unwrap_or(u32::MAX);
        self.skip = (self.skip + self.skip_per_double).min(pending);
        Click::Double(at)
    }

    /// Single clicks whose delay has run out, oldest first.
    pub fn poll(&mut self, now_ms: f64) -> Vec<Click> {
        let mut fired = Vec::new();
        while let Some(next) = self.pending.front() {
            if next.due_ms > now_ms {
                break;
            }
            let Some(next) = self.pending.pop_front() else {
                break;
            };
            if self.skip > 0 {
                self.skip -= 1;
                log::trace!("single click at {:?} skipped", next.at);
                continue;
            }
            fired.push(Click::Single(next.at));
        }
        fired
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Forget pending clicks, e.g. when a drag starts.
    pub fn cancel(&mut self) {
        self.pending.clear();
        self.skip = 0;
    }
}
