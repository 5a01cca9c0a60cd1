use std::collections::VecDeque;

// Rates are averaged over this many seconds
const WINDOW: f64 = 1.0;
// A present interval this much longer than the target counts as a stutter
const STUTTER_FACTOR: f64 = 1.5;

/// Rolling present counters of one display plugin. Times are in seconds.
pub struct PresentStats {
    target_interval: f64,
    presents: VecDeque<f64>,
    new_frame_presents: VecDeque<f64>,
    drops: VecDeque<f64>,
    stutters: VecDeque<f64>,
    last_present: Option<f64>,
    last_frame_index: Option<u32>,
}

impl PresentStats {
    pub fn new(target_rate: f32) -> PresentStats {
        PresentStats {
            target_interval: 1.0 / target_rate.max(1.0) as f64,
            presents: VecDeque::new(),
            new_frame_presents: VecDeque::new(),
            drops: VecDeque::new(),
            stutters: VecDeque::new(),
            last_present: None,
            last_frame_index: None,
        }
    }

    pub fn set_target_rate(&mut self, target_rate: f32) {
        self.target_interval = 1.0 / target_rate.max(1.0) as f64;
    }

    pub fn record_present(&mut self, now: f64, frame_index: u32) {
        if let Some(last) = self.last_present {
            if now - last > self.target_interval * STUTTER_FACTOR {
                self.stutters.push_back(now);
            }
        }
        self.last_present = Some(now);
        self.presents.push_back(now);
        if self.last_frame_index != Some(frame_index) {
            self.last_frame_index = Some(frame_index);
            self.new_frame_presents.push_back(now);
        }
        self.prune(now);
    }

    /// A frame the vendor compositor refused.
    pub fn record_drop(&mut self, now: f64) {
        self.drops.push_back(now);
        self.prune(now);
    }

    pub fn present_rate(&self, now: f64) -> f32 {
        rate(&self.presents, now)
    }

    pub fn new_frame_present_rate(&self, now: f64) -> f32 {
        rate(&self.new_frame_presents, now)
    }

    pub fn dropped_frame_rate(&self, now: f64) -> f32 {
        rate(&self.drops, now)
    }

    pub fn stutter_rate(&self, now: f64) -> f32 {
        rate(&self.stutters, now)
    }

    pub fn reset(&mut self) {
        self.presents.clear();
        self.new_frame_presents.clear();
        self.drops.clear();
        self.stutters.clear();
        self.last_present = None;
        self.last_frame_index = None;
    }

    fn prune(&mut self, now: f64) {
        for events in [
            &mut self.presents,
            &mut self.new_frame_presents,
            &mut self.drops,
            &mut self.stutters,
        ] {
            while events.front().map_or(false, |&time| now - time > WINDOW) {
                events.pop_front();
            }
        }
    }
}

fn rate(events: &VecDeque<f64>, now: f64) -> f32 {
    let count = events.iter().filter(|&&time| now - time <= WINDOW && time <= now).count();
    (count as f64 / WINDOW) as f32
}
