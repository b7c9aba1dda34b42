use std::time::Duration;

/// Stats of [`AsyncTrainer`](crate::AsyncTrainer)`::train()`.
#[derive(Clone, Debug)]
pub struct AsyncTrainStat {
    /// The number of learner steps.
    pub learner_steps: usize,

    /// The number of items inserted into the table per second.
    pub inserts_per_sec: f32,

    /// Duration of training.
    pub duration: Duration,

    /// The number of learner steps per second.
    pub steps_per_sec: f32,
}

impl AsyncTrainStat {
    /// Returns a formatted string.
    pub fn fmt(&self) -> String {
        let mut s = "learner steps, inserts/sec, steps/sec, duration\n".to_string();
        s += format!(
            "{}, {}, {}, {}\n",
            self.learner_steps,
            self.inserts_per_sec,
            self.steps_per_sec,
            self.duration.as_secs_f32()
        )
        .as_str();
        s
    }
}
