use std::time::Duration;

/// Stats of the environment loop of one [`Actor`](crate::Actor).
#[derive(Clone, Debug, Default)]
pub struct ActorStat {
    /// The number of steps for interaction between actor and env.
    pub env_steps: usize,

    /// The number of completed episodes.
    pub episodes: usize,

    /// Version of the parameters when the loop stopped.
    pub version: u64,

    /// Duration of the loop.
    pub duration: Duration,
}

/// Returns a formatted string of the set of [`ActorStat`] for reporting.
pub fn actor_stats_fmt(stats: &[ActorStat]) -> String {
    let mut s = "actor id, env steps, episodes, version, duration [sec], steps per sec\n".to_string();
    for (i, stat) in stats.iter().enumerate() {
        let n = stat.env_steps;
        let d = stat.duration.as_secs_f32();
        let p = if d > 0.0 { (n as f32) / d } else { 0.0 };
        s += format!("{}, {}, {}, {}, {}, {}\n", i, n, stat.episodes, stat.version, d, p).as_str();
    }
    s
}
