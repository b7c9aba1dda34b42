use anyhow::Result;
use clap::Parser;
use ferry_async_trainer::{
    actor_stats_fmt, train_async, ActorManagerConfig, AsyncTrainerConfig, TrackFn,
};
use ferry_core::{
    dummy::{ChainConfig, ChainEnv},
    record::{LogRecorder, Record, RecordValue},
    Batch, FerryConfig, Transition, UpdateFn,
};
use log::info;
use rand::{rngs::StdRng, Rng};

type Q = Vec<f32>;
type Item = Transition<Vec<f32>, i64>;

/// Train a tabular Q function on a chain random walk with asynchronous actors
#[derive(Clone, Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Configuration of the replay pipeline in YAML.
    /// Command line options below are ignored when given.
    #[arg(long)]
    config: Option<String>,

    /// Number of actors, default to 4
    #[arg(long, default_value_t = 4)]
    n_actors: usize,

    /// Number of learner steps, default to 2000
    #[arg(long, default_value_t = 2000)]
    max_learner_steps: usize,

    /// Number of states of the chain, default to 8
    #[arg(long, default_value_t = 8)]
    n_states: usize,

    /// Length of the n-step return, default to 3
    #[arg(long, default_value_t = 3)]
    n_step: usize,

    /// Expected number of samples per insert.
    /// If not given, only the minimum replay size gates sampling.
    #[arg(long)]
    samples_per_insert: Option<f64>,

    /// Coefficient of the soft target update, default to 1 (hard copy)
    #[arg(long, default_value_t = 1.0)]
    tau: f64,

    /// Exploration noise probability, default to 0.2
    #[arg(long, default_value_t = 0.2)]
    eps: f32,

    /// Learning rate, default to 0.3
    #[arg(long, default_value_t = 0.3)]
    lr: f32,
}

fn state(obs: &[f32]) -> usize {
    obs.iter().position(|x| *x == 1.0).unwrap_or(0)
}

fn greedy(q: &Q, s: usize) -> i64 {
    if q[2 * s] > q[2 * s + 1] {
        0
    } else {
        1
    }
}

fn q_learning(lr: f32, gamma: f32) -> Box<dyn UpdateFn<Q, Batch<Item>>> {
    Box::new(move |q: &Q, target: &Q, batch: Batch<Item>| {
        let mut q = q.clone();
        let n = batch.len() as f32;
        let mut loss = 0.0;
        let (obs, act, reward, discount, next_obs) = batch.unpack();
        for i in 0..obs.len() {
            let (s, s_) = (state(&obs[i]), state(&next_obs[i]));
            let ix = 2 * s + act[i] as usize;
            let bootstrap = target[2 * s_].max(target[2 * s_ + 1]);
            let td = reward[i] + gamma * discount[i] * bootstrap - q[ix];
            q[ix] += lr * td;
            loss += td * td / n;
        }
        Ok::<_, anyhow::Error>((q, Record::from_slice(&[("loss", RecordValue::Scalar(loss))])))
    })
}

fn soft_update() -> TrackFn<Q> {
    Box::new(|target: &mut Q, q: &Q, tau: f64| {
        let tau = tau as f32;
        target
            .iter_mut()
            .zip(q.iter())
            .for_each(|(t, v)| *t = tau * v + (1.0 - tau) * *t);
    })
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FerryConfig::load(path)?,
        None => FerryConfig::default()
            .replay_table_name("random_walk")
            .max_replay_size(5000)
            .min_replay_size(100)
            .batch_size(32)
            .n_step(args.n_step)
            .adder_period(Some(1))
            .discount(0.95)
            .samples_per_insert(args.samples_per_insert)
            .tau(args.tau)
            .target_update_period(if args.tau < 1.0 { 1 } else { 50 })
            .variable_update_period(10),
    };
    let actor_man_config = ActorManagerConfig::new(args.n_actors);
    let async_trainer_config = AsyncTrainerConfig::default()
        .max_learner_steps(args.max_learner_steps)
        .flush_record_interval(200)
        .record_compute_cost_interval(200);
    let env_config = ChainConfig {
        n_states: args.n_states,
        max_steps: 4 * args.n_states,
        slip: 0.1,
    };
    let gamma = config.discount;
    let eps = args.eps;
    let policy = move |q: &Q, obs: &[Vec<f32>], rng: &mut StdRng| {
        obs.iter()
            .map(|o| {
                if rng.gen::<f32>() < eps {
                    rng.gen_range(0..2)
                } else {
                    greedy(q, state(o))
                }
            })
            .collect::<Vec<i64>>()
    };
    let track_fn = if config.tau < 1.0 {
        Some(soft_update())
    } else {
        None
    };
    let mut recorder = LogRecorder::new("learner: ");

    let (stats, actor_stats, q) = train_async::<ChainEnv, Q, _>(
        &config,
        &actor_man_config,
        &async_trainer_config,
        &env_config,
        vec![0.0; 2 * args.n_states],
        policy,
        q_learning(args.lr, gamma),
        track_fn,
        &mut recorder,
    )?;

    info!("Stats of async trainer\n{}", stats.fmt());
    info!("Stats of actors\n{}", actor_stats_fmt(&actor_stats));
    let greedy_actions = (0..args.n_states)
        .map(|s| greedy(&q, s))
        .collect::<Vec<_>>();
    info!("Greedy actions: {:?}", greedy_actions);

    Ok(())
}
