//! Episode loop behind the `swordfight` binary.
//!
//! Each episode resets the environment, then steps it with a random action
//! that is held for `resample_every` steps before a new one is drawn.

use crate::Args;
use anyhow::{bail, Context, Result};
use gym::{Env, FightConfig, FightEnv, Observation};
use sim::{LaunchConfig, MockSim, Simulator, SimulatorConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// How many episodes to run and how the random policy behaves.
#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub episodes: u32,
    pub steps: u32,
    pub resample_every: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    pub episode: u32,
    pub steps: u32,
    pub hits: u32,
    pub total_reward: f32,
}

pub fn run(args: &Args) -> Result<()> {
    if args.resample_every == 0 {
        bail!("--resample-every must be at least 1");
    }
    let mut config = match &args.config {
        Some(path) => FightConfig::from_path(path)?,
        None => FightConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(dir) = &args.dump_frames {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating frame directory {}", dir.display()))?;
    }

    let plan = Plan {
        episodes: args.episodes,
        steps: args.steps,
        resample_every: args.resample_every,
    };
    let mut rng = args.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
    let frames = args.dump_frames.as_deref();

    if args.mock {
        info!("using the mock simulator");
        let mut env = FightEnv::new(MockSim::new(), config)?;
        drive(&mut env, plan, &mut rng, frames)
    } else {
        let mut env = FightEnv::connect(&simulator_config(args), config)?;
        drive(&mut env, plan, &mut rng, frames)
    }
}

fn simulator_config(args: &Args) -> SimulatorConfig {
    SimulatorConfig {
        addr: args.addr.clone(),
        headless: !args.graphical,
        launch: args.launch.clone().map(|program| LaunchConfig {
            program,
            args: args.launch_args.clone(),
        }),
        connect_timeout_ms: args.connect_timeout_ms,
    }
}

/// Runs the episodes and closes the environment whether or not they succeed.
fn drive<S: Simulator>(
    env: &mut FightEnv<S>,
    plan: Plan,
    rng: &mut fastrand::Rng,
    frames: Option<&Path>,
) -> Result<()> {
    let outcome = run_episodes(env, plan, rng, frames);
    env.close()?;
    let summaries = outcome?;
    let hits: u32 = summaries.iter().map(|s| s.hits).sum();
    info!(episodes = summaries.len(), hits, "done");
    Ok(())
}

pub fn run_episodes<S: Simulator>(
    env: &mut FightEnv<S>,
    plan: Plan,
    rng: &mut fastrand::Rng,
    frames: Option<&Path>,
) -> Result<Vec<EpisodeSummary>> {
    let space = env.action_space();
    let mut summaries = Vec::with_capacity(plan.episodes as usize);

    for episode in 0..plan.episodes {
        let obs = env.reset().with_context(|| format!("resetting episode {episode}"))?;
        if let Some(dir) = frames {
            save_frame(dir, episode, 0, &obs)?;
        }
        info!(episode, opponent = ?env.opponent_pose(), "episode started");

        let mut summary = EpisodeSummary { episode, steps: 0, hits: 0, total_reward: 0.0 };
        let mut action = Vec::new();
        for step in 0..plan.steps {
            if step % plan.resample_every == 0 {
                action = space.sample(rng);
            }
            let (obs, reward, done, _info) = env
                .step(&action)
                .with_context(|| format!("episode {episode}, step {step}"))?;
            summary.steps += 1;
            summary.total_reward += reward;
            if reward > 0.0 {
                summary.hits += 1;
            }
            debug!(episode, step, reward, positions = ?obs.positions(), "step");
            if let Some(dir) = frames {
                save_frame(dir, episode, step + 1, &obs)?;
            }
            if done {
                break;
            }
        }

        info!(
            episode = summary.episode,
            steps = summary.steps,
            hits = summary.hits,
            reward = summary.total_reward,
            "episode finished"
        );
        summaries.push(summary);
    }
    Ok(summaries)
}

fn frame_path(dir: &Path, episode: u32, step: u32) -> PathBuf {
    dir.join(format!("ep{episode:03}_step{step:04}.png"))
}

fn save_frame(dir: &Path, episode: u32, step: u32, obs: &Observation) -> Result<()> {
    let frame = &obs.image;
    let image = image::RgbImage::from_raw(frame.width, frame.height, frame.pixels.clone())
        .context("camera frame does not match its declared size")?;
    let path = frame_path(dir, episode, step);
    image
        .save(&path)
        .with_context(|| format!("writing frame {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use sim::Frame;

    fn env() -> FightEnv<MockSim> {
        let config = FightConfig { seed: Some(3), ..FightConfig::default() };
        FightEnv::new(MockSim::new(), config).unwrap()
    }

    #[test]
    fn runs_every_episode_to_its_step_count() {
        let mut env = env();
        let mut rng = fastrand::Rng::with_seed(1);
        let plan = Plan { episodes: 2, steps: 7, resample_every: 3 };
        let summaries = run_episodes(&mut env, plan, &mut rng, None).unwrap();
        assert_eq!(summaries.len(), 2);
        assert!(summaries.iter().all(|s| s.steps == 7));
        assert_eq!(env.sim().starts, 2);
    }

    #[test]
    fn action_is_held_between_resamples() {
        let mut env = env();
        let mut rng = fastrand::Rng::with_seed(1);
        let plan = Plan { episodes: 1, steps: 6, resample_every: 3 };
        run_episodes(&mut env, plan, &mut rng, None).unwrap();

        let motor = env.motors(gym::fight::AGENT)[0];
        let settled = 15;
        let targets: Vec<f32> = env
            .sim()
            .commands_for(motor)
            .filter(|c| c.at_step >= settled)
            .map(|c| c.degrees)
            .collect();
        assert_eq!(targets.len(), 6);
        assert_eq!(targets[0], targets[1]);
        assert_eq!(targets[1], targets[2]);
        assert_eq!(targets[3], targets[4]);
        assert_eq!(targets[4], targets[5]);
    }

    #[test]
    fn hits_are_counted() {
        let mut env = env();
        let mut rng = fastrand::Rng::with_seed(1);
        // Reset consumes one entry per settle step.
        let mut script = vec![false; 15];
        script.extend([true, false, false, false, true]);
        env.sim_mut().script_collisions(script);
        let plan = Plan { episodes: 1, steps: 5, resample_every: 5 };
        let summaries = run_episodes(&mut env, plan, &mut rng, None).unwrap();
        assert_eq!(summaries[0].hits, 2);
        assert_eq!(summaries[0].total_reward, 2.0);
    }

    #[test]
    fn frames_are_written_as_png() {
        let dir = std::env::temp_dir().join(format!("swordfight-frames-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut env = FightEnv::new(
            MockSim::new().with_frame(Frame::blank(256, 256)),
            FightConfig::default(),
        )
        .unwrap();
        let mut rng = fastrand::Rng::with_seed(1);
        let plan = Plan { episodes: 1, steps: 2, resample_every: 1 };
        run_episodes(&mut env, plan, &mut rng, Some(&dir)).unwrap();

        for step in 0..=2 {
            let path = frame_path(&dir, 0, step);
            let img = image::open(&path).unwrap().to_rgb8();
            assert_eq!(img.dimensions(), (256, 256));
        }
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn simulator_flags_reach_the_binding() {
        let args = Args::parse_from(["swordfight"]);
        let cfg = simulator_config(&args);
        assert_eq!(cfg.addr, sim::DEFAULT_ADDR);
        assert!(cfg.headless);
        assert!(cfg.launch.is_none());
        assert_eq!(cfg.connect_timeout_ms, sim::DEFAULT_CONNECT_TIMEOUT_MS);

        let args = Args::parse_from([
            "swordfight",
            "--graphical",
            "--launch",
            "/opt/sim/run.sh",
            "--launch-arg",
            "-gREMOTEAPISERVERSERVICE_19997_FALSE_TRUE",
            "--launch-arg",
            "scene.ttt",
            "--connect-timeout-ms",
            "2500",
        ]);
        let cfg = simulator_config(&args);
        assert!(!cfg.headless);
        assert_eq!(cfg.connect_timeout_ms, 2500);
        let launch = cfg.launch.unwrap();
        assert_eq!(launch.program, PathBuf::from("/opt/sim/run.sh"));
        assert_eq!(launch.args, ["-gREMOTEAPISERVERSERVICE_19997_FALSE_TRUE", "scene.ttt"]);
    }
}
