//! # Remote Simulator
//!
//! [`RemoteSim`] drives a simulator process through the line protocol in
//! [`crate::protocol`]. It can either attach to a simulator that is already
//! listening, or launch one itself and wait for it to accept a connection.
//!
//! The connection is strictly synchronous: a request is written, then the
//! reply is read, then the call returns. There are no timeouts around calls,
//! so a simulator that stops answering blocks the caller.

use crate::protocol::{encode_line, Reply, Request};
use crate::{CollisionHandle, Frame, JointHandle, ObjectHandle, SimError, Simulator, StepMode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Where a simulator listens unless told otherwise.
pub const DEFAULT_ADDR: &str = "127.0.0.1:19997";
/// How long a launched simulator gets to start listening.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;
const CONNECT_POLL: Duration = Duration::from_millis(100);

/// Where the simulator lives and how to start it.
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    pub addr: String,
    pub headless: bool,
    /// Launch the simulator ourselves instead of attaching to a running one.
    pub launch: Option<LaunchConfig>,
    /// How long to wait for a launched simulator to start listening.
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct LaunchConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            headless: true,
            launch: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl SimulatorConfig {
    #[must_use]
    pub fn headless(headless: bool) -> Self {
        Self { headless, ..Self::default() }
    }
}

struct Session {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Session {
    fn open(stream: TcpStream) -> Result<Self, SimError> {
        stream.set_nodelay(true)?;
        let reader = BufReader::new(stream.try_clone()?);
        Ok(Self { reader, writer: stream })
    }
}

/// Simulator reached over TCP.
pub struct RemoteSim {
    addr: String,
    session: Option<Session>,
    child: Option<Child>,
}

impl RemoteSim {
    /// Connects to (and optionally launches) the simulator, then announces
    /// the requested display mode.
    ///
    /// # Errors
    ///
    /// Fails if the program cannot be spawned, no connection can be made,
    /// or the simulator refuses the handshake.
    pub fn connect(config: &SimulatorConfig) -> Result<Self, SimError> {
        let child = match &config.launch {
            Some(launch) => Some(spawn(launch, config.headless)?),
            None => None,
        };
        // Constructed before connecting so a failed connect still reaps the child.
        let mut sim = Self { addr: config.addr.clone(), session: None, child };

        let stream = if sim.child.is_some() {
            connect_within(&config.addr, Duration::from_millis(config.connect_timeout_ms))?
        } else {
            TcpStream::connect(config.addr.as_str())?
        };
        sim.session = Some(Session::open(stream)?);
        sim.call(&Request::Hello { headless: config.headless })?;
        info!(addr = %sim.addr, headless = config.headless, "connected to simulator");
        Ok(sim)
    }

    /// Wraps an already connected stream. The handshake is not sent.
    ///
    /// # Errors
    ///
    /// Fails if the stream cannot be cloned or configured.
    pub fn from_stream(stream: TcpStream) -> Result<Self, SimError> {
        let addr = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
        Ok(Self { addr, session: Some(Session::open(stream)?), child: None })
    }

    #[must_use]
    pub fn addr(&self) -> &str {
        &self.addr
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Process id of the simulator this binding launched, while it is owned.
    #[must_use]
    pub fn child_id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    fn call(&mut self, request: &Request) -> Result<Value, SimError> {
        let session = self.session.as_mut().ok_or(SimError::Closed)?;
        trace!(cmd = request.command(), "simulator request");
        session.writer.write_all(encode_line(request)?.as_bytes())?;
        session.writer.flush()?;

        let mut line = String::new();
        if session.reader.read_line(&mut line)? == 0 {
            return Err(SimError::Disconnected);
        }
        let reply: Reply = serde_json::from_str(line.trim_end())?;
        reply.into_result(request)
    }

    fn call_as<T: DeserializeOwned>(&mut self, request: &Request) -> Result<T, SimError> {
        let value = self.call(request)?;
        Ok(serde_json::from_value(value)?)
    }

    fn reap_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            match child.try_wait() {
                Ok(Some(status)) => debug!(%status, "simulator process exited"),
                _ => {
                    if let Err(e) = child.kill() {
                        warn!("failed to kill simulator process: {e}");
                    }
                    let _ = child.wait();
                }
            }
        }
    }
}

fn spawn(launch: &LaunchConfig, headless: bool) -> Result<Child, SimError> {
    let mut cmd = Command::new(&launch.program);
    if headless {
        cmd.arg("-h");
    }
    cmd.args(&launch.args);
    info!(program = %launch.program.display(), headless, "launching simulator");
    cmd.spawn().map_err(|source| SimError::Launch {
        program: launch.program.display().to_string(),
        source,
    })
}

/// Polls until a freshly launched simulator starts listening.
fn connect_within(addr: &str, timeout: Duration) -> Result<TcpStream, SimError> {
    let start = Instant::now();
    loop {
        match TcpStream::connect(addr) {
            Ok(stream) => return Ok(stream),
            Err(e) if start.elapsed() < timeout => {
                trace!("simulator not listening yet: {e}");
                std::thread::sleep(CONNECT_POLL);
            }
            Err(_) => {
                return Err(SimError::ConnectTimeout {
                    addr: addr.to_string(),
                    waited_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}

impl Simulator for RemoteSim {
    fn load_scene(&mut self, path: &Path) -> Result<(), SimError> {
        let path = path.to_string_lossy().into_owned();
        info!(scene = %path, "loading scene");
        self.call(&Request::LoadScene { path })?;
        Ok(())
    }

    fn joint(&mut self, name: &str) -> Result<JointHandle, SimError> {
        self.call_as(&Request::JointHandle { name: name.to_string() })
    }

    fn collision(&mut self, name: &str) -> Result<CollisionHandle, SimError> {
        self.call_as(&Request::CollisionHandle { name: name.to_string() })
    }

    fn object(&mut self, name: &str) -> Result<ObjectHandle, SimError> {
        self.call_as(&Request::ObjectHandle { name: name.to_string() })
    }

    fn set_position_target(&mut self, joint: JointHandle, degrees: f32) -> Result<(), SimError> {
        self.call(&Request::SetPositionTarget { handle: joint, degrees })?;
        Ok(())
    }

    fn joint_angle(&mut self, joint: JointHandle) -> Result<f32, SimError> {
        self.call_as(&Request::JointAngle { handle: joint })
    }

    fn joint_velocity(&mut self, joint: JointHandle) -> Result<f32, SimError> {
        self.call_as(&Request::JointVelocity { handle: joint })
    }

    fn image(&mut self, camera: ObjectHandle) -> Result<Frame, SimError> {
        let frame: Frame = self.call_as(&Request::Image { handle: camera })?;
        if !frame.is_well_formed() {
            return Err(SimError::Remote {
                command: "image",
                message: format!(
                    "{} bytes for a {}x{} frame",
                    frame.pixels.len(),
                    frame.width,
                    frame.height
                ),
            });
        }
        Ok(frame)
    }

    fn is_colliding(&mut self, collision: CollisionHandle) -> Result<bool, SimError> {
        self.call_as(&Request::IsColliding { handle: collision })
    }

    fn start_simulation(&mut self, mode: StepMode) -> Result<(), SimError> {
        self.call(&Request::StartSimulation { synchronous: mode == StepMode::Synchronous })?;
        Ok(())
    }

    fn stop_simulation(&mut self) -> Result<(), SimError> {
        self.call(&Request::StopSimulation)?;
        Ok(())
    }

    fn step_blocking(&mut self) -> Result<(), SimError> {
        self.call(&Request::Step)?;
        Ok(())
    }

    fn end(&mut self) -> Result<(), SimError> {
        if self.session.is_none() {
            self.reap_child();
            return Ok(());
        }
        let result = match self.call(&Request::End) {
            Ok(_) | Err(SimError::Disconnected) => Ok(()),
            Err(e) => Err(e),
        };
        self.session = None;
        self.reap_child();
        info!(addr = %self.addr, "simulator session ended");
        result
    }
}

impl Drop for RemoteSim {
    fn drop(&mut self) {
        self.reap_child();
    }
}
