//! Tor daemon supervision
//!
//! Spawns a private tor process on ephemeral ports with a one-time hashed
//! control password, then watches its stdout until the control listener is
//! open. The child is killed when the supervisor is dropped, restarted or
//! shut down.

use super::circuit;
use super::control::ControlEndpoint;
use super::credential::{self, Credential};
use super::ports::{self, PortPair};
use super::resolve::{self, Direction};
use crate::config::TorlinkConfig;
use crate::error::{Result, TorError};
use crate::proxy::{self, BindingState, Capabilities, ProxyEndpoint};
use std::net::{IpAddr, SocketAddr};
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Log marker tor uses for fatal errors
pub const ERR_MARKER: &str = "[err]";

/// Log line fragment emitted once the control port accepts connections
pub const READY_MARKER: &str = "Opened Control listener connection";

/// Longer stdout lines are split into chunks of this size
pub const MAX_LOG_LINE: usize = 64 * 1024;

/// One running tor process and the parameters it was launched with.
///
/// Ports and credential are fixed for the lifetime of the instance.
#[derive(Debug)]
pub struct DaemonInstance {
    child: Child,
    host: IpAddr,
    ports: PortPair,
    credential: Credential,
    drain: JoinHandle<()>,
}

impl DaemonInstance {
    pub fn socks_port(&self) -> u16 {
        self.ports.socks
    }

    pub fn control_port(&self) -> u16 {
        self.ports.control
    }

    pub fn control_secret(&self) -> &str {
        &self.credential.secret
    }

    pub fn hashed_secret(&self) -> &str {
        &self.credential.hashed
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn proxy(&self) -> ProxyEndpoint {
        ProxyEndpoint::new(self.host, self.ports.socks)
    }

    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.ports.control)
    }

    /// Check if the process is still running
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    async fn kill(&mut self) {
        if let Err(e) = self.child.kill().await {
            warn!("Failed to kill tor (pid {:?}): {}", self.child.id(), e);
        }
        self.drain.abort();
    }
}

/// Owner of the current [`DaemonInstance`].
///
/// Holds no instance after a failed [`Self::restart`]; accessors and control
/// operations then return [`TorError::NotRunning`] until a restart succeeds.
#[derive(Debug)]
pub struct TorProcess {
    config: TorlinkConfig,
    instance: Option<DaemonInstance>,
}

impl TorProcess {
    /// Launch tor and wait until its control listener is open
    pub async fn start(config: TorlinkConfig) -> Result<Self> {
        let instance = launch(&config, &[]).await?;
        Ok(Self {
            config,
            instance: Some(instance),
        })
    }

    /// Kill the running daemon and launch a fresh one.
    ///
    /// The new instance gets new ports and a new credential, so any
    /// [`crate::proxy::BindingState`] taken against the old endpoint is
    /// stale and must be redone. If the launch fails the old daemon stays
    /// dead and the process is left not running.
    pub async fn restart(&mut self) -> Result<()> {
        info!("Restarting tor");
        let mut previous = Vec::new();
        if let Some(mut old) = self.instance.take() {
            previous.extend([old.ports.socks, old.ports.control]);
            old.kill().await;
        }
        self.instance = Some(launch(&self.config, &previous).await?);
        Ok(())
    }

    /// Kill the daemon and wait for it to exit
    pub async fn shutdown(mut self) {
        info!("Stopping tor");
        if let Some(mut instance) = self.instance.take() {
            instance.kill().await;
        }
    }

    pub fn instance(&self) -> Result<&DaemonInstance> {
        self.instance.as_ref().ok_or(TorError::NotRunning)
    }

    pub fn instance_mut(&mut self) -> Result<&mut DaemonInstance> {
        self.instance.as_mut().ok_or(TorError::NotRunning)
    }

    /// Whether an instance exists and its process has not exited
    pub fn is_running(&mut self) -> bool {
        self.instance.as_mut().is_some_and(DaemonInstance::is_running)
    }

    pub fn config(&self) -> &TorlinkConfig {
        &self.config
    }

    /// Configuration used by the next [`Self::restart`]
    pub fn config_mut(&mut self) -> &mut TorlinkConfig {
        &mut self.config
    }

    /// `(host, port)` of the SOCKS listener
    pub fn proxy(&self) -> Result<ProxyEndpoint> {
        Ok(self.instance()?.proxy())
    }

    /// SOCKS listener in `socks5://host:port` form
    pub fn formatted_proxy(&self) -> Result<String> {
        Ok(self.proxy()?.url())
    }

    /// Connection parameters for a fresh control session
    pub fn control_endpoint(&self) -> Result<ControlEndpoint> {
        let instance = self.instance()?;
        Ok(ControlEndpoint {
            addr: instance.control_addr(),
            secret: instance.credential.secret.clone(),
            timeout: self.config.control_timeout(),
        })
    }
}

/// Control operations, each on its own short-lived session
impl TorProcess {
    pub async fn resolve(&self, subject: &str, direction: Direction) -> Result<String> {
        resolve::resolve(&self.control_endpoint()?, subject, direction).await
    }

    /// Resolve a hostname to an address through tor
    pub async fn gethostbyname(&self, hostname: &str) -> Result<String> {
        resolve::gethostbyname(&self.control_endpoint()?, hostname).await
    }

    /// Resolve an address to a hostname through tor
    pub async fn gethostbyaddr(&self, address: &str) -> Result<String> {
        resolve::gethostbyaddr(&self.control_endpoint()?, address).await
    }

    /// Request a new circuit, waiting out any rate limit tor reports
    pub async fn new_circuit(&self) -> Result<()> {
        circuit::new_circuit(&self.control_endpoint()?, self.config.notice_wait()).await
    }

    /// Route `target` through this instance's SOCKS listener.
    ///
    /// The binding is tied to the current ports; rebind after [`Self::restart`].
    pub fn bind(&self, target: &mut dyn Capabilities) -> Result<BindingState> {
        proxy::bind(self.proxy()?, target)
    }
}

async fn launch(config: &TorlinkConfig, exclude: &[u16]) -> Result<DaemonInstance> {
    let host: IpAddr = config
        .listen_host
        .parse()
        .map_err(|_| TorError::PortAllocation(format!("invalid host {}", config.listen_host)))?;
    let ports = ports::allocate_pair(host, exclude)?;
    let credential = credential::generate(&config.tor_binary).await?;

    let mut command = Command::new(&config.tor_binary);
    command
        .arg("--SocksPort")
        .arg(format!("{}:{}", host, ports.socks))
        .arg("--ControlPort")
        .arg(format!("{}:{}", host, ports.control))
        .arg("--HashedControlPassword")
        .arg(&credential.hashed);
    if let Some(dir) = &config.data_directory {
        command.arg("--DataDirectory").arg(dir);
    }
    command
        .args(&config.extra_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    debug!(
        "Spawning {} (socks {}, control {})",
        config.tor_binary.display(),
        ports.socks,
        ports.control
    );
    let mut child = command.spawn().map_err(TorError::Spawn)?;

    let stdout = child.stdout.take().ok_or_else(|| {
        TorError::Spawn(std::io::Error::other("tor stdout was not captured"))
    })?;
    let mut reader = BufReader::new(stdout);

    let timeout = config.startup_timeout();
    let scanned = match tokio::time::timeout(timeout, scan_startup(&mut reader)).await {
        Ok(result) => result,
        Err(_) => Err(TorError::StartupTimeout(timeout.as_secs())),
    };
    if let Err(e) = scanned {
        warn!("tor failed to start: {}", e);
        let _ = child.kill().await;
        return Err(e);
    }

    info!(
        "tor ready (pid {:?}, socks {}:{}, control {}:{})",
        child.id(),
        host,
        ports.socks,
        host,
        ports.control
    );

    Ok(DaemonInstance {
        child,
        host,
        ports,
        credential,
        drain: tokio::spawn(drain_stdout(reader)),
    })
}

/// Read startup output until tor reports readiness or a fatal error.
///
/// Returns [`TorError::Startup`] carrying the text after the `[err]` marker,
/// or [`TorError::StartupExited`] if the stream ends first. Lines longer
/// than [`MAX_LOG_LINE`] are examined in pieces.
pub async fn scan_startup<R>(reader: &mut R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if read_log_line(reader, &mut buf).await? == 0 {
            return Err(TorError::StartupExited);
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end();
        debug!("tor: {}", line);

        if let Some(pos) = line.find(ERR_MARKER) {
            let message = line[pos + ERR_MARKER.len()..].trim_start();
            return Err(TorError::Startup(message.to_string()));
        }
        if line.contains(READY_MARKER) {
            return Ok(());
        }
    }
}

/// Keep consuming stdout so tor never blocks on a full pipe
async fn drain_stdout(mut reader: BufReader<ChildStdout>) {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match read_log_line(&mut reader, &mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(_) => debug!("tor: {}", String::from_utf8_lossy(&buf).trim_end()),
        }
    }
}

async fn read_log_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    reader.take(MAX_LOG_LINE as u64).read_until(b'\n', buf).await
}
