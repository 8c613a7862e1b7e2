//! Terminal dashboard for yoshi.
//!
//! Hosts the log stream manager, the session controller and the surfaces
//! it draws on.

mod event;
mod session;
mod shutdown;
mod stream;
mod surface;
pub mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use yoshi_core::{Config, ContainerBackend, PodBackend, SessionOptions};
use yoshi_docker::DockerBackend;
use yoshi_kube::KubeBackend;

pub use event::{Action, Event, EventHandler};
pub use session::{IDLE_TITLE, Session, SessionPhase};
pub use shutdown::{ShutdownHook, ShutdownReason};
pub use stream::{StreamEvent, StreamEventKind, StreamId, StreamManager, StreamState, StreamUpdate};
pub use surface::{HeadlessSurface, ScreenSlot, Surface, TerminalSurface};

const TICK_RATE: Duration = Duration::from_millis(250);

/// Run the dashboard until the user quits or the process is interrupted.
///
/// # Errors
///
/// Returns an error if the shutdown hook is already installed, the Docker
/// client cannot be built, or the session fails to start.
pub async fn run(config: &Config, options: SessionOptions) -> Result<()> {
    let shutdown = ShutdownHook::install()?;

    let containers: Arc<dyn ContainerBackend> = Arc::new(DockerBackend::connect(&config.docker)?);
    let pods = if options.kube_enabled() {
        connect_kube().await
    } else {
        None
    };

    let mut session = Session::new(TerminalSurface::new(), containers, pods, options);
    let mut events = EventHandler::new(TICK_RATE);
    let token = shutdown.token();

    if !session.start_interruptible(&mut events, &token).await? {
        return Ok(());
    }
    session.run(&mut events, token).await?;
    Ok(())
}

async fn connect_kube() -> Option<Arc<dyn PodBackend>> {
    match KubeBackend::connect().await {
        Ok(backend) => {
            let backend: Arc<dyn PodBackend> = Arc::new(backend);
            Some(backend)
        }
        Err(e) => {
            tracing::warn!(error = %e, "kubernetes is unavailable, pods will not be listed");
            None
        }
    }
}
