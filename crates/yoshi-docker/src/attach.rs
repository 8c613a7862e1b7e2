//! Hijacked attach streams.
//!
//! bollard upgrades the attach request (`Connection: Upgrade`,
//! `Upgrade: tcp`) and hands back the demultiplexed output frames.

use bollard::Docker;
use bollard::container::{AttachContainerOptions, LogOutput};
use bollard::errors::Error as BollardError;
use futures_util::StreamExt;
use yoshi_core::{ByteStream, Error, Result};

/// Options for a live stdout attach: no replay of past output.
pub(crate) fn attach_options() -> AttachContainerOptions<String> {
    AttachContainerOptions::<String> {
        stdout: Some(true),
        stream: Some(true),
        logs: Some(false),
        ..Default::default()
    }
}

/// Attach to a container and expose its output as raw bytes.
pub(crate) async fn attach_stdout(docker: &Docker, id: &str) -> Result<ByteStream> {
    let results = docker
        .attach_container(id, Some(attach_options()))
        .await
        .map_err(|e| map_error(id, e))?;

    tracing::debug!(container = %id, "attached to container");

    let container = id.to_string();
    let output = results.output.map(move |item| match item {
        Ok(frame) => Ok(frame_bytes(frame)),
        Err(e) => Err(map_error(&container, e)),
    });

    Ok(Box::pin(output))
}

fn frame_bytes(frame: LogOutput) -> Vec<u8> {
    match frame {
        LogOutput::StdOut { message }
        | LogOutput::StdErr { message }
        | LogOutput::StdIn { message }
        | LogOutput::Console { message } => message.to_vec(),
    }
}

fn map_error(id: &str, e: BollardError) -> Error {
    match e {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => Error::EntityVanished(id.to_string()),
        other => Error::docker(other.to_string()),
    }
}
