//! FFmpeg-subprocess packet feed.
//!
//! Spawns an `ffmpeg` child writing `gray` rawvideo to stdout and chunks the
//! byte stream into fixed-size luma packets. Every emitted packet is a key
//! frame: the decode to gray already happened inside FFmpeg, so each payload
//! stands alone.

use std::{
    io::Read,
    process::{Child, Command, Stdio},
    thread,
};

use anyhow::{anyhow, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::debug;

use crate::types::Packet;

/// Spawn an FFmpeg reader that yields raw-luma key-frame packets scaled to
/// `target_size` (width, height).
///
/// The channel is intentionally small so a slow detector backpressures the
/// reader instead of buffering frames without bound. The channel closes when
/// FFmpeg exits or its output ends, which downstream cursors surface as
/// end-of-stream.
pub fn spawn_gray_packet_reader(
    uri: &str,
    target_size: (i32, i32),
) -> Result<Receiver<Packet>> {
    let scale_arg = format!("scale={}:{}", target_size.0, target_size.1);
    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-hide_banner").arg("-loglevel").arg("error");

    if uri.starts_with("rtsp://") || uri.starts_with("rtsps://") {
        cmd.arg("-rtsp_transport")
            .arg("tcp")
            .arg("-fflags")
            .arg("nobuffer")
            .arg("-flags")
            .arg("low_delay");
    }

    cmd.arg("-i")
        .arg(uri)
        .arg("-an")
        .arg("-vf")
        .arg(&scale_arg)
        .arg("-pix_fmt")
        .arg("gray")
        .arg("-f")
        .arg("rawvideo")
        .arg("-");

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    let (tx, rx) = bounded(4);
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning ffmpeg for {uri}"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("failed to capture ffmpeg stdout"))?;

    thread::spawn(move || {
        packet_loop(stdout, child, target_size, tx);
    });

    Ok(rx)
}

fn packet_loop(
    mut stdout: impl Read,
    mut child: Child,
    target_size: (i32, i32),
    tx: Sender<Packet>,
) {
    let frame_bytes = (target_size.0 as usize) * (target_size.1 as usize);
    let mut buffer = vec![0u8; frame_bytes];

    loop {
        match stdout.read_exact(&mut buffer) {
            Ok(()) => {
                let packet = Packet {
                    data: buffer.clone(),
                    is_key_frame: true,
                };
                if tx.send(packet).is_err() {
                    break;
                }
            }
            Err(err) => {
                debug!("ffmpeg feed ended: {err}");
                break;
            }
        }
    }

    let _ = child.kill();
    let _ = child.wait();
}
