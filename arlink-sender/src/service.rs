//! Sender service lifecycle.
//!
//! Builds the capture pipeline from the configuration, connects to the
//! device and drives frames until stopped.

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info};

use arlink_core::capture::encoder_for;
use arlink_core::{
    ArlinkError, CaptureService, Connection, ConnectionInfo, FrameCaptureSender, FrameEncoder,
    LoopbackTransport, SenderStats, SoftwareSurface, Transport,
};

use crate::config::SenderConfig;

// ── SenderService ────────────────────────────────────────────────

pub struct SenderService {
    config: SenderConfig,
    dry_run: bool,
    running: Arc<AtomicBool>,
}

impl SenderService {
    /// The service counts as running until stopped, so a stop issued
    /// before `run` is honoured.
    pub fn new(config: SenderConfig) -> Self {
        Self {
            config,
            dry_run: false,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Send frames to an in-process sink instead of the network.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Obtain a handle that can be used to stop the service from
    /// another task.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run until stopped.
    ///
    /// 1. Builds the surface and encoder; invalid capture settings are fatal.
    /// 2. Connects to the peer (or a loopback sink on a dry run).
    /// 3. Drives the capture loop at the display refresh rate.
    /// 4. On stop, flushes everything enqueued before returning.
    pub async fn run(&self) -> Result<SenderStats, Box<dyn Error>> {
        let capture = self.config.to_capture_config();
        capture.validate()?;
        if !self.is_running() {
            info!("stopped before start");
            return Ok(SenderStats::default());
        }

        let display = &self.config.display;
        let surface = SoftwareSurface::new(display.width, display.height);
        let encoder = encoder_for(
            self.config.capture.codec,
            self.config.capture.jpeg_quality,
            self.config.capture.zstd_level,
        );

        let stats = if self.dry_run {
            let (transport, mut sink) = LoopbackTransport::new();
            let drained = tokio::spawn(async move {
                let mut count = 0u64;
                while sink.recv().await.is_some() {
                    count += 1;
                }
                count
            });
            info!("dry run: frames stay in-process");
            let sender = FrameCaptureSender::new(capture, surface, encoder, transport)?;
            let stats = self.drive(sender).await?;
            debug!("sink received {} messages", drained.await?);
            stats
        } else {
            let net = &self.config.network;
            let info = ConnectionInfo::new(net.peer_host.clone(), net.peer_port);
            let connection = tokio::time::timeout(
                Duration::from_millis(net.connect_timeout_ms),
                Connection::connect(&info),
            )
            .await
            .map_err(|_| format!("timed out connecting to {info}"))??;
            info!("connected to {info}");

            let (transport, _inbound) = connection.into_split();
            let sender = FrameCaptureSender::new(capture, surface, encoder, transport)?;
            self.drive(sender).await?
        };

        self.running.store(false, Ordering::SeqCst);
        info!(
            "sender stopped: {} frames, {} bytes, {} dropped",
            stats.frames_sent, stats.bytes_sent, stats.frames_dropped
        );
        Ok(stats)
    }

    // ── Internal ─────────────────────────────────────────────────

    async fn drive<T>(
        &self,
        sender: FrameCaptureSender<SoftwareSurface, Box<dyn FrameEncoder>, T>,
    ) -> Result<SenderStats, ArlinkError>
    where
        T: Transport,
    {
        let mut svc = CaptureService::new(sender, self.config.display.refresh_hz)?;

        let svc_running = svc.stop_handle();
        let global_running = Arc::clone(&self.running);
        let watcher = tokio::spawn(async move {
            wait_for_stop(&global_running).await;
            svc_running.store(false, Ordering::SeqCst);
        });

        let result = svc.run().await;
        watcher.abort();
        result
    }
}

/// Resolves when `running` becomes false.
async fn wait_for_stop(running: &Arc<AtomicBool>) {
    while running.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

// ── Tests ────────────────────────────────────────────────────────
