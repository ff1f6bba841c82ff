//! End-to-end tests: capture service → TCP → frame receiver.

use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;

use arlink_core::{
    ArlinkError, CaptureConfig, CaptureService, Connection, ConnectionInfo, FrameCaptureSender,
    FrameEncoder, FrameOutcome, FrameReceiver, ImageFormat, JpegEncoder, MAX_FRAME_DATA,
    PixelFormat, ReceiverEvent, Resolution, SoftwareSurface, ZstdEncoder,
};

const DEADLINE: Duration = Duration::from_secs(10);

async fn connect() -> (Connection, Connection) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let info = ConnectionInfo::new(addr.ip().to_string(), addr.port());
    let editor = tokio::spawn(async move { Connection::connect(&info).await.unwrap() });
    let (stream, _) = listener.accept().await.unwrap();
    (editor.await.unwrap(), Connection::new(stream))
}

async fn drain(receiver: &mut FrameReceiver) -> Vec<ReceiverEvent> {
    let mut events = Vec::new();
    while let Some(event) = timeout(DEADLINE, receiver.next_event())
        .await
        .expect("receiver stalled")
    {
        events.push(event.unwrap());
    }
    events
}

#[tokio::test]
async fn jpeg_session_arrives_in_order() {
    let (editor, device) = connect().await;
    let (transport, _inbound) = editor.into_split();

    let sender = FrameCaptureSender::new(
        CaptureConfig {
            max_fps: 30.0,
            resolution_scale: 0.5,
            debug_preview: false,
        },
        SoftwareSurface::new(160, 120),
        JpegEncoder::new(80),
        transport,
    )
    .unwrap();
    let mut service = CaptureService::new(sender, 120.0).unwrap();
    let stop = service.stop_handle();

    let run = tokio::spawn(async move {
        let stats = service.run().await;
        // Dropping the service closes the stream so the receiver sees EOF.
        drop(service);
        stats
    });

    let mut receiver = FrameReceiver::new(device, true);
    tokio::time::sleep(Duration::from_millis(250)).await;
    stop.store(false, Ordering::SeqCst);

    let stats = timeout(DEADLINE, run).await.unwrap().unwrap().unwrap();
    let events = drain(&mut receiver).await;

    assert!(matches!(
        events.first(),
        Some(ReceiverEvent::Hello {
            image_format: ImageFormat::Jpeg,
            ..
        })
    ));
    assert_eq!(events.last(), Some(&ReceiverEvent::Goodbye));

    let frames: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ReceiverEvent::Frame { frame, decoded } => Some((frame, decoded)),
            _ => None,
        })
        .collect();
    assert!(!frames.is_empty());
    assert_eq!(frames.len() as u64, stats.frames_sent);

    for (i, (frame, decoded)) in frames.iter().enumerate() {
        assert_eq!(frame.sequence, i as u64);
        assert_eq!((frame.width, frame.height), (80, 60));
        let decoded = decoded.as_ref().unwrap();
        assert_eq!(decoded.resolution, Resolution::new(80, 60));
    }
    assert_eq!(receiver.stats().sequence_gaps, 0);
    assert_eq!(receiver.stats().bytes, stats.bytes_sent);
}

#[tokio::test]
async fn shutdown_flush_delivers_final_frame() {
    let (editor, device) = connect().await;
    let (transport, _inbound) = editor.into_split();

    let mut sender = FrameCaptureSender::new(
        CaptureConfig::default(),
        SoftwareSurface::new(64, 64),
        ZstdEncoder::new(3),
        transport,
    )
    .unwrap();

    sender.send_hello();
    let outcome = sender.tick(std::time::Instant::now());
    assert!(outcome.is_sent());
    timeout(DEADLINE, sender.shutdown()).await.unwrap().unwrap();
    assert!(!sender.is_accepting());
    drop(sender);

    let mut receiver = FrameReceiver::new(device, true);
    let events = drain(&mut receiver).await;
    assert_eq!(events.len(), 3);
    match &events[1] {
        ReceiverEvent::Frame { frame, decoded } => {
            assert_eq!(frame.sequence, 0);
            assert_eq!(frame.image_format, ImageFormat::Zstd);
            let decoded = decoded.as_ref().unwrap();
            assert_eq!(decoded.data.len(), 32 * 32 * 4);
        }
        other => panic!("expected frame, got {other:?}"),
    }
    assert_eq!(events[2], ReceiverEvent::Goodbye);
}

#[tokio::test]
async fn resize_mid_session_changes_frame_size() {
    let (editor, device) = connect().await;
    let (transport, _inbound) = editor.into_split();

    let mut sender = FrameCaptureSender::new(
        CaptureConfig {
            max_fps: 1000.0,
            resolution_scale: 0.5,
            debug_preview: false,
        },
        SoftwareSurface::new(40, 20),
        ZstdEncoder::new(1),
        transport,
    )
    .unwrap();

    let start = std::time::Instant::now();
    assert!(sender.tick(start).is_sent());
    sender.surface_mut().resize(20, 40);
    assert!(sender.tick(start + Duration::from_millis(5)).is_sent());
    timeout(DEADLINE, sender.shutdown()).await.unwrap().unwrap();
    drop(sender);

    let mut receiver = FrameReceiver::new(device, false);
    let sizes: Vec<_> = drain(&mut receiver)
        .await
        .into_iter()
        .filter_map(|e| match e {
            ReceiverEvent::Frame { frame, .. } => Some((frame.width, frame.height)),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![(20, 10), (10, 20)]);
}

/// Compresses nothing; emits a blob that cannot fit in one packet.
struct OversizedEncoder;

impl FrameEncoder for OversizedEncoder {
    fn encode(
        &mut self,
        _pixels: &[u8],
        _width: u32,
        _height: u32,
        _format: PixelFormat,
    ) -> Result<Vec<u8>, ArlinkError> {
        Ok(vec![0xC3; MAX_FRAME_DATA + 16])
    }

    fn capture_format(&self) -> PixelFormat {
        PixelFormat::Rgba8
    }

    fn image_format(&self) -> ImageFormat {
        ImageFormat::Zstd
    }
}

#[tokio::test]
async fn unsendable_frame_is_dropped_not_counted() {
    let (editor, device) = connect().await;
    let (transport, _inbound) = editor.into_split();

    let mut sender = FrameCaptureSender::new(
        CaptureConfig::default(),
        SoftwareSurface::new(32, 32),
        OversizedEncoder,
        transport,
    )
    .unwrap();

    assert_eq!(sender.tick(std::time::Instant::now()), FrameOutcome::Dropped);
    timeout(DEADLINE, sender.shutdown()).await.unwrap().unwrap();
    let stats = sender.stats();
    assert_eq!(stats.frames_sent, 0);
    assert_eq!(stats.frames_dropped, 1);
    drop(sender);

    let mut receiver = FrameReceiver::new(device, false);
    let events = drain(&mut receiver).await;
    assert_eq!(events, vec![ReceiverEvent::Goodbye]);
    assert_eq!(receiver.stats().frames, 0);
    assert_eq!(receiver.stats().sequence_gaps, 0);
}
