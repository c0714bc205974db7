//! The operator station: one RX thread feeding one foreground loop.
//!
//! ```text
//!   vehicle ──video──> [fpvlink-rx: Listener] ──handoff──> [caller: Station]
//!      ^                        │                              │   │
//!      └──────keepalive─────────┘                              │   └──> FrameSink / FrameRecorder
//!      └──────commands─────────────────────────────────────────┘
//! ```
//!
//! The foreground loop runs on the calling thread because display toolkits
//! generally insist on owning it. Each [`Station::run_cycle`]:
//! 1. sends a command if the command period has elapsed,
//! 2. takes the next frame (newest-wins unless every frame was requested),
//!    or re-uses the last frame while recording and nothing new is queued,
//! 3. presents it and, if the record pacer is due, records it.

use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use minstant::Instant;

use crate::command::{CommandLink, CommandPacer, ControllerSource};
use crate::config::{ConfigError, RecordConfig, StationConfig};
use crate::net::Endpoint;
use crate::sync::handoff::{self, Consumer, Taken};
use crate::sync::{CancelToken, DrainPolicy, Timeout};
use crate::trace::{debug, error, info, warn};
use crate::video::{Frame, Listener, StreamStats};

use super::record::RecordPacer;
use super::sink::{FrameRecorder, FrameSink, MjpegRecorder};

/// Error starting the station.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to bind video socket: {0}")]
    Bind(#[source] io::Error),
    #[error("failed to bind command socket: {0}")]
    Command(#[source] io::Error),
    #[error("failed to open recording: {0}")]
    Record(#[source] io::Error),
    #[error("failed to spawn RX thread: {0}")]
    Spawn(#[source] io::Error),
}

/// What one foreground cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cycle {
    /// A new frame was presented; `skipped` older frames were discarded.
    Presented { skipped: usize },
    /// The previous frame was presented again to keep the recording paced.
    Held,
    /// No frame arrived within the take timeout.
    Idle,
}

/// A recorder together with its frame-rate gate.
pub struct Recording {
    recorder: Box<dyn FrameRecorder>,
    pacer: RecordPacer,
}

impl Recording {
    #[must_use]
    pub fn new(recorder: Box<dyn FrameRecorder>, interval: Duration) -> Self {
        Self {
            recorder,
            pacer: RecordPacer::new(interval),
        }
    }

    /// Opens an MJPEG file recording as configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame rate is zero or the file cannot be
    /// created.
    pub fn from_config(config: &RecordConfig) -> Result<Self, StationError> {
        let interval = config.interval()?;
        let recorder = MjpegRecorder::create(&config.path).map_err(StationError::Record)?;
        Ok(Self::new(Box::new(recorder), interval))
    }
}

/// Running station. Dropping it signals the RX thread to stop without
/// waiting for it; call [`Station::shutdown`] to join.
pub struct Station<S, C> {
    frames: Consumer<Frame>,
    policy: DrainPolicy,
    take_timeout: Duration,
    sink: S,
    controller: C,
    commands: CommandLink,
    pacer: CommandPacer,
    recording: Option<Recording>,
    last: Option<Frame>,
    video_addr: Endpoint,
    cancel: CancelToken,
    rx_handle: Option<JoinHandle<StreamStats>>,
}

impl<S, C> Station<S, C>
where
    S: FrameSink,
    C: ControllerSource,
{
    /// Resolves the target, binds both sockets and starts the RX thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be resolved, a socket cannot be
    /// bound, or the thread cannot be spawned.
    pub fn spawn(
        config: &StationConfig,
        sink: S,
        controller: C,
        recording: Option<Recording>,
    ) -> Result<Self, StationError> {
        let vehicle = config.target_ip()?;
        let link = &config.link;
        let policy = DrainPolicy::from_process_every(config.process_every_frame);
        info!(
            %vehicle,
            listen = %link.listen,
            ?policy,
            fullscreen = config.fullscreen,
            recording = recording.is_some(),
            "station starting"
        );

        let cancel = CancelToken::new();
        let (producer, frames) = handoff::channel(link.queue_capacity.max(1));
        let listener =
            Listener::bind(link, vehicle, producer, cancel.clone()).map_err(StationError::Bind)?;
        let video_addr = listener.local_addr().map_err(StationError::Bind)?;
        let commands =
            CommandLink::bind(vehicle, link.command_port).map_err(StationError::Command)?;

        let rx_handle = thread::Builder::new()
            .name("fpvlink-rx".into())
            .spawn(move || {
                info!("RX thread started");
                let stats = listener.run();
                info!("RX thread exiting");
                stats
            })
            .map_err(StationError::Spawn)?;

        Ok(Self {
            frames,
            policy,
            take_timeout: link.take_timeout(),
            sink,
            controller,
            commands,
            pacer: CommandPacer::new(link.command_period()),
            recording,
            last: None,
            video_addr,
            cancel,
            rx_handle: Some(rx_handle),
        })
    }

    /// Address the video socket is bound to.
    #[must_use]
    pub const fn video_addr(&self) -> Endpoint {
        self.video_addr
    }

    /// Destination of command messages.
    #[must_use]
    pub const fn command_target(&self) -> Endpoint {
        self.commands.target()
    }

    /// Token that stops [`Station::run`] and the RX thread when cancelled.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Performs one foreground iteration.
    pub fn run_cycle(&mut self) -> Cycle {
        if self.pacer.poll(Instant::now())
            && let Err(_e) = self.commands.send_from(&mut self.controller)
        {
            warn!(error = %_e, "command not sent");
        }

        // While recording with a frame in hand, wait only until the next
        // recorded frame is due; if nothing new arrives by then, the held
        // frame is presented again.
        let holding = self.recording.is_some() && self.last.is_some();
        let wait = match self.recording.as_ref() {
            Some(rec) if holding => {
                // Rounded up so the wait never ends just short of the deadline.
                let due = rec.pacer.until_due(Instant::now());
                let due_ms = u64::try_from(due.as_micros().div_ceil(1000)).unwrap_or(u64::MAX);
                Duration::from_millis(due_ms).min(self.take_timeout)
            }
            _ => self.take_timeout,
        };

        let cycle = match self.frames.take(self.policy, Timeout::from(wait)) {
            Some(Taken { item, skipped }) => {
                if skipped > 0 {
                    debug!(skipped, "presenting newest frame");
                }
                self.last = Some(item);
                Cycle::Presented { skipped }
            }
            None if holding => Cycle::Held,
            None => return Cycle::Idle,
        };

        let record = self
            .recording
            .as_mut()
            .is_some_and(|rec| rec.pacer.poll(Instant::now()));
        if cycle == Cycle::Held && !record {
            return Cycle::Idle;
        }

        let Some(frame) = self.last.as_ref() else {
            return Cycle::Idle;
        };
        if let Err(_e) = self.sink.present(frame) {
            error!(error = %_e, len = frame.len(), "failed to present frame");
        }
        if record
            && let Some(rec) = self.recording.as_mut()
            && let Err(_e) = rec.recorder.record(frame)
        {
            error!(error = %_e, "failed to record frame");
        }
        cycle
    }

    /// Loops [`Station::run_cycle`] until cancelled or the RX thread dies.
    pub fn run(&mut self) {
        while !self.cancel.is_cancelled() {
            self.run_cycle();
            if self.frames.is_closed() {
                error!("video listener stopped unexpectedly");
                break;
            }
        }
    }

    /// Stops the RX thread, waits for it, and closes the recording.
    ///
    /// Returns the listener's counters, or `None` if the thread panicked.
    pub fn shutdown(mut self) -> Option<StreamStats> {
        info!("station shutdown initiated");
        self.cancel.cancel();

        let stats = self.rx_handle.take().and_then(|handle| {
            debug!("waiting for RX thread to exit");
            handle.join().ok()
        });
        if let Some(rec) = self.recording.as_mut()
            && let Err(_e) = rec.recorder.finish()
        {
            error!(error = %_e, "failed to finish recording");
        }
        info!(?stats, "station shutdown complete");
        stats
    }
}

impl<S, C> Drop for Station<S, C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::NeutralController;
    use crate::config::LinkConfig;
    use crate::net::{PolledSocket, UdpSocket};
    use crate::runtime::LogSink;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn loopback_config(command_port: u16) -> StationConfig {
        StationConfig {
            target: Some("127.0.0.1".into()),
            link: LinkConfig {
                listen: Endpoint::localhost(0).as_socket_addr(),
                command_port,
                read_timeout_ms: 50,
                take_timeout_ms: 200,
                ..LinkConfig::default()
            },
            ..StationConfig::default()
        }
    }

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<Vec<u8>>>>);

    impl FrameRecorder for Shared {
        fn record(&mut self, frame: &Frame) -> io::Result<()> {
            self.0.borrow_mut().push(frame.as_bytes().to_vec());
            Ok(())
        }
    }

    fn send_frame(camera: &UdpSocket, to: Endpoint, body: &[u8]) {
        let mut frame = b"\xff\xd8\xff".to_vec();
        frame.extend_from_slice(body);
        frame.extend_from_slice(b"\xff\xd9");
        camera.send_to(&frame, to).unwrap();
    }

    #[test]
    fn missing_target_fails_to_spawn() {
        let config = StationConfig::default();
        let result = Station::spawn(&config, LogSink::default(), NeutralController::gamepad(), None);
        assert!(matches!(
            result,
            Err(StationError::Config(ConfigError::MissingTarget))
        ));
    }

    #[test]
    fn idle_without_video() {
        let mut station = Station::spawn(
            &loopback_config(9),
            LogSink::default(),
            NeutralController::gamepad(),
            None,
        )
        .unwrap();
        assert_eq!(station.run_cycle(), Cycle::Idle);
        assert_eq!(station.sink().presented(), 0);
        assert!(station.shutdown().is_some());
    }

    #[test]
    fn presents_received_frame() {
        let mut station = Station::spawn(
            &loopback_config(9),
            LogSink::default(),
            NeutralController::gamepad(),
            None,
        )
        .unwrap();
        let camera = UdpSocket::bind(Endpoint::localhost(0)).unwrap();
        send_frame(&camera, station.video_addr(), b"one");

        let mut cycle = Cycle::Idle;
        for _ in 0..10 {
            cycle = station.run_cycle();
            if cycle != Cycle::Idle {
                break;
            }
        }
        assert_eq!(cycle, Cycle::Presented { skipped: 0 });
        assert_eq!(station.sink().presented(), 1);
        let stats = station.shutdown().unwrap();
        assert_eq!(stats.frames, 1);
    }

    #[test]
    fn recording_holds_last_frame() {
        let recorded = Shared::default();
        let recording = Recording::new(Box::new(recorded.clone()), Duration::ZERO);
        let mut station = Station::spawn(
            &loopback_config(9),
            LogSink::default(),
            NeutralController::gamepad(),
            Some(recording),
        )
        .unwrap();
        let camera = UdpSocket::bind(Endpoint::localhost(0)).unwrap();
        send_frame(&camera, station.video_addr(), b"held");

        while station.run_cycle() == Cycle::Idle {}
        assert_eq!(station.run_cycle(), Cycle::Held);
        assert_eq!(station.run_cycle(), Cycle::Held);

        let frames = recorded.0.borrow();
        assert_eq!(frames.len(), 3);
        assert!(frames.iter().all(|f| f == b"\xff\xd8\xffheld\xff\xd9"));
        drop(frames);
        station.shutdown();
    }

    #[test]
    fn holding_waits_for_record_deadline() {
        let recorded = Shared::default();
        let recording = Recording::new(Box::new(recorded.clone()), Duration::from_millis(33));
        let mut station = Station::spawn(
            &loopback_config(9),
            LogSink::default(),
            NeutralController::gamepad(),
            Some(recording),
        )
        .unwrap();
        let camera = UdpSocket::bind(Endpoint::localhost(0)).unwrap();
        send_frame(&camera, station.video_addr(), b"slow");
        while station.run_cycle() == Cycle::Idle {}

        let started = Instant::now();
        let mut cycles = 0;
        let mut held = 0;
        while started.elapsed() < Duration::from_millis(120) {
            cycles += 1;
            if station.run_cycle() == Cycle::Held {
                held += 1;
            }
        }
        assert!(cycles <= 12, "{cycles} cycles while holding");
        assert!(held >= 2, "{held} held cycles");
        assert_eq!(station.sink().presented(), 1 + held);
        assert!(recorded.0.borrow().len() <= 1 + held as usize);
        station.shutdown();
    }

    #[test]
    fn sends_commands_on_period() {
        let mut vehicle = PolledSocket::bind(Endpoint::localhost(0)).unwrap();
        let port = vehicle.socket().local_addr().unwrap().port();
        let mut config = loopback_config(port);
        config.link.command_period_ms = 0;
        config.link.take_timeout_ms = 10;
        let mut station = Station::spawn(
            &config,
            LogSink::default(),
            NeutralController::gamepad().with_axis(5, 1.0),
            None,
        )
        .unwrap();

        std::thread::sleep(Duration::from_millis(2));
        station.run_cycle();

        let mut buf = [0u8; 32];
        let (len, _) = vehicle
            .recv_timeout(&mut buf, Duration::from_secs(1))
            .unwrap()
            .expect("command datagram");
        assert_eq!(&buf[..len], b"[255;000;128]|");
        station.shutdown();
    }

    #[test]
    fn run_stops_when_cancelled() {
        let mut station = Station::spawn(
            &loopback_config(9),
            LogSink::default(),
            NeutralController::gamepad(),
            None,
        )
        .unwrap();
        station.cancel_token().cancel();
        station.run();
        assert!(station.shutdown().is_some());
    }
}
