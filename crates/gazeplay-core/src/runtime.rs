//! Tokio runtime for the engine.
//!
//! A single task owns the [`AttentionEngine`] and the provider and `select!`s
//! over the command queue and the watchdog interval. That task is the only
//! serialization point: frame processing and watchdog ticks never overlap.
//! Playback delivery is pushed onto the blocking pool by [`BackgroundSink`],
//! so a hanging sink cannot stall classification.

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::dispatcher::PlaybackCommand;
use crate::engine::{AttentionEngine, EngineSnapshot};
use crate::error::{DispatchError, ServiceError};
use crate::events::EngineEvent;
use crate::provider::FaceProvider;
use crate::sinks::PlaybackSink;

const COMMAND_QUEUE_DEPTH: usize = 64;
const EVENT_BUFFER: usize = 256;

enum ServiceMessage<F> {
    Frame(F),
    SetPitchDownThreshold(f32),
    SetEnabled(bool),
    Snapshot(oneshot::Sender<EngineSnapshot>),
    Shutdown,
}

/// Clonable handle to a running [`AttentionService`].
pub struct ServiceHandle<F> {
    tx: mpsc::Sender<ServiceMessage<F>>,
    events: broadcast::Sender<EngineEvent>,
}

impl<F> Clone for ServiceHandle<F> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            events: self.events.clone(),
        }
    }
}

impl<F: Send + 'static> ServiceHandle<F> {
    /// Offer a frame. Never blocks: returns `false` if the frame was
    /// dropped because the queue is full or the service has stopped.
    pub fn submit_frame(&self, frame: F) -> bool {
        match self.tx.try_send(ServiceMessage::Frame(frame)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("frame queue full; dropping frame");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub async fn set_pitch_down_threshold(&self, threshold: f32) -> Result<(), ServiceError> {
        if !threshold.is_finite() {
            return Err(ServiceError::InvalidThreshold(threshold));
        }
        self.send(ServiceMessage::SetPitchDownThreshold(threshold)).await
    }

    pub async fn set_enabled(&self, enabled: bool) -> Result<(), ServiceError> {
        self.send(ServiceMessage::SetEnabled(enabled)).await
    }

    pub async fn snapshot(&self) -> Result<EngineSnapshot, ServiceError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(ServiceMessage::Snapshot(reply_tx)).await?;
        reply_rx.await.map_err(|_| ServiceError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn shutdown(&self) -> Result<(), ServiceError> {
        self.send(ServiceMessage::Shutdown).await
    }

    async fn send(&self, msg: ServiceMessage<F>) -> Result<(), ServiceError> {
        self.tx.send(msg).await.map_err(|_| ServiceError::Closed)
    }
}

pub struct AttentionService<P: FaceProvider> {
    engine: AttentionEngine,
    provider: P,
    rx: mpsc::Receiver<ServiceMessage<P::Frame>>,
    events: broadcast::Sender<EngineEvent>,
    started_at: Instant,
}

impl<P> AttentionService<P>
where
    P: FaceProvider + Send + 'static,
    P::Frame: Send + 'static,
{
    /// Spawn the service on the current tokio runtime.
    pub fn spawn(engine: AttentionEngine, provider: P) -> (ServiceHandle<P::Frame>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let service = Self {
            engine,
            provider,
            rx,
            events: events.clone(),
            started_at: Instant::now(),
        };
        let join = tokio::spawn(service.run());
        (ServiceHandle { tx, events }, join)
    }

    fn now_us(&self) -> i64 {
        i64::try_from(self.started_at.elapsed().as_micros()).unwrap_or(i64::MAX)
    }

    async fn run(mut self) {
        let period = Duration::from_micros(self.engine.watchdog_period_us().max(1));
        let mut ticker = tokio::time::interval_at(self.started_at + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.engine.start(0);
        info!(period_ms = period.as_millis() as u64, "attention service started");

        loop {
            tokio::select! {
                msg = self.rx.recv() => {
                    let Some(msg) = msg else { break };
                    match msg {
                        ServiceMessage::Frame(frame) => {
                            let now = self.now_us();
                            let events = self.engine.process_frame(&mut self.provider, &frame, now);
                            self.publish(events);
                        }
                        ServiceMessage::SetPitchDownThreshold(threshold) => {
                            self.engine.set_pitch_down_threshold(threshold);
                        }
                        ServiceMessage::SetEnabled(enabled) => {
                            let now = self.now_us();
                            let events = self.engine.set_enabled(enabled, now);
                            self.publish(events);
                        }
                        ServiceMessage::Snapshot(reply) => {
                            let _ = reply.send(self.engine.snapshot());
                        }
                        ServiceMessage::Shutdown => break,
                    }
                }
                _ = ticker.tick() => {
                    let now = self.now_us();
                    let events = self.engine.watchdog_tick(now);
                    self.publish(events);
                }
            }
        }

        info!("attention service stopped");
    }

    fn publish(&self, events: Vec<EngineEvent>) {
        for event in events {
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }
}

/// Delivers on the blocking pool and logs failures. `deliver` returns
/// immediately.
pub struct BackgroundSink {
    inner: Arc<dyn PlaybackSink>,
    runtime: Handle,
}

impl BackgroundSink {
    pub fn new(inner: Arc<dyn PlaybackSink>, runtime: Handle) -> Self {
        Self { inner, runtime }
    }

    /// Wrap using the runtime this is called from.
    pub fn on_current_runtime(inner: Arc<dyn PlaybackSink>) -> Result<Self, ServiceError> {
        let runtime = Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;
        Ok(Self::new(inner, runtime))
    }
}

impl PlaybackSink for BackgroundSink {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn deliver(&self, command: PlaybackCommand) -> Result<(), DispatchError> {
        let inner = Arc::clone(&self.inner);
        self.runtime.spawn_blocking(move || {
            if let Err(e) = inner.deliver(command) {
                warn!(%command, sink = inner.name(), error = %e, "background dispatch failed");
            }
        });
        Ok(())
    }
}
