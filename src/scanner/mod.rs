//! ScanLoopController - Continuous Scan Loop
//!
//! ## Responsibilities
//!
//! - Idle → Starting → Streaming ⇄ Paused state machine
//! - Frame pull / decode pacing with a post-decode cooldown
//! - Serializing the check-in tail behind a re-entrancy gate
//! - Camera release on every exit path
//!
//! The loop runs as one spawned task. A successful decode pauses frame
//! processing for the cooldown window (so a code still held in front of the
//! camera is not re-recorded every tick) and dispatches the check-in tail.
//! The tail gate is independent of the pause: if a write is still in flight
//! when the next decode lands, the new tail waits for the gate instead of
//! being dropped or run concurrently.

pub mod camera;
pub mod decode;

pub use camera::{
    CameraDevice, CameraLeaseManager, CameraProfile, CameraSource, Facing, Frame, FrameStream,
    RtspCameraSource,
};
pub use decode::{DecodeClient, FrameDecoder};

use crate::attendance_log::AttendanceStore;
use crate::audit_log::AuditSink;
use crate::checkin::CheckinService;
use crate::directory::CheckinMethod;
use crate::realtime_hub::{CameraErrorMessage, HubMessage, RealtimeHub, ScannerStateMessage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::time::Instant;

/// Scan loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    /// No camera, no loop
    Idle,
    /// Camera acquisition in flight
    Starting,
    /// Loop pulling frames
    Streaming,
    /// Decode succeeded, awaiting cooldown
    Paused,
}

impl ScanState {
    /// String form for signals and logging
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::Starting => "starting",
            ScanState::Streaming => "streaming",
            ScanState::Paused => "paused",
        }
    }
}

/// Scan loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerPolicy {
    /// Frame pacing in milliseconds
    pub tick_interval_ms: u64,
    /// Cooldown after a successful decode before frames are processed again
    pub cooldown_ms: u64,
    /// Camera acquisition parameters
    pub profile: CameraProfile,
}

impl Default for ScannerPolicy {
    fn default() -> Self {
        Self {
            tick_interval_ms: 150,
            cooldown_ms: 1200,
            profile: CameraProfile::default(),
        }
    }
}

/// ScanLoopController instance
pub struct ScanLoopController<C, D, S, A>
where
    C: CameraSource,
    D: FrameDecoder,
    S: AttendanceStore,
    A: AuditSink,
{
    camera: Arc<C>,
    decoder: Arc<D>,
    checkin: Arc<CheckinService<S, A>>,
    hub: Arc<RealtimeHub>,
    policy: ScannerPolicy,
    state: Arc<RwLock<ScanState>>,
    /// Serializes check-in tails triggered by this loop's decodes
    tail_gate: Arc<Mutex<()>>,
    /// Stop signal for the running loop task; sync mutex so teardown paths
    /// (Drop) can signal without an executor
    stop_tx: std::sync::Mutex<Option<watch::Sender<bool>>>,
}

impl<C, D, S, A> ScanLoopController<C, D, S, A>
where
    C: CameraSource,
    D: FrameDecoder,
    S: AttendanceStore,
    A: AuditSink,
{
    /// Create new controller
    pub fn new(
        camera: Arc<C>,
        decoder: Arc<D>,
        checkin: Arc<CheckinService<S, A>>,
        hub: Arc<RealtimeHub>,
        policy: ScannerPolicy,
    ) -> Self {
        Self {
            camera,
            decoder,
            checkin,
            hub,
            policy,
            state: Arc::new(RwLock::new(ScanState::Idle)),
            tail_gate: Arc::new(Mutex::new(())),
            stop_tx: std::sync::Mutex::new(None),
        }
    }

    /// Current state
    pub async fn state(&self) -> ScanState {
        *self.state.read().await
    }

    /// Start the scan loop. A second start while not Idle is a no-op.
    ///
    /// Scan-triggered check-ins are recorded under the given operator
    /// identity.
    pub async fn start(&self, actor: &str) {
        {
            let mut state = self.state.write().await;
            if *state != ScanState::Idle {
                tracing::warn!(state = %state.as_str(), "Scanner already running, start ignored");
                return;
            }
            *state = ScanState::Starting;
        }
        broadcast_state(&self.hub, ScanState::Starting).await;

        let (tx, rx) = watch::channel(false);
        {
            let mut stop_tx = self.stop_tx.lock().expect("stop_tx lock");
            *stop_tx = Some(tx);
        }

        tracing::info!(actor = %actor, "Starting scan loop");

        tokio::spawn(run_loop(
            self.camera.clone(),
            self.decoder.clone(),
            self.checkin.clone(),
            self.hub.clone(),
            self.state.clone(),
            self.tail_gate.clone(),
            self.policy.clone(),
            actor.to_string(),
            rx,
        ));
    }

    /// Stop the scan loop from any state.
    ///
    /// Cancels a pending frame pull or camera acquisition and releases the
    /// camera. A check-in tail already in flight completes on its own task.
    pub fn stop(&self) {
        let tx = {
            let mut stop_tx = self.stop_tx.lock().expect("stop_tx lock");
            stop_tx.take()
        };
        if let Some(tx) = tx {
            let _ = tx.send(true);
            tracing::info!("Scanner stop requested");
        }
    }
}

impl<C, D, S, A> Drop for ScanLoopController<C, D, S, A>
where
    C: CameraSource,
    D: FrameDecoder,
    S: AttendanceStore,
    A: AuditSink,
{
    fn drop(&mut self) {
        // Host teardown behaves like an explicit stop.
        self.stop();
    }
}

/// Broadcast a state transition to the operator hub
async fn broadcast_state(hub: &RealtimeHub, state: ScanState) {
    hub.broadcast(HubMessage::ScannerState(ScannerStateMessage {
        state: state.as_str().to_string(),
        timestamp: Utc::now().to_rfc3339(),
    }))
    .await;
}

/// Resolve until the stop signal fires (or the sender is gone)
async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop<C, D, S, A>(
    camera: Arc<C>,
    decoder: Arc<D>,
    checkin: Arc<CheckinService<S, A>>,
    hub: Arc<RealtimeHub>,
    state: Arc<RwLock<ScanState>>,
    tail_gate: Arc<Mutex<()>>,
    policy: ScannerPolicy,
    actor: String,
    mut stop_rx: watch::Receiver<bool>,
) where
    C: CameraSource,
    D: FrameDecoder,
    S: AttendanceStore,
    A: AuditSink,
{
    // Acquisition is cancellable: a stop during Starting drops the acquire
    // future, and with it any partially taken device lease.
    let acquired = tokio::select! {
        _ = stopped(&mut stop_rx) => None,
        acquired = camera.acquire(&policy.profile) => Some(acquired),
    };

    let mut stream = match acquired {
        None => {
            set_idle(&state, &hub).await;
            tracing::info!("Scan loop stopped during camera acquisition");
            return;
        }
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Camera acquisition failed");
            hub.broadcast(HubMessage::CameraError(CameraErrorMessage {
                message: e.to_string(),
                timestamp: Utc::now().to_rfc3339(),
            }))
            .await;
            set_idle(&state, &hub).await;
            return;
        }
        Some(Ok(stream)) => stream,
    };

    {
        let mut s = state.write().await;
        *s = ScanState::Streaming;
    }
    broadcast_state(&hub, ScanState::Streaming).await;

    let mut interval = tokio::time::interval(Duration::from_millis(policy.tick_interval_ms));
    let mut resume_at: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = stopped(&mut stop_rx) => break,
            _ = interval.tick() => {}
        }

        // Cooldown: frames are not processed until the deadline passes.
        if let Some(deadline) = resume_at {
            if Instant::now() < deadline {
                continue;
            }
            resume_at = None;
            {
                let mut s = state.write().await;
                *s = ScanState::Streaming;
            }
            broadcast_state(&hub, ScanState::Streaming).await;
        }

        let pulled = tokio::select! {
            _ = stopped(&mut stop_rx) => break,
            pulled = stream.next_frame() => pulled,
        };

        let frame = match pulled {
            Ok(Some(frame)) => frame,
            // Capture pipeline not primed: a no-op tick, not an error.
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, "Frame pull failed");
                continue;
            }
        };

        let payload = match decoder.decode(&frame).await {
            Ok(Some(payload)) => payload,
            Ok(None) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Decode failed, treated as miss");
                continue;
            }
        };

        tracing::debug!(payload = %payload, "Code decoded, pausing for cooldown");
        {
            let mut s = state.write().await;
            *s = ScanState::Paused;
        }
        broadcast_state(&hub, ScanState::Paused).await;
        resume_at = Some(Instant::now() + Duration::from_millis(policy.cooldown_ms));

        // Dispatch the tail on its own task. The gate serializes tails: a
        // decode that lands while a write is still in flight waits here
        // instead of being dropped. The gate clears when the tail settles,
        // success or failure.
        let gate = tail_gate.clone();
        let checkin = checkin.clone();
        let actor = actor.clone();
        tokio::spawn(async move {
            let _guard = gate.lock_owned().await;
            if let Err(e) = checkin.check_in(&payload, CheckinMethod::Scan, &actor).await {
                tracing::warn!(error = %e, payload = %payload, "Scan check-in failed");
            }
        });
    }

    // Every exit path releases the camera exactly once.
    drop(stream);
    set_idle(&state, &hub).await;
    tracing::info!("Scan loop stopped");
}

async fn set_idle(state: &RwLock<ScanState>, hub: &RealtimeHub) {
    {
        let mut s = state.write().await;
        *s = ScanState::Idle;
    }
    broadcast_state(hub, ScanState::Idle).await;
}
