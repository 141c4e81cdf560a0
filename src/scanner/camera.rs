//! Camera frame acquisition
//!
//! ## Responsibilities
//!
//! - Exclusive per-device access control (one holder at a time)
//! - RTSP single-frame capture via ffmpeg
//!
//! A stream handle owns its device lease; dropping the handle releases the
//! camera. Acquire → drop → acquire again is a supported pattern (the
//! operator toggling the scanner), and every exit path of the scan loop
//! releases through the same drop.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::{Mutex, RwLock};

/// One raw video frame (JPEG bytes)
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

/// Camera facing preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Environment-facing camera, preferred for scanning codes held up to it
    Rear,
    Front,
}

/// Acquisition parameters: facing preference plus a resolution hint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraProfile {
    pub facing: Facing,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraProfile {
    fn default() -> Self {
        Self {
            facing: Facing::Rear,
            width: 1280,
            height: 720,
        }
    }
}

/// Abstraction over a camera backend.
///
/// `acquire` may fail with [`Error::CameraUnavailable`] (no device for the
/// profile, or the device is held elsewhere). The returned stream yields
/// frames lazily and releases the device when dropped.
pub trait CameraSource: Send + Sync + 'static {
    type Stream: FrameStream;

    fn acquire<'a>(
        &'a self,
        profile: &'a CameraProfile,
    ) -> impl Future<Output = Result<Self::Stream>> + Send + 'a;
}

/// A lazy, infinite sequence of frames from an acquired camera.
///
/// `Ok(None)` means the capture pipeline is not primed yet; the caller
/// treats it as a no-op tick, not an error.
pub trait FrameStream: Send + 'static {
    fn next_frame(&mut self) -> impl Future<Output = Result<Option<Frame>>> + Send + '_;
}

// ========================================
// Device lease management
// ========================================

/// Serializes access to camera devices: at most one lease per device id.
pub struct CameraLeaseManager {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl CameraLeaseManager {
    /// Create new lease manager
    pub fn new() -> Self {
        Self {
            locks: RwLock::new(HashMap::new()),
        }
    }

    /// Take the lease for a device without waiting.
    ///
    /// Returns `None` when another holder has it. The lease releases on
    /// drop.
    pub async fn try_acquire(&self, device_id: &str) -> Option<CameraLease> {
        let lock = self.get_or_create_lock(device_id).await;

        match lock.try_lock_owned() {
            Ok(guard) => {
                tracing::debug!(device_id = %device_id, "Camera lease acquired");
                Some(CameraLease {
                    device_id: device_id.to_string(),
                    _guard: guard,
                })
            }
            Err(_) => {
                tracing::debug!(device_id = %device_id, "Camera lease denied - device busy");
                None
            }
        }
    }

    async fn get_or_create_lock(&self, device_id: &str) -> Arc<Mutex<()>> {
        {
            let locks = self.locks.read().await;
            if let Some(lock) = locks.get(device_id) {
                return lock.clone();
            }
        }

        let mut locks = self.locks.write().await;
        locks
            .entry(device_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

impl Default for CameraLeaseManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive hold on a camera device, released on drop
pub struct CameraLease {
    device_id: String,
    _guard: tokio::sync::OwnedMutexGuard<()>,
}

impl CameraLease {
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl Drop for CameraLease {
    fn drop(&mut self) {
        tracing::debug!(device_id = %self.device_id, "Camera lease released");
    }
}

// ========================================
// RTSP camera source (ffmpeg)
// ========================================

/// One configured camera device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDevice {
    pub device_id: String,
    pub facing: Facing,
    pub rtsp_url: String,
}

/// Camera source backed by RTSP devices, one JPEG frame per pull
pub struct RtspCameraSource {
    devices: Vec<CameraDevice>,
    leases: Arc<CameraLeaseManager>,
    /// ffmpeg timeout per frame grab in seconds
    grab_timeout_sec: u64,
}

impl RtspCameraSource {
    /// Create new source over the configured device table
    pub fn new(devices: Vec<CameraDevice>, grab_timeout_sec: u64) -> Self {
        Self {
            devices,
            leases: Arc::new(CameraLeaseManager::new()),
            grab_timeout_sec,
        }
    }

    /// Pick the first device matching the facing preference, falling back to
    /// any configured device.
    fn pick_device(&self, facing: Facing) -> Option<&CameraDevice> {
        self.devices
            .iter()
            .find(|d| d.facing == facing)
            .or_else(|| self.devices.first())
    }
}

impl CameraSource for RtspCameraSource {
    type Stream = RtspFrameStream;

    async fn acquire(&self, profile: &CameraProfile) -> Result<RtspFrameStream> {
        let device = self.pick_device(profile.facing).ok_or_else(|| {
            Error::CameraUnavailable("No camera device configured".to_string())
        })?;

        let lease = self.leases.try_acquire(&device.device_id).await.ok_or_else(|| {
            Error::CameraUnavailable(format!("Camera {} is busy", device.device_id))
        })?;

        tracing::info!(
            device_id = %device.device_id,
            rtsp_url = %device.rtsp_url,
            width = profile.width,
            height = profile.height,
            "Camera acquired"
        );

        Ok(RtspFrameStream {
            device_id: device.device_id.clone(),
            rtsp_url: device.rtsp_url.clone(),
            width: profile.width,
            height: profile.height,
            grab_timeout_sec: self.grab_timeout_sec,
            _lease: lease,
        })
    }
}

/// Frame stream over one leased RTSP device
pub struct RtspFrameStream {
    device_id: String,
    rtsp_url: String,
    width: u32,
    height: u32,
    grab_timeout_sec: u64,
    _lease: CameraLease,
}

impl FrameStream for RtspFrameStream {
    /// Grab one frame with ffmpeg.
    ///
    /// Uses kill_on_drop so a timed-out or cancelled grab cannot leave a
    /// zombie ffmpeg holding the device. A failed grab is logged and
    /// reported as "no frame this tick"; only acquisition failures stop the
    /// scan loop.
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        use std::process::Stdio;

        let scale = format!("scale={}:{}", self.width, self.height);
        let child = Command::new("ffmpeg")
            .args([
                "-rtsp_transport", "tcp",
                "-i", &self.rtsp_url,
                "-frames:v", "1",
                "-vf", &scale,
                "-f", "image2pipe",
                "-vcodec", "mjpeg",
                "-loglevel", "error",
                "-y",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Internal(format!("ffmpeg spawn failed: {}", e)))?;

        let timeout = Duration::from_secs(self.grab_timeout_sec);
        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() || output.stdout.is_empty() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    tracing::warn!(
                        device_id = %self.device_id,
                        stderr = %stderr.trim(),
                        "Frame grab produced no image"
                    );
                    return Ok(None);
                }

                Ok(Some(Frame {
                    data: output.stdout,
                    captured_at: Utc::now(),
                }))
            }
            Ok(Err(e)) => {
                tracing::warn!(device_id = %self.device_id, error = %e, "Frame grab failed");
                Ok(None)
            }
            Err(_) => {
                tracing::warn!(
                    device_id = %self.device_id,
                    timeout_sec = self.grab_timeout_sec,
                    "Frame grab timeout, ffmpeg killed via kill_on_drop"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lease_acquire_release() {
        let manager = CameraLeaseManager::new();

        let lease = manager.try_acquire("cam-001").await.unwrap();
        assert_eq!(lease.device_id(), "cam-001");

        // Busy while held.
        assert!(manager.try_acquire("cam-001").await.is_none());

        // Released on drop, reacquirable.
        drop(lease);
        assert!(manager.try_acquire("cam-001").await.is_some());
    }

    #[tokio::test]
    async fn test_different_devices_lease_independently() {
        let manager = CameraLeaseManager::new();
        let _a = manager.try_acquire("cam-001").await.unwrap();
        assert!(manager.try_acquire("cam-002").await.is_some());
    }

    #[tokio::test]
    async fn test_rtsp_source_prefers_facing_match() {
        let source = RtspCameraSource::new(
            vec![
                CameraDevice {
                    device_id: "front-1".to_string(),
                    facing: Facing::Front,
                    rtsp_url: "rtsp://front".to_string(),
                },
                CameraDevice {
                    device_id: "rear-1".to_string(),
                    facing: Facing::Rear,
                    rtsp_url: "rtsp://rear".to_string(),
                },
            ],
            5,
        );

        let picked = source.pick_device(Facing::Rear).unwrap();
        assert_eq!(picked.device_id, "rear-1");

        // Falls back to any device when nothing matches the preference.
        let source = RtspCameraSource::new(
            vec![CameraDevice {
                device_id: "front-1".to_string(),
                facing: Facing::Front,
                rtsp_url: "rtsp://front".to_string(),
            }],
            5,
        );
        assert_eq!(source.pick_device(Facing::Rear).unwrap().device_id, "front-1");
    }

    #[tokio::test]
    async fn test_acquire_fails_when_no_devices() {
        let source = RtspCameraSource::new(Vec::new(), 5);
        let result = source.acquire(&CameraProfile::default()).await;
        assert!(matches!(result, Err(Error::CameraUnavailable(_))));
    }

    #[tokio::test]
    async fn test_second_acquire_of_same_device_is_unavailable() {
        let source = RtspCameraSource::new(
            vec![CameraDevice {
                device_id: "rear-1".to_string(),
                facing: Facing::Rear,
                rtsp_url: "rtsp://rear".to_string(),
            }],
            5,
        );

        let stream = source.acquire(&CameraProfile::default()).await.unwrap();
        assert!(matches!(
            source.acquire(&CameraProfile::default()).await,
            Err(Error::CameraUnavailable(_))
        ));

        drop(stream);
        assert!(source.acquire(&CameraProfile::default()).await.is_ok());
    }
}
