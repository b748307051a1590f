#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use gazeguard_lib::{
    CascadeProvider, Frame, FrameSource, LandmarkProvider, LandmarkSet, TrackingSettings,
    WarningReason, WarningSink,
};
use image::{Rgba, RgbaImage};

/// Camera pointed at an empty, dark room: every call yields a new black frame.
pub struct DarkCamera {
    clock_ms: AtomicU64,
    pub stopped: AtomicBool,
}

impl DarkCamera {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            clock_ms: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        })
    }
}

impl FrameSource for DarkCamera {
    fn latest_frame(&self) -> Option<Frame> {
        let ts = self.clock_ms.fetch_add(33, Ordering::SeqCst);
        Some(Frame::new(
            RgbaImage::from_pixel(64, 48, Rgba([0, 0, 0, 255])),
            ts,
        ))
    }

    fn start(&self) -> Result<()> {
        self.stopped.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Landmark library that never finishes loading.
pub struct NeverReady;

impl LandmarkProvider for NeverReady {
    fn is_ready(&self) -> bool {
        false
    }

    fn detect(&self, _frame: &Frame) -> Result<Option<LandmarkSet>> {
        Ok(None)
    }
}

/// Landmark library that loads, then fails on every frame. Only the first
/// `initialize` call succeeds.
pub struct CorruptLandmarks {
    pub inits: AtomicUsize,
}

impl LandmarkProvider for CorruptLandmarks {
    fn is_ready(&self) -> bool {
        true
    }

    fn initialize(&self) -> Result<()> {
        if self.inits.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(())
        } else {
            Err(anyhow!("model crashed"))
        }
    }

    fn detect(&self, _frame: &Frame) -> Result<Option<LandmarkSet>> {
        Err(anyhow!("malformed landmark payload"))
    }
}

/// Landmark library whose every detection blocks its thread for `delay`.
/// Only the first `initialize` call succeeds.
pub struct StalledLandmarks {
    pub delay: Duration,
    pub inits: AtomicUsize,
}

impl StalledLandmarks {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            inits: AtomicUsize::new(0),
        })
    }
}

impl LandmarkProvider for StalledLandmarks {
    fn is_ready(&self) -> bool {
        true
    }

    fn initialize(&self) -> Result<()> {
        if self.inits.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(())
        } else {
            Err(anyhow!("model wedged"))
        }
    }

    fn detect(&self, _frame: &Frame) -> Result<Option<LandmarkSet>> {
        std::thread::sleep(self.delay);
        Ok(None)
    }
}

/// Landmark library that sees no face and counts `shutdown` calls.
pub struct CountingLandmarks {
    pub ready: bool,
    pub shutdowns: AtomicUsize,
}

impl CountingLandmarks {
    pub fn new(ready: bool) -> Arc<Self> {
        Arc::new(Self {
            ready,
            shutdowns: AtomicUsize::new(0),
        })
    }
}

impl LandmarkProvider for CountingLandmarks {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn detect(&self, _frame: &Frame) -> Result<Option<LandmarkSet>> {
        Ok(None)
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MissingCascadeModel;

impl CascadeProvider for MissingCascadeModel {
    fn load(&self) -> Result<()> {
        Err(anyhow!("haarcascade_frontalface_default.xml not found"))
    }

    fn detect(&self, _frame: &Frame) -> Result<bool> {
        Ok(false)
    }
}

pub struct WorkingCascade;

impl CascadeProvider for WorkingCascade {
    fn load(&self) -> Result<()> {
        Ok(())
    }

    fn detect(&self, _frame: &Frame) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub accepted: Mutex<Vec<(String, u64, WarningReason)>>,
}

impl RecordingSink {
    pub fn offsets(&self) -> Vec<u64> {
        self.accepted.lock().unwrap().iter().map(|(_, offset, _)| *offset).collect()
    }

    pub fn len(&self) -> usize {
        self.accepted.lock().unwrap().len()
    }
}

impl WarningSink for RecordingSink {
    fn accept(&self, session_id: &str, offset_ms: u64, reason: WarningReason) -> Result<()> {
        self.accepted
            .lock()
            .unwrap()
            .push((session_id.to_string(), offset_ms, reason));
        Ok(())
    }
}

pub struct RejectingSink;

impl WarningSink for RejectingSink {
    fn accept(&self, _session_id: &str, _offset_ms: u64, _reason: WarningReason) -> Result<()> {
        Err(anyhow!("sink offline"))
    }
}

pub fn heuristic_settings() -> TrackingSettings {
    TrackingSettings {
        force_heuristic: true,
        ..TrackingSettings::default()
    }
}
