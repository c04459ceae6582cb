//! Test and helper mocks for vcu_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use vcu_traits::{CanBus, CanFrame, InputSample, Inputs};

/// A bus with nothing on it: receives nothing, accepts every transmit.
pub struct NoopBus;

impl CanBus for NoopBus {
    fn receive(&mut self) -> Result<Option<CanFrame>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(None)
    }

    fn transmit(
        &mut self,
        _frame: &CanFrame,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Records every transmitted frame and serves queued receive frames.
/// The shared handle lets a test inspect traffic while the session owns the
/// bus itself.
#[derive(Clone, Default)]
pub struct RecordingBus {
    inner: Arc<Mutex<RecordingBusInner>>,
}

#[derive(Default)]
struct RecordingBusInner {
    sent: Vec<CanFrame>,
    rx_queue: VecDeque<CanFrame>,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<CanFrame> {
        self.inner.lock().map(|g| g.sent.clone()).unwrap_or_default()
    }

    pub fn sent_with_id(&self, id: u32) -> Vec<CanFrame> {
        self.sent().into_iter().filter(|f| f.id == id).collect()
    }

    /// Queue a frame for the next `receive` call.
    pub fn inject(&self, frame: CanFrame) {
        if let Ok(mut g) = self.inner.lock() {
            g.rx_queue.push_back(frame);
        }
    }
}

impl CanBus for RecordingBus {
    fn receive(&mut self) -> Result<Option<CanFrame>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.inner.lock().ok().and_then(|mut g| g.rx_queue.pop_front()))
    }

    fn transmit(
        &mut self,
        frame: &CanFrame,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Ok(mut g) = self.inner.lock() {
            g.sent.push(*frame);
        }
        Ok(())
    }
}

/// Inputs that always read the same sample.
pub struct FixedInputs(pub InputSample);

impl Inputs for FixedInputs {
    fn sample(&mut self) -> Result<InputSample, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.0)
    }
}

/// Inputs driven from a shared cell so a test can change pedal positions
/// while the session runs.
#[derive(Clone, Default)]
pub struct SharedInputs {
    cell: Arc<Mutex<InputSample>>,
}

impl SharedInputs {
    pub fn new(initial: InputSample) -> Self {
        Self {
            cell: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn set(&self, sample: InputSample) {
        if let Ok(mut g) = self.cell.lock() {
            *g = sample;
        }
    }
}

impl Inputs for SharedInputs {
    fn sample(&mut self) -> Result<InputSample, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .cell
            .lock()
            .map(|g| *g)
            .unwrap_or_default())
    }
}
