#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use dxvr::d3d9::{CompletionMode, D3D9Device, DeviceConfig, SwapChainDesc};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn deferred_device(swap_chain: SwapChainDesc) -> Arc<D3D9Device> {
    init_logging();
    Arc::new(
        D3D9Device::new(DeviceConfig {
            completion: CompletionMode::Deferred,
            swap_chain: Some(swap_chain),
            ..DeviceConfig::default()
        })
        .expect("device creation"),
    )
}

/// Background thread standing in for the GPU: retires submitted work `latency` after it shows
/// up, until dropped.
pub struct GpuExecutor {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<u64>>,
}

impl GpuExecutor {
    pub fn spawn(device: &Arc<D3D9Device>, latency: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let device = device.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                let timeline = device.gpu_device().timeline();
                let mut batches = 0;
                while !stop.load(Ordering::Acquire) {
                    let submitted = timeline.last_submitted();
                    if submitted > timeline.last_retired() {
                        std::thread::sleep(latency);
                        timeline.retire_through(submitted);
                        batches += 1;
                    } else {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
                timeline.retire_all();
                batches
            })
        };
        Self {
            stop,
            thread: Some(thread),
        }
    }

    /// Stop the thread and return how many batches it retired.
    pub fn finish(mut self) -> u64 {
        self.shutdown()
    }

    fn shutdown(&mut self) -> u64 {
        self.stop.store(true, Ordering::Release);
        self.thread
            .take()
            .map(|thread| thread.join().expect("gpu executor panicked"))
            .unwrap_or(0)
    }
}

impl Drop for GpuExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}
