use display_plugins_api::utils;
use display_plugins_api::Error;
use display_plugins_api::HmdDevice;
use display_plugins_api::HmdDevicePtr;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::Mutex;

/// One vendor runtime session shared by every subsystem that needs it.
///
/// The device is acquired when the first lease is opened and released when
/// the last lease is dropped.
pub struct VendorSession {
    device: HmdDevicePtr,
    leases: Mutex<usize>,
}

impl VendorSession {
    pub fn new(device: HmdDevicePtr) -> Arc<VendorSession> {
        Arc::new(VendorSession {
            device,
            leases: Mutex::new(0),
        })
    }

    pub fn device(&self) -> &HmdDevicePtr {
        &self.device
    }

    pub fn open(self: &Arc<Self>) -> Result<SessionLease, Error> {
        let mut leases = utils::lock(&self.leases);
        if *leases == 0 {
            self.device.acquire()?;
            info!("Acquired {} session", self.device.name());
        }
        *leases += 1;
        Ok(SessionLease {
            session: self.clone(),
        })
    }

    pub fn lease_count(&self) -> usize {
        *utils::lock(&self.leases)
    }
}

pub struct SessionLease {
    session: Arc<VendorSession>,
}

impl Deref for SessionLease {
    type Target = dyn HmdDevice;

    fn deref(&self) -> &Self::Target {
        &*self.session.device
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        let mut leases = utils::lock(&self.session.leases);
        *leases -= 1;
        if *leases == 0 {
            self.session.device.release();
            info!("Released {} session", self.session.device.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use display_plugins_api::{Eye, EyeRenderDesc, SubmitLayer, TrackingState};
    use euclid::default::{Size2D, Transform3D};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingDevice {
        acquired: AtomicUsize,
        released: AtomicUsize,
        fail: AtomicBool,
    }

    impl HmdDevice for CountingDevice {
        fn name(&self) -> &str {
            "Counting"
        }
        fn is_available(&self) -> bool {
            true
        }
        fn acquire(&self) -> Result<(), Error> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::DeviceUnavailable("busy".into()));
            }
            self.acquired.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn release(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
        fn recommended_render_size(&self) -> Size2D<u32> {
            Size2D::new(2048, 1024)
        }
        fn render_desc(&self, _eye: Eye, _near: f32, _far: f32) -> EyeRenderDesc {
            EyeRenderDesc {
                projection: Transform3D::identity(),
                eye_to_head: Transform3D::identity(),
            }
        }
        fn predicted_display_time(&self, _frame_index: u32) -> f64 {
            0.0
        }
        fn tracking_state(&self, _time: f64) -> TrackingState {
            TrackingState::default()
        }
        fn submit(&self, _frame_index: u32, _layer: &SubmitLayer) -> Result<(), Error> {
            Ok(())
        }
    }

    #[test]
    fn acquires_once_for_many_leases() {
        let device = Arc::new(CountingDevice::default());
        let session = VendorSession::new(device.clone());
        let display = session.open().unwrap();
        let input = session.open().unwrap();
        assert_eq!(device.acquired.load(Ordering::SeqCst), 1);
        assert_eq!(session.lease_count(), 2);
        drop(display);
        assert_eq!(device.released.load(Ordering::SeqCst), 0);
        assert_eq!(input.name(), "Counting");
        drop(input);
        assert_eq!(device.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_acquire_opens_no_lease() {
        let device = Arc::new(CountingDevice::default());
        device.fail.store(true, Ordering::SeqCst);
        let session = VendorSession::new(device.clone());
        assert!(session.open().is_err());
        assert_eq!(session.lease_count(), 0);
        assert_eq!(device.released.load(Ordering::SeqCst), 0);
    }
}
