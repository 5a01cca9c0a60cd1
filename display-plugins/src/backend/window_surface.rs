use display_plugins_api::Batch;
use display_plugins_api::Error;
use display_plugins_api::SurfacePtr;
use euclid::default::Size2D;

/// The window a backend presents into, and its context discipline.
pub struct WindowSurface {
    surface: SurfacePtr,
}

impl WindowSurface {
    pub fn new(surface: SurfacePtr) -> WindowSurface {
        WindowSurface { surface }
    }

    pub fn surface(&self) -> &SurfacePtr {
        &self.surface
    }

    /// Makes the context current. Pair with `end_frame`.
    pub fn begin_frame(&self) -> Result<(), Error> {
        self.surface.make_current().map_err(|err| {
            error!("Failed to make window current ({})", err);
            err
        })
    }

    /// Optionally swaps, then releases the context.
    pub fn end_frame(&self, swap: bool) {
        if swap {
            if let Err(err) = self.surface.swap_buffers() {
                warn!("Swap failed ({})", err);
            }
        }
        self.surface.done_current();
    }

    pub fn render(&self, batch: Batch) {
        if !batch.is_empty() {
            self.surface.render(batch);
        }
    }

    pub fn size(&self) -> Size2D<u32> {
        self.surface.size()
    }

    pub fn device_pixel_ratio(&self) -> f32 {
        self.surface.device_pixel_ratio()
    }

    pub fn has_focus(&self) -> bool {
        self.surface.has_focus()
    }

    /// Returns whether vsync ended up enabled, which drivers may overrule.
    pub fn enable_vsync(&self, enable: bool) -> bool {
        let enabled = self.surface.set_vsync(enable);
        if enabled != enable {
            info!("Requested vsync {} but the driver kept it {}", on_off(enable), on_off(enabled));
        } else {
            debug!("Vsync {}", on_off(enabled));
        }
        enabled
    }

    pub fn is_vsync_enabled(&self) -> bool {
        self.surface.is_vsync_enabled()
    }

    pub fn set_fullscreen(&self, fullscreen: bool) {
        debug!("Fullscreen {}", on_off(fullscreen));
        self.surface.set_fullscreen(fullscreen);
    }

    pub fn set_visible(&self, visible: bool) {
        self.surface.set_visible(visible);
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
