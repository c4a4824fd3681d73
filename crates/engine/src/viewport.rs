use tracing::trace;

/// Host viewport the engine can pan. Implemented outside this crate.
pub trait Viewport {
    /// Screen pixels per world unit.
    fn scale_factor(&self) -> f64;

    /// Current top-left corner in world units.
    fn position(&self) -> (f64, f64);

    fn set_viewport(&mut self, x: f64, y: f64);
}

/// Pans horizontally by `dx_px` screen pixels.
///
/// A zero or non-finite scale factor leaves the viewport untouched.
pub fn pan_by_pixels<V>(viewport: &mut V, dx_px: f64)
where
    V: Viewport + ?Sized,
{
    let scale = viewport.scale_factor();
    if !scale.is_finite() || scale == 0.0 || !dx_px.is_finite() {
        trace!(scale, dx_px, "pan skipped");
        return;
    }
    let (x, y) = viewport.position();
    viewport.set_viewport(x + dx_px / scale, y);
}

#[cfg(test)]
mod tests {
    use super::{Viewport, pan_by_pixels};

    #[test]
    fn pans_by_world_units() {
        let mut viewport = MockViewport {
            scale: 2.0,
            x: 10.0,
            y: 5.0,
        };

        pan_by_pixels(&mut viewport, 150.0);
        assert_eq!((viewport.x, viewport.y), (85.0, 5.0));
    }

    #[test]
    fn zero_scale_is_a_no_op() {
        let mut viewport = MockViewport {
            scale: 0.0,
            x: 10.0,
            y: 5.0,
        };

        pan_by_pixels(&mut viewport, 150.0);
        assert_eq!(viewport.x, 10.0);
    }

    struct MockViewport {
        scale: f64,
        x: f64,
        y: f64,
    }

    impl Viewport for MockViewport {
        fn scale_factor(&self) -> f64 {
            self.scale
        }

        fn position(&self) -> (f64, f64) {
            (self.x, self.y)
        }

        fn set_viewport(&mut self, x: f64, y: f64) {
            self.x = x;
            self.y = y;
        }
    }
}
