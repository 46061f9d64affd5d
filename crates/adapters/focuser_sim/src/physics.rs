//! Simulated optics: star FWHM as a function of focuser position.
//!
//! The focus curve is a parabola centred on the middle of the travel range,
//! offset by the atmospheric seeing:
//!
//! ```text
//! ticks = init_ticks + (position - mid) / 5000
//! fwhm  = max(seeing, 0.5625 * ticks^2 + seeing)
//! ```
//!
//! `init_ticks` is chosen so the middle position yields the initial FWHM
//! under the initial seeing.

const TICKS_PER_STEP: f64 = 5000.0;
const CURVATURE: f64 = 0.5625;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optics {
    init_ticks: f64,
    mid: f64,
}

impl Optics {
    /// Calibrate for a travel range and the initial FWHM and seeing.
    #[must_use]
    pub fn new(min: f64, max: f64, initial_fwhm: f64, initial_seeing: f64) -> Self {
        let excess = (initial_fwhm - initial_seeing).max(0.0);
        Self {
            init_ticks: excess.sqrt() / CURVATURE.sqrt(),
            mid: (max - min) / 2.0,
        }
    }

    #[must_use]
    pub fn init_ticks(&self) -> f64 {
        self.init_ticks
    }

    #[must_use]
    pub fn mid(&self) -> f64 {
        self.mid
    }

    /// Focus-curve abscissa for a position.
    #[must_use]
    pub fn ticks(&self, position: f64) -> f64 {
        self.init_ticks + (position - self.mid) / TICKS_PER_STEP
    }

    /// FWHM seen at `position`, never better than the seeing.
    #[must_use]
    pub fn fwhm(&self, position: f64, seeing: f64) -> f64 {
        let ticks = self.ticks(position);
        (CURVATURE * ticks * ticks + seeing).max(seeing)
    }
}
