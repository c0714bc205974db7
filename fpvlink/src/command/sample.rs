//! Controller sampling and input scaling.

/// Lowest value an axis reports.
const IN_MIN: f32 = -1.0;
/// Highest value an axis reports.
const IN_MAX: f32 = 1.0;
/// Wire value for a fully released / fully negative input.
const OUT_MIN: f32 = 0.0;
/// Wire value for a fully pressed / fully positive input.
const OUT_MAX: f32 = 255.0;

/// A joystick or gamepad as seen by the command path.
///
/// Implemented by the input-device driver; the link only reads it.
pub trait ControllerSource {
    /// Pumps the device's event queue so the next reads are current.
    fn refresh(&mut self) {}

    fn axis_count(&self) -> usize;

    fn button_count(&self) -> usize;

    fn hat_count(&self) -> usize;

    /// Axis position in `[-1.0, 1.0]`.
    fn axis(&self, index: usize) -> f32;

    fn button(&self, index: usize) -> bool;

    /// Hat position as `(x, y)`, each in `{-1, 0, 1}`.
    fn hat(&self, index: usize) -> (i8, i8);
}

/// Maps an axis position in `[-1.0, 1.0]` onto `0..=255`, rounding to the
/// nearest integer. Out-of-range input is clamped.
#[must_use]
pub fn scale_axis(value: f32) -> u8 {
    let clamped = value.clamp(IN_MIN, IN_MAX);
    let scaled = (OUT_MAX - OUT_MIN) * ((clamped - IN_MIN) / (IN_MAX - IN_MIN)) + OUT_MIN;
    // Saturating float-to-int cast; NaN maps to 0.
    scaled.round() as u8
}

#[must_use]
pub const fn scale_button(pressed: bool) -> u8 {
    if pressed { u8::MAX } else { u8::MIN }
}

/// One scaled snapshot of every controller input.
///
/// Layout: all axes, then all buttons, then an `(x, y)` pair per hat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSample {
    values: Vec<u8>,
    axes: usize,
    buttons: usize,
}

impl ControllerSample {
    /// Refreshes `source` and reads every input.
    pub fn capture<S: ControllerSource + ?Sized>(source: &mut S) -> Self {
        source.refresh();
        let axes = source.axis_count();
        let buttons = source.button_count();
        let hats = source.hat_count();

        let mut values = Vec::with_capacity(axes + buttons + hats * 2);
        values.extend((0..axes).map(|i| scale_axis(source.axis(i))));
        values.extend((0..buttons).map(|i| scale_button(source.button(i))));
        for i in 0..hats {
            let (x, y) = source.hat(i);
            values.push(scale_axis(f32::from(x)));
            values.push(scale_axis(f32::from(y)));
        }

        Self {
            values,
            axes,
            buttons,
        }
    }

    #[must_use]
    pub fn axis(&self, index: usize) -> Option<u8> {
        (index < self.axes).then(|| self.values[index])
    }

    #[must_use]
    pub fn button(&self, index: usize) -> Option<u8> {
        (index < self.buttons).then(|| self.values[self.axes + index])
    }

    #[must_use]
    pub fn hat(&self, index: usize) -> Option<(u8, u8)> {
        let at = self.axes + self.buttons + index * 2;
        self.values.get(at..at + 2).map(|pair| (pair[0], pair[1]))
    }

    #[must_use]
    pub const fn axis_count(&self) -> usize {
        self.axes
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.values
    }
}

/// Controller with every input at rest.
///
/// Stands in for a real device when the station runs without one.
#[derive(Debug, Clone, PartialEq)]
pub struct NeutralController {
    axes: Vec<f32>,
    buttons: usize,
    hats: usize,
}

impl NeutralController {
    #[must_use]
    pub fn new(axes: usize, buttons: usize, hats: usize) -> Self {
        Self {
            axes: vec![0.0; axes],
            buttons,
            hats,
        }
    }

    /// Six-axis gamepad: sticks centred, analog triggers (axes 4 and 5)
    /// released.
    #[must_use]
    pub fn gamepad() -> Self {
        Self::new(6, 0, 0).with_axis(4, -1.0).with_axis(5, -1.0)
    }

    /// Holds axis `index` at `value`. Ignored if the axis does not exist.
    #[must_use]
    pub fn with_axis(mut self, index: usize, value: f32) -> Self {
        if let Some(axis) = self.axes.get_mut(index) {
            *axis = value;
        }
        self
    }
}

impl ControllerSource for NeutralController {
    fn axis_count(&self) -> usize {
        self.axes.len()
    }

    fn button_count(&self) -> usize {
        self.buttons
    }

    fn hat_count(&self) -> usize {
        self.hats
    }

    fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    fn button(&self, _index: usize) -> bool {
        false
    }

    fn hat(&self, _index: usize) -> (i8, i8) {
        (0, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pad {
        axes: Vec<f32>,
        buttons: Vec<bool>,
        hats: Vec<(i8, i8)>,
        refreshed: usize,
    }

    impl ControllerSource for Pad {
        fn refresh(&mut self) {
            self.refreshed += 1;
        }
        fn axis_count(&self) -> usize {
            self.axes.len()
        }
        fn button_count(&self) -> usize {
            self.buttons.len()
        }
        fn hat_count(&self) -> usize {
            self.hats.len()
        }
        fn axis(&self, index: usize) -> f32 {
            self.axes[index]
        }
        fn button(&self, index: usize) -> bool {
            self.buttons[index]
        }
        fn hat(&self, index: usize) -> (i8, i8) {
            self.hats[index]
        }
    }

    #[test]
    fn axis_scaling_endpoints() {
        assert_eq!(scale_axis(-1.0), 0);
        assert_eq!(scale_axis(0.0), 128);
        assert_eq!(scale_axis(1.0), 255);
        assert_eq!(scale_axis(0.5), 191);
        assert_eq!(scale_axis(-0.5), 64);
    }

    #[test]
    fn axis_scaling_clamps() {
        assert_eq!(scale_axis(-3.0), 0);
        assert_eq!(scale_axis(1.5), 255);
        assert_eq!(scale_axis(f32::NAN), 0);
    }

    #[test]
    fn buttons_scale_to_extremes() {
        assert_eq!(scale_button(false), 0);
        assert_eq!(scale_button(true), 255);
    }

    #[test]
    fn capture_layout() {
        let mut pad = Pad {
            axes: vec![-1.0, 1.0],
            buttons: vec![true, false, true],
            hats: vec![(-1, 1)],
            refreshed: 0,
        };
        let sample = ControllerSample::capture(&mut pad);
        assert_eq!(pad.refreshed, 1);
        assert_eq!(sample.as_slice(), &[0, 255, 255, 0, 255, 0, 255]);
        assert_eq!(sample.axis(1), Some(255));
        assert_eq!(sample.axis(2), None);
        assert_eq!(sample.button(2), Some(255));
        assert_eq!(sample.hat(0), Some((0, 255)));
        assert_eq!(sample.hat(1), None);
    }

    #[test]
    fn neutral_gamepad_releases_triggers() {
        let sample = ControllerSample::capture(&mut NeutralController::gamepad());
        assert_eq!(sample.as_slice(), &[128, 128, 128, 128, 0, 0]);
    }
}
