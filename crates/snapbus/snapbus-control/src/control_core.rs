// ControlCore: InputBus -> ControlBus
//
// Services downstream (motor, horn, lights) never look at raw button levels.
// This layer reads the latest input snapshot, applies the policy and
// publishes the resolved command. It is the single writer of the control bus.
//
// Policy:
//   accelerator held  -> 100 % throttle, otherwise 0 %
//   horn held         -> horn on
//   left indicator    -> Left (wins if both indicator buttons are held)
//   right indicator   -> Right

use snapbus_events::{ButtonIndex, ButtonSet, ControlSnapshot, Indicator, InputState};
use snapbus_icc::{Relax, SnapshotReader, SnapshotWriter, ThreadYield};
use tracing::debug;

const MIN_PCT: f32 = 0.0;
const MAX_PCT: f32 = 100.0;

pub struct ControlCore<R = ThreadYield> {
    input: SnapshotReader<InputState, R>,
    output: SnapshotWriter<ControlSnapshot, R>,
    prev: Option<InputState>,
}

impl<R: Relax> ControlCore<R> {
    pub fn new(
        input: SnapshotReader<InputState, R>,
        output: SnapshotWriter<ControlSnapshot, R>,
    ) -> Self {
        Self {
            input,
            output,
            prev: None,
        }
    }

    /// Pure policy: one input scan to one command.
    pub fn resolve(cur: &InputState) -> ControlSnapshot {
        let buttons = cur.buttons;
        let indicator_cmd = if buttons.test(ButtonIndex::IndicatorLeft) {
            Indicator::Left
        } else if buttons.test(ButtonIndex::IndicatorRight) {
            Indicator::Right
        } else {
            Indicator::Off
        };

        ControlSnapshot {
            throttle_cmd_pct: if buttons.test(ButtonIndex::Accelerator) {
                MAX_PCT
            } else {
                MIN_PCT
            },
            horn_cmd: buttons.test(ButtonIndex::Horn),
            indicator_cmd,
            stamp_ms: cur.stamp_ms,
        }
    }

    /// Reads the latest input, logs button edges and publishes the command.
    pub fn step(&mut self) -> ControlSnapshot {
        let cur = self.input.peek();
        if let Some(prev) = self.prev {
            log_button_events(prev.buttons, cur.buttons);
        }

        let out = Self::resolve(&cur);
        self.output.publish(out);
        self.prev = Some(cur);
        out
    }

    pub fn output(&self) -> SnapshotReader<ControlSnapshot, R> {
        self.output.reader()
    }
}

fn log_button_events(prev: ButtonSet, cur: ButtonSet) {
    let changed = prev.changed(cur);
    if changed.is_empty() {
        return;
    }
    for button in ButtonIndex::ALL {
        if changed.test(button) {
            let pressed = cur.test(button);
            debug!(?button, pressed, "button edge");
        }
    }
}
