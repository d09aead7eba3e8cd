use fxhash::FxHashSet;
use ndarray::Array2;

/// The set of facility event codes attached to a single frame.
///
/// Event codes are small integer tags describing beamline state (laser fired,
/// shutter open, etc.). They are produced per-frame by the facility layer and
/// consumed once, so a cheap hash set is all that is needed.
pub type EventCodeSet = FxHashSet<u32>;

/// One retrieved detector event: the frame itself plus its per-event metadata.
///
/// The frame is stored in 'slab' layout, one contiguous row-major 2D array
/// regardless of the physical sensor tiling. The timestamp is the facility
/// clock in epoch seconds. Both metadata fields are auxiliary; a missing
/// timestamp or code set upstream degrades to the defaults here rather than
/// failing the event.
#[derive(Debug, Clone, Default)]
pub struct FrameEvent {
    pub data: Array2<f64>,
    pub timestamp: f64,
    pub event_codes: EventCodeSet,
}

impl FrameEvent {
    pub fn new(data: Array2<f64>, timestamp: f64, event_codes: EventCodeSet) -> Self {
        Self {
            data,
            timestamp,
            event_codes,
        }
    }
}
