/// Energy consumed between two cumulative readings. Never persisted.
///
/// Negative when the counter went backwards (reset, reading error); the
/// value is reported as measured.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionDelta {
    pub start_kwh: f64,
    pub end_kwh: f64,
}

impl ConsumptionDelta {
    pub fn between(start_kwh: f64, end_kwh: f64) -> Self {
        Self { start_kwh, end_kwh }
    }

    pub fn kwh(&self) -> f64 {
        self.end_kwh - self.start_kwh
    }

    pub fn is_negative(&self) -> bool {
        self.kwh() < 0.0
    }
}
