use super::*;

/// Number of ticks between pressure samples for sound triggers
pub const SOUND_SAMPLE_TICKS: u32 = 4;
/// Pipe pressure must move by more than this between samples, psi
pub const PIPE_SOUND_BAND_PSI: f64 = 0.05;
/// Cylinder pressure must move by more than this between samples, psi
pub const CYLINDER_SOUND_BAND_PSI: f64 = 0.02;

/// Direction a sampled pressure moved since the previous sample
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, IsVariant)]
pub enum PressureTrend {
    #[default]
    Steady,
    Increasing,
    Decreasing,
}

/// Discrete brake sound cues, emitted on trend changes only
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrakeSoundEvent {
    PipePressureIncrease,
    PipePressureDecrease,
    PipePressureStoppedChanging,
    CylinderPressureIncrease,
    CylinderPressureDecrease,
    CylinderPressureStoppedChanging,
}

impl BrakeSoundEvent {
    fn pipe(trend: PressureTrend) -> Self {
        match trend {
            PressureTrend::Increasing => Self::PipePressureIncrease,
            PressureTrend::Decreasing => Self::PipePressureDecrease,
            PressureTrend::Steady => Self::PipePressureStoppedChanging,
        }
    }

    fn cylinder(trend: PressureTrend) -> Self {
        match trend {
            PressureTrend::Increasing => Self::CylinderPressureIncrease,
            PressureTrend::Decreasing => Self::CylinderPressureDecrease,
            PressureTrend::Steady => Self::CylinderPressureStoppedChanging,
        }
    }
}

/// Banded trend detector for one pressure signal
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PressureTrigger {
    /// Dead band; a zero band reacts to any change
    pub band_psi: f64,
    pub prev_sample_psi: f64,
    pub trend: PressureTrend,
}

impl PressureTrigger {
    pub fn new(band_psi: f64, initial_psi: f64) -> Self {
        Self {
            band_psi,
            prev_sample_psi: initial_psi,
            trend: PressureTrend::Steady,
        }
    }

    /// Takes a sample and returns the new trend if it changed
    pub fn sample(&mut self, value_psi: f64) -> Option<PressureTrend> {
        let delta = value_psi - self.prev_sample_psi;
        self.prev_sample_psi = value_psi;
        let trend = if delta > self.band_psi {
            PressureTrend::Increasing
        } else if delta < -self.band_psi {
            PressureTrend::Decreasing
        } else {
            PressureTrend::Steady
        };
        (trend != self.trend).then(|| {
            self.trend = trend;
            trend
        })
    }
}

/// Pipe and cylinder triggers sampled on a shared tick counter
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrakeSoundTriggers {
    pub counter: u32,
    pub pipe: PressureTrigger,
    pub cylinder: PressureTrigger,
}

impl Default for BrakeSoundTriggers {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

impl BrakeSoundTriggers {
    pub fn new(pipe_psi: f64, cylinder_psi: f64) -> Self {
        Self {
            counter: 0,
            pipe: PressureTrigger::new(PIPE_SOUND_BAND_PSI, pipe_psi),
            cylinder: PressureTrigger::new(CYLINDER_SOUND_BAND_PSI, cylinder_psi),
        }
    }

    /// Counts one tick and, on every [SOUND_SAMPLE_TICKS]th, samples both
    /// signals
    pub fn tick(&mut self, pipe_psi: f64, cylinder_psi: f64) -> Vec<BrakeSoundEvent> {
        self.counter += 1;
        if self.counter < SOUND_SAMPLE_TICKS {
            return vec![];
        }
        self.counter = 0;
        let mut events = vec![];
        if let Some(trend) = self.pipe.sample(pipe_psi) {
            events.push(BrakeSoundEvent::pipe(trend));
        }
        if let Some(trend) = self.cylinder.sample(cylinder_psi) {
            events.push(BrakeSoundEvent::cylinder(trend));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_suppresses_small_moves() {
        let mut trigger = PressureTrigger::new(PIPE_SOUND_BAND_PSI, 5.0);
        assert_eq!(trigger.sample(5.04), None);
        assert_eq!(trigger.sample(5.2), Some(PressureTrend::Increasing));
        assert_eq!(trigger.sample(5.4), None);
        assert_eq!(trigger.sample(5.41), Some(PressureTrend::Steady));
        assert_eq!(trigger.sample(5.0), Some(PressureTrend::Decreasing));
    }

    #[test]
    fn test_sub_band_noise_is_silent() {
        let mut triggers = BrakeSoundTriggers::new(5.0, 5.0);
        for i in 0..400 {
            let jitter = if (i / 4) % 2 == 0 { 0.0 } else { 1e-12 };
            let cyl = 5.0 + jitter + 0.5 * CYLINDER_SOUND_BAND_PSI * ((i / 8) % 2) as f64;
            let pipe = 5.0 + 0.5 * PIPE_SOUND_BAND_PSI * ((i / 8) % 2) as f64;
            assert!(triggers.tick(pipe, cyl).is_empty(), "tick {i}");
        }
    }

    #[test]
    fn test_samples_every_fourth_tick() {
        let mut triggers = BrakeSoundTriggers::new(5.0, 5.0);
        let mut events = vec![];
        for i in 1..=12 {
            let pressure = 5.0 + 0.1 * i as f64;
            let tick_events = triggers.tick(pressure, pressure);
            if i % 4 != 0 {
                assert!(tick_events.is_empty());
            }
            events.extend(tick_events);
        }
        // a steady ramp triggers once per signal, not once per sample
        assert_eq!(
            events,
            vec![
                BrakeSoundEvent::PipePressureIncrease,
                BrakeSoundEvent::CylinderPressureIncrease
            ]
        );
        for _ in 0..4 {
            events = triggers.tick(6.2, 6.2);
        }
        assert_eq!(
            events,
            vec![
                BrakeSoundEvent::PipePressureStoppedChanging,
                BrakeSoundEvent::CylinderPressureStoppedChanging
            ]
        );
    }
}
