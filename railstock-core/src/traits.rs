use crate::imports::*;

mod serde_api;
pub use serde_api::*;

/// Fixed-order, versioned binary persistence of a component's scalar state.
///
/// The snapshot field order is part of the save file format and must not be
/// reordered between versions.
pub trait SaveRestore {
    /// Plain struct holding the persisted fields in save-file order
    type Snapshot: Serialize + for<'de> Deserialize<'de>;
    /// Format version written ahead of the snapshot
    const SAVE_VERSION: u16 = 1;

    /// Capture persisted fields
    fn snapshot(&self) -> Self::Snapshot;

    /// Overwrite persisted fields from `snapshot`
    fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()>;

    /// Write version and snapshot to `wtr` using bincode
    fn save<W: Write>(&self, wtr: &mut W) -> anyhow::Result<()> {
        bincode::serialize_into(&mut *wtr, &Self::SAVE_VERSION)
            .with_context(|| format_dbg!())?;
        bincode::serialize_into(&mut *wtr, &self.snapshot()).with_context(|| format_dbg!())?;
        Ok(())
    }

    /// Read version and snapshot from `rdr` and apply them
    fn restore<R: Read>(&mut self, rdr: &mut R) -> anyhow::Result<()> {
        let version: u16 = bincode::deserialize_from(&mut *rdr).with_context(|| format_dbg!())?;
        if version != Self::SAVE_VERSION {
            return Err(Error::SerdeError(format!(
                "{}\nsave version {} does not match expected version {}",
                format_dbg!(),
                version,
                Self::SAVE_VERSION
            ))
            .into());
        }
        let snapshot: Self::Snapshot =
            bincode::deserialize_from(&mut *rdr).with_context(|| format_dbg!())?;
        self.apply_snapshot(snapshot)
    }
}

/// Pushes the current state into the component's history
pub trait SaveState {
    /// Saves state if the step counter is on the save interval
    fn save_state(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        count: u32,
        level: f64,
    }

    impl SaveRestore for Counter {
        type Snapshot = (u32, f64);

        fn snapshot(&self) -> Self::Snapshot {
            (self.count, self.level)
        }

        fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
            (self.count, self.level) = snapshot;
            Ok(())
        }
    }

    struct CounterV2(Counter);

    impl SaveRestore for CounterV2 {
        type Snapshot = (u32, f64);
        const SAVE_VERSION: u16 = 2;

        fn snapshot(&self) -> Self::Snapshot {
            self.0.snapshot()
        }

        fn apply_snapshot(&mut self, snapshot: Self::Snapshot) -> anyhow::Result<()> {
            self.0.apply_snapshot(snapshot)
        }
    }

    #[test]
    fn test_version_written_first() {
        let counter = Counter {
            count: 3,
            level: 0.5,
        };
        let mut buf = Vec::new();
        counter.save(&mut buf).unwrap();
        assert_eq!(&buf[..2], &1u16.to_le_bytes());

        let mut restored = Counter::default();
        restored.restore(&mut buf.as_slice()).unwrap();
        assert_eq!(restored.count, 3);
        assert_eq!(restored.level, 0.5);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut buf = Vec::new();
        Counter::default().save(&mut buf).unwrap();
        let err = CounterV2(Counter::default())
            .restore(&mut buf.as_slice())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::SerdeError(_))
        ));
    }

    #[test]
    fn test_truncated_stream_fails() {
        let mut buf = Vec::new();
        Counter::default().save(&mut buf).unwrap();
        buf.truncate(5);
        assert!(Counter::default().restore(&mut buf.as_slice()).is_err());
    }
}
