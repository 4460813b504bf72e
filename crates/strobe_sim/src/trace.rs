//! Scoped trace output for a harness run.
//!
//! A [`TraceSink`] receives one snapshot of the device interface per
//! half-cycle and forwards only the ports whose value changed to its
//! [`WaveformRecorder`]. The sink is closed exactly once, either explicitly
//! through [`TraceSink::close`] or when it is dropped.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::device::{PortId, PORTS, PORT_COUNT};
use crate::error::SimError;
use crate::time::SimTime;
use crate::waveform::{VcdRecorder, WaveformRecorder};

/// Name of the scope holding every interface signal.
pub const TRACE_SCOPE: &str = "dut";

/// Append-only recorder of per-half-cycle port snapshots.
pub struct TraceSink {
    recorder: Option<Box<dyn WaveformRecorder>>,
    last: Option<[u64; PORT_COUNT]>,
    samples: u64,
    closed: bool,
}

impl TraceSink {
    /// A sink that counts samples but writes nothing.
    pub fn disabled() -> Self {
        Self {
            recorder: None,
            last: None,
            samples: 0,
            closed: false,
        }
    }

    /// Wraps a recorder, declaring every interface port under [`TRACE_SCOPE`].
    pub fn with_recorder(mut recorder: Box<dyn WaveformRecorder>) -> Result<Self, SimError> {
        recorder.begin_scope(TRACE_SCOPE)?;
        for (index, info) in PORTS.iter().enumerate() {
            recorder.register_signal(PortId::from_raw(index as u32), info.name, info.width)?;
        }
        recorder.end_scope()?;
        Ok(Self {
            recorder: Some(recorder),
            ..Self::disabled()
        })
    }

    /// A VCD sink writing to an arbitrary output.
    pub fn vcd<W: Write + 'static>(writer: W) -> Result<Self, SimError> {
        Self::with_recorder(Box::new(VcdRecorder::new(writer)))
    }

    /// Creates (or truncates) a VCD file at `path`.
    pub fn create(path: &Path) -> Result<Self, SimError> {
        let file = File::create(path)?;
        Self::vcd(BufWriter::new(file))
    }

    /// Whether samples are currently being written anywhere.
    pub fn is_enabled(&self) -> bool {
        self.recorder.is_some()
    }

    /// Number of samples accepted so far, written or not.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Records one half-cycle snapshot.
    ///
    /// On a recorder failure the sink disables itself and returns the error;
    /// later samples are still counted but no longer written.
    pub fn record(&mut self, time: SimTime, values: [u64; PORT_COUNT]) -> Result<(), SimError> {
        if self.closed {
            return Err(SimError::TraceClosed {
                sample: time.samples(),
            });
        }
        self.samples += 1;

        let Some(recorder) = self.recorder.as_mut() else {
            return Ok(());
        };
        let result = Self::write_changes(&mut **recorder, self.last.as_ref(), time, &values);
        if result.is_err() {
            self.recorder = None;
        }
        self.last = Some(values);
        result
    }

    fn write_changes(
        recorder: &mut dyn WaveformRecorder,
        last: Option<&[u64; PORT_COUNT]>,
        time: SimTime,
        values: &[u64; PORT_COUNT],
    ) -> Result<(), SimError> {
        for (index, value) in values.iter().enumerate() {
            if last.is_some_and(|prev| prev[index] == *value) {
                continue;
            }
            recorder.record_change(time, PortId::from_raw(index as u32), *value)?;
        }
        Ok(())
    }

    /// Finalizes the output. Later calls are no-ops.
    pub fn close(&mut self) -> Result<(), SimError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.recorder.take() {
            Some(mut recorder) => recorder.finalize(),
            None => Ok(()),
        }
    }
}

impl Drop for TraceSink {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            tracing::error!(%err, "failed to close trace");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn values_with(index: usize, value: u64) -> [u64; PORT_COUNT] {
        let mut values = [0; PORT_COUNT];
        values[index] = value;
        values
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn disabled_sink_counts_samples() {
        let mut sink = TraceSink::disabled();
        assert!(!sink.is_enabled());
        sink.record(SimTime::ZERO, [0; PORT_COUNT]).unwrap();
        sink.record(SimTime::from_samples(1), [0; PORT_COUNT]).unwrap();
        assert_eq!(sink.samples(), 2);
    }

    #[test]
    fn record_after_close_is_rejected() {
        let mut sink = TraceSink::disabled();
        sink.close().unwrap();
        let err = sink.record(SimTime::from_samples(3), [0; PORT_COUNT]).unwrap_err();
        assert!(matches!(err, SimError::TraceClosed { sample: 3 }));
    }

    #[test]
    fn close_is_idempotent() {
        let mut sink = TraceSink::disabled();
        sink.close().unwrap();
        sink.close().unwrap();
    }

    #[test]
    fn file_trace_declares_all_ports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.vcd");
        let mut sink = TraceSink::create(&path).unwrap();
        sink.record(SimTime::ZERO, [0; PORT_COUNT]).unwrap();
        sink.close().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("$scope module dut $end"));
        for info in PORTS {
            assert!(text.contains(&format!(" {} $end", info.name)), "{}", info.name);
        }
    }

    #[test]
    fn only_changes_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.vcd");
        let mut sink = TraceSink::create(&path).unwrap();
        sink.record(SimTime::ZERO, [0; PORT_COUNT]).unwrap();
        sink.record(SimTime::from_samples(1), [0; PORT_COUNT]).unwrap();
        sink.record(SimTime::from_samples(2), values_with(0, 1)).unwrap();
        drop(sink);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("#0\n"));
        assert!(!text.contains("#1\n"));
        assert!(text.contains("#2\n1!"));
    }

    #[test]
    fn drop_finalizes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.vcd");
        {
            let mut sink = TraceSink::create(&path).unwrap();
            sink.record(SimTime::ZERO, values_with(1, 1)).unwrap();
        }
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("$dumpvars"));
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn failing_writer_is_reported_at_open() {
        let err = TraceSink::vcd(FailingWriter).err().unwrap();
        assert!(matches!(err, SimError::WaveformIo(_)));
    }

    #[test]
    fn recorder_failure_mid_run_disables_sink() {
        struct FailAfterHeader;
        impl WaveformRecorder for FailAfterHeader {
            fn register_signal(&mut self, _: PortId, _: &str, _: u32) -> Result<(), SimError> {
                Ok(())
            }
            fn begin_scope(&mut self, _: &str) -> Result<(), SimError> {
                Ok(())
            }
            fn end_scope(&mut self) -> Result<(), SimError> {
                Ok(())
            }
            fn record_change(&mut self, _: SimTime, _: PortId, _: u64) -> Result<(), SimError> {
                Err(io::Error::new(io::ErrorKind::Other, "gone").into())
            }
            fn finalize(&mut self) -> Result<(), SimError> {
                Ok(())
            }
        }

        let mut sink = TraceSink::with_recorder(Box::new(FailAfterHeader)).unwrap();
        assert!(sink.is_enabled());
        assert!(sink.record(SimTime::ZERO, [0; PORT_COUNT]).is_err());
        assert!(!sink.is_enabled());
        sink.record(SimTime::from_samples(1), [0; PORT_COUNT]).unwrap();
        assert_eq!(sink.samples(), 2);
    }
}
