//! Waveform recording for trace output.
//!
//! The [`WaveformRecorder`] trait abstracts waveform output. [`VcdRecorder`]
//! implements the IEEE 1364 Value Change Dump (VCD) format, producing text
//! files that can be viewed in GTKWave, Surfer, or other waveform viewers.
//! Timestamps are half-cycle sample indices.

use std::io::Write;

use crate::device::PortId;
use crate::error::SimError;
use crate::time::SimTime;

/// Trait for recording simulation waveforms.
///
/// Implementations write signal changes to a particular format.
pub trait WaveformRecorder {
    /// Registers a port for recording.
    fn register_signal(&mut self, id: PortId, name: &str, width: u32) -> Result<(), SimError>;

    /// Opens a new scope (hierarchy level) in the waveform.
    fn begin_scope(&mut self, name: &str) -> Result<(), SimError>;

    /// Closes the current scope.
    fn end_scope(&mut self) -> Result<(), SimError>;

    /// Records a value change at the given sample.
    fn record_change(&mut self, time: SimTime, id: PortId, value: u64) -> Result<(), SimError>;

    /// Finalizes the waveform output (flush, write trailer, etc.).
    fn finalize(&mut self) -> Result<(), SimError>;
}

/// VCD (Value Change Dump) format recorder following IEEE 1364.
///
/// Signal identifiers use printable ASCII characters starting from `!` (0x21).
pub struct VcdRecorder<W: Write> {
    writer: W,
    id_map: Vec<(PortId, String, u32)>, // (port, id_code, width)
    next_id: u32,
    header_written: bool,
    current_time: Option<SimTime>,
}

impl<W: Write> VcdRecorder<W> {
    /// Creates a new VCD recorder writing to the given output.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            id_map: Vec::new(),
            next_id: 0,
            header_written: false,
            current_time: None,
        }
    }

    /// Consumes the recorder and returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_header(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$date")?;
        writeln!(self.writer, "  Simulation date")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$version")?;
        writeln!(self.writer, "  Strobe verification harness")?;
        writeln!(self.writer, "$end")?;
        writeln!(self.writer, "$timescale")?;
        writeln!(self.writer, "  1ns")?;
        writeln!(self.writer, "$end")?;
        Ok(())
    }

    fn ensure_header(&mut self) -> Result<(), SimError> {
        if !self.header_written {
            self.write_header()?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Generates a VCD identifier code from a sequential index.
    ///
    /// Multi-character codes are generated for indices >= 94.
    fn make_id_code(index: u32) -> String {
        let mut result = String::new();
        let mut idx = index;
        loop {
            let c = (b'!' + (idx % 94) as u8) as char;
            result.push(c);
            idx /= 94;
            if idx == 0 {
                break;
            }
            idx -= 1;
        }
        result
    }

    /// Formats a value as a VCD scalar (`0`/`1`) or binary vector (`b1010`).
    fn format_value(value: u64, width: u32) -> String {
        if width == 1 {
            if value & 1 == 1 { "1" } else { "0" }.into()
        } else {
            format!("b{:0width$b}", value, width = width as usize)
        }
    }
}

impl<W: Write> WaveformRecorder for VcdRecorder<W> {
    fn register_signal(&mut self, id: PortId, name: &str, width: u32) -> Result<(), SimError> {
        let id_code = Self::make_id_code(self.next_id);
        self.next_id += 1;

        writeln!(self.writer, "$var wire {width} {id_code} {name} $end")?;

        self.id_map.push((id, id_code, width));
        Ok(())
    }

    fn begin_scope(&mut self, name: &str) -> Result<(), SimError> {
        self.ensure_header()?;
        writeln!(self.writer, "$scope module {name} $end")?;
        Ok(())
    }

    fn end_scope(&mut self) -> Result<(), SimError> {
        writeln!(self.writer, "$upscope $end")?;
        Ok(())
    }

    fn record_change(&mut self, time: SimTime, id: PortId, value: u64) -> Result<(), SimError> {
        self.ensure_header()?;

        if self.current_time != Some(time) {
            if self.current_time.is_none() {
                writeln!(self.writer, "$enddefinitions $end")?;
                writeln!(self.writer, "$dumpvars")?;
            }
            writeln!(self.writer, "#{}", time.samples())?;
            self.current_time = Some(time);
        }

        let (_, id_code, width) = self
            .id_map
            .iter()
            .find(|(pid, _, _)| *pid == id)
            .ok_or(SimError::UnregisteredPort(id))?;

        let val_str = Self::format_value(value, *width);
        if *width == 1 {
            writeln!(self.writer, "{val_str}{id_code}")?;
        } else {
            writeln!(self.writer, "{val_str} {id_code}")?;
        }
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), SimError> {
        if self.current_time.is_none() {
            self.ensure_header()?;
            writeln!(self.writer, "$enddefinitions $end")?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
