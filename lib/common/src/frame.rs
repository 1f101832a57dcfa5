use bincode::{Decode, Encode};
use heapless::Vec;
use crate::{CommandError, BINCODE_CFG};

/// Largest frame on either channel, length byte included. A full `Config` dump is the
/// longest message. The length byte caps it at 256.
pub const MAX_FRAME: usize = 128;

/// Writes `value` as one frame: a length byte followed by the bincode payload.
pub fn encode_frame<T: Encode>(value: T, buf: &mut [u8]) -> Result<usize, CommandError> {
    let end = buf.len().min(u8::MAX as usize + 1);
    if end < 2 {
        return Err(CommandError::Encode);
    }
    let length = bincode::encode_into_slice(value, &mut buf[1..end], BINCODE_CFG)
        .map_err(|_| CommandError::Encode)?;
    buf[0] = length as u8;
    Ok(length + 1)
}

/// Collects bytes from a stream channel and splits them back into frames.
pub struct FrameReader<const N: usize> {
    buf: Vec<u8, N>,
}

impl<const N: usize> FrameReader<N> {
    pub const fn new() -> Self {
        FrameReader { buf: Vec::new() }
    }

    /// Free space, so the caller never reads more than fits.
    pub fn available(&self) -> usize {
        N - self.buf.len()
    }

    pub fn extend(&mut self, bytes: &[u8]) -> Result<(), CommandError> {
        if self.buf.extend_from_slice(bytes).is_err() {
            // resync from the next write
            self.buf.clear();
            return Err(CommandError::Decode);
        }
        Ok(())
    }

    /// Next complete frame, if one is buffered.
    pub fn poll<T: Decode<()>>(&mut self) -> Option<Result<T, CommandError>> {
        let length = *self.buf.first()? as usize;
        if length + 1 > N {
            self.buf.clear();
            return Some(Err(CommandError::Decode));
        }
        if self.buf.len() < length + 1 {
            return None;
        }

        let result = bincode::decode_from_slice(&self.buf[1..=length], BINCODE_CFG)
            .map(|(value, _)| value)
            .map_err(|_| CommandError::Decode);
        self.consume(length + 1);
        Some(result)
    }

    fn consume(&mut self, n: usize) {
        let remaining = self.buf.len() - n;
        self.buf.rotate_left(n);
        self.buf.truncate(remaining);
    }
}

impl<const N: usize> Default for FrameReader<N> {
    fn default() -> Self {
        FrameReader::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeviceToHost, HostToDevice, Telemetry};
    use crate::control::ControlParams;
    use config::Config;
    use encoder::AngleSnapshot;
    use foc::{DQVoltages, ModeKind};
    use haptic::KnobReadout;

    #[test]
    fn test_split_frames() {
        let mut out = [0u8; 2 * MAX_FRAME];
        let a = encode_frame(HostToDevice::SelectMode(3), &mut out).unwrap();
        let b = encode_frame(HostToDevice::Control(ControlParams { mode: 2, values: [1.5, 0.0, 0.0, 0.0] }), &mut out[a..]).unwrap();

        let mut reader = FrameReader::<MAX_FRAME>::new();
        // arrives in two pieces, the cut falls inside the second frame
        reader.extend(&out[..a + 2]).unwrap();
        assert_eq!(reader.poll::<HostToDevice>(), Some(Ok(HostToDevice::SelectMode(3))));
        assert_eq!(reader.poll::<HostToDevice>(), None);

        reader.extend(&out[a + 2..a + b]).unwrap();
        assert_eq!(
            reader.poll::<HostToDevice>(),
            Some(Ok(HostToDevice::Control(ControlParams { mode: 2, values: [1.5, 0.0, 0.0, 0.0] })))
        );
        assert_eq!(reader.poll::<HostToDevice>(), None);
        assert_eq!(reader.available(), MAX_FRAME);
    }

    #[test]
    fn test_garbage_is_reported_and_skipped() {
        let mut reader = FrameReader::<MAX_FRAME>::new();
        reader.extend(&[2, 0xff, 0xff]).unwrap();
        let mut out = [0u8; MAX_FRAME];
        let n = encode_frame(HostToDevice::NextMode, &mut out).unwrap();
        reader.extend(&out[..n]).unwrap();

        assert_eq!(reader.poll::<HostToDevice>(), Some(Err(CommandError::Decode)));
        assert_eq!(reader.poll::<HostToDevice>(), Some(Ok(HostToDevice::NextMode)));
    }

    #[test]
    fn test_oversized_length_resyncs() {
        let mut reader = FrameReader::<16>::new();
        reader.extend(&[200, 1, 2]).unwrap();
        assert_eq!(reader.poll::<HostToDevice>(), Some(Err(CommandError::Decode)));
        assert_eq!(reader.available(), 16);

        assert_eq!(reader.extend(&[0; 17]), Err(CommandError::Decode));
        assert_eq!(reader.available(), 16);
    }

    #[test]
    fn test_telemetry_fits_a_frame() {
        let sample = DeviceToHost::Sample(Telemetry {
            id: u32::MAX,
            angle: AngleSnapshot { radian: 1.0, total: -100.0, relative_total: 3.0, velocity: 2.0, velocity_filtered: 1.5 },
            dq: DQVoltages::new(0.0, 333.0),
            driver: ModeKind::Torque,
            knob_mode: 4,
            readout: KnobReadout { angle: 0.5, value: -1000, percent: 100 },
            detent: i32::MIN,
            sensor_faults: u32::MAX,
        });
        let mut out = [0u8; MAX_FRAME];
        let n = encode_frame(sample, &mut out).unwrap();

        let mut reader = FrameReader::<MAX_FRAME>::new();
        reader.extend(&out[..n]).unwrap();
        assert_eq!(reader.poll::<DeviceToHost>(), Some(Ok(sample)));
    }

    #[test]
    fn test_config_reply_fits_a_frame() {
        let reply = DeviceToHost::Config(Config::new());
        let mut out = [0u8; MAX_FRAME];
        let n = encode_frame(reply, &mut out).unwrap();
        assert!(n <= MAX_FRAME);

        let mut reader = FrameReader::<MAX_FRAME>::new();
        reader.extend(&out[..n]).unwrap();
        assert_eq!(reader.poll::<DeviceToHost>(), Some(Ok(reply)));
    }

    #[test]
    fn test_small_buffer() {
        assert_eq!(encode_frame(HostToDevice::GetConfig, &mut [0u8; 1]), Err(CommandError::Encode));
        let mut out = [0u8; 4];
        assert_eq!(encode_frame(DeviceToHost::Ack(Ok(())), &mut out), Ok(3));
    }
}
