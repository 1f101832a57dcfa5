use common::{encode_frame, CommandError, DeviceToHost, FrameReader, HostToDevice, MAX_FRAME};
use rtt_target::{DownChannel, UpChannel};

/// Command and telemetry link over two RTT channels, polled from the slow task.
pub struct Console {
    down: DownChannel,
    up: UpChannel,
    reader: FrameReader<MAX_FRAME>,
    telemetry_interval: u32,
    countdown: u32,
    sample_id: u32,
}

impl Console {
    pub fn new(down: DownChannel, up: UpChannel, telemetry_interval: u32) -> Console {
        Console {
            down,
            up,
            reader: FrameReader::new(),
            telemetry_interval,
            countdown: telemetry_interval,
            sample_id: 0,
        }
    }

    /// Next command from the host, reading whatever the channel has buffered.
    pub fn poll(&mut self) -> Option<Result<HostToDevice, CommandError>> {
        let mut buf = [0u8; MAX_FRAME];
        let free = self.reader.available().min(buf.len());
        let read = self.down.read(&mut buf[..free]);
        if read > 0 {
            if let Err(e) = self.reader.extend(&buf[..read]) {
                return Some(Err(e));
            }
        }
        self.reader.poll()
    }

    pub fn send(&mut self, message: DeviceToHost) -> Result<(), CommandError> {
        let mut buf = [0u8; MAX_FRAME];
        let length = encode_frame(message, &mut buf)?;
        // the channel skips whole frames when the host is not draining it
        self.up.write(&buf[..length]);
        Ok(())
    }

    pub fn set_telemetry_interval(&mut self, interval: u32) {
        self.telemetry_interval = interval;
        self.countdown = interval;
    }

    /// Counts slow ticks, returns the id of the next sample when one is due.
    pub fn telemetry_due(&mut self) -> Option<u32> {
        if self.telemetry_interval == 0 {
            return None;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown > 0 {
            return None;
        }
        self.countdown = self.telemetry_interval;
        self.sample_id = self.sample_id.wrapping_add(1);
        Some(self.sample_id)
    }
}
