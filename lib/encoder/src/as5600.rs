use embedded_hal::blocking::i2c::WriteRead;
use crate::sensor::{AngleSource, SensorError};

pub const AS5600_ADDRESS: u8 = 0x36;
const RAW_ANGLE_REGISTER: u8 = 0x0C;

/// AMS AS5600 magnetic encoder, 12 bit raw angle over I2C.
pub struct As5600<I2C> {
    i2c: I2C,
    address: u8,
    pub errors: u32,
}

impl<I2C, E> As5600<I2C>
    where I2C: WriteRead<Error = E> {
    pub fn new(i2c: I2C) -> As5600<I2C> {
        As5600 {
            i2c,
            address: AS5600_ADDRESS,
            errors: 0,
        }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> AngleSource for As5600<I2C>
    where I2C: WriteRead<Error = E> {
    fn read_raw(&mut self) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        match self.i2c.write_read(self.address, &[RAW_ANGLE_REGISTER], &mut buf) {
            Ok(()) => Ok(u16::from_be_bytes(buf) & 0x0fff),
            Err(_) => {
                self.errors = self.errors.wrapping_add(1);
                Err(SensorError::Bus)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBus {
        reply: [u8; 2],
        fail: bool,
        last_write: Option<(u8, u8)>,
    }

    impl WriteRead for FakeBus {
        type Error = ();

        fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), ()> {
            self.last_write = Some((address, bytes[0]));
            if self.fail {
                return Err(());
            }
            buffer.copy_from_slice(&self.reply);
            Ok(())
        }
    }

    #[test]
    fn test_read_raw_angle() {
        let bus = FakeBus { reply: [0xf8, 0x01], fail: false, last_write: None };
        let mut sensor = As5600::new(bus);

        assert_eq!(sensor.read_raw(), Ok(0x0801));
        let bus = sensor.release();
        assert_eq!(bus.last_write, Some((0x36, 0x0c)));
    }

    #[test]
    fn test_bus_error() {
        let bus = FakeBus { reply: [0, 0], fail: true, last_write: None };
        let mut sensor = As5600::new(bus);

        assert_eq!(sensor.read_raw(), Err(SensorError::Bus));
        assert_eq!(sensor.errors, 1);
    }
}
