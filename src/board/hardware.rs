use dwt_systick_monotonic::fugit::MicrosDurationU32;
use foc::hardware::{CommutationTimer, Inverter};
use stm32f4xx_hal::{
    gpio::{Alternate, OpenDrain, Output, Pin},
    i2c::I2c,
    pac::{I2C1, TIM1, TIM2},
    timer::{CounterUs, Event, PwmChannel},
};

pub type SensorBus = I2c<I2C1, (Pin<'B', 6, Alternate<4, OpenDrain>>, Pin<'B', 7, Alternate<4, OpenDrain>>)>;

pub struct MotorOutputBlock {
    pub u: PwmChannel<TIM1, 0_u8>,
    pub v: PwmChannel<TIM1, 1_u8>,
    pub w: PwmChannel<TIM1, 2_u8>,
    pub pwm_en: Pin<'B', 15_u8, Output>,
}

impl Inverter for MotorOutputBlock {
    fn set_duty(&mut self, u: u16, v: u16, w: u16) {
        self.u.set_duty(u);
        self.v.set_duty(v);
        self.w.set_duty(w);
    }

    fn max_duty(&self) -> u16 {
        self.u.get_max_duty()
    }

    fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.pwm_en.set_high();
        } else {
            self.u.set_duty(0);
            self.v.set_duty(0);
            self.w.set_duty(0);
            self.pwm_en.set_low();
        }
    }
}

/// TIM2 update interrupt, the commutation tick.
pub struct ControlTimer {
    timer: CounterUs<TIM2>,
    period: MicrosDurationU32,
}

impl ControlTimer {
    pub fn new(timer: CounterUs<TIM2>, period: MicrosDurationU32) -> ControlTimer {
        ControlTimer { timer, period }
    }

    pub fn clear_interrupt(&mut self) {
        self.timer.clear_interrupt(Event::Update);
    }
}

impl CommutationTimer for ControlTimer {
    fn start(&mut self) {
        // only fails for a zero period
        let _ = self.timer.start(self.period);
        self.timer.listen(Event::Update);
    }

    fn stop(&mut self) {
        self.timer.unlisten(Event::Update);
        let _ = self.timer.cancel();
        self.timer.clear_interrupt(Event::Update);
    }
}
