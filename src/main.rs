#![no_std]
#![no_main]

use panic_rtt_target as _;

mod board;

#[rtic::app(device = stm32f4xx_hal::pac, dispatchers = [EXTI0, EXTI1])]
mod app {
    use dwt_systick_monotonic::DwtSystick;
    use rtic::mutex_prelude::*;
    use rtt_target::{rprintln, rtt_init, set_print_channel};
    use stm32f4xx_hal::{
        pac::{self, TIM3, TIM5},
        prelude::*,
        timer::{CounterUs, DelayUs, Event},
    };

    use common::{enable_driver, CommandError, ControlCommand, DeviceToHost, HostToDevice, Telemetry};
    use config::Config;
    use encoder::AngleSensor;
    use encoder::as5600::As5600;
    use foc::MotorDriver;
    use haptic::{HapticKnob, KnobSession, ModeRegistry};

    use crate::board::{ANGLE, TORQUE};
    use crate::board::console::Console;
    use crate::board::hardware::{ControlTimer, MotorOutputBlock, SensorBus};

    const MONO_HZ: u32 = 100_000_000;

    #[monotonic(binds = SysTick, default = true)]
    type MyMono = DwtSystick<MONO_HZ>;

    type Sensor = AngleSensor<As5600<SensorBus>>;
    type Driver = MotorDriver<'static, MotorOutputBlock>;

    #[shared]
    struct Shared {
        driver: Driver,
        sensor: Sensor,
        knob: HapticKnob,
        control_timer: ControlTimer,
    }

    #[local]
    struct Local {
        haptic_timer: CounterUs<TIM3>,
        console: Console,
        session: KnobSession,
        registry: ModeRegistry,
        delay: DelayUs<TIM5>,
        config: Config,
        faults_seen: u32,
    }

    #[init]
    fn init(cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let channels = rtt_init! {
            up: {
                0: { size: 1024 name: "Terminal" }
                1: { size: 1024 name: "Telemetry" }
            }
            down: {
                0: { size: 128 name: "Console" }
            }
        };
        set_print_channel(channels.up.0);

        rprintln!("init");
        let config = Config::new();
        let device: pac::Peripherals = cx.device;

        let rcc = device.RCC.constrain();
        let clocks = rcc
            .cfgr
            .use_hse(25.MHz())
            .sysclk(100.MHz())
            .hclk(100.MHz())
            .pclk1(50.MHz())
            .pclk2(100.MHz())
            .freeze();
        rprintln!("hse");

        let gpioa = device.GPIOA.split();
        let gpiob = device.GPIOB.split();

        // leds
        gpiob.pb8.into_push_pull_output().set_high();
        gpiob.pb9.into_push_pull_output().set_high();

        let (mut ch_u, mut ch_v, mut ch_w) = device
            .TIM1
            .pwm_hz(
                (
                    gpioa.pa8.into_alternate(),
                    gpioa.pa9.into_alternate(),
                    gpioa.pa10.into_alternate(),
                ),
                (config.pwm_frequency as u32).Hz(),
                &clocks,
            )
            .split();

        ch_u.set_duty(0);
        ch_v.set_duty(0);
        ch_w.set_duty(0);

        ch_u.enable();
        ch_v.enable();
        ch_w.enable();

        let pwm = MotorOutputBlock {
            u: ch_u,
            v: ch_v,
            w: ch_w,
            pwm_en: gpiob.pb15.into_push_pull_output(),
        };

        let bus = device.I2C1.i2c(
            (
                gpiob.pb6.into_alternate_open_drain(),
                gpiob.pb7.into_alternate_open_drain(),
            ),
            config.i2c_frequency.Hz(),
            &clocks,
        );
        let mut sensor = AngleSensor::new(As5600::new(bus), &config);
        // seeds the unwrapper so the first tick does not see a jump
        if let Err(e) = sensor.update() {
            rprintln!("angle sensor not answering: {:?}", e);
        }

        let mut control_timer = ControlTimer::new(device.TIM2.counter_us(&clocks), config.tick_period_us().micros());
        let mut delay = device.TIM5.delay_us(&clocks);

        let mut driver = MotorDriver::new(pwm, &TORQUE, &config);
        driver.enable(true);
        // also starts the commutation timer, whatever the outcome
        match driver.calibrate(&mut sensor, &mut delay, &mut control_timer) {
            Ok(_) => {
                delay.delay_ms(500_u32);
                driver.set_torque_mode().unwrap();
            }
            Err(e) => rprintln!("calibration failed: {:?}, motor stays free", e),
        }

        let mut knob = HapticKnob::new(&config);
        let registry = ModeRegistry::with_presets(&config);
        let mut session = KnobSession::new(*registry.get(0).unwrap());
        session.init(&mut knob, &mut sensor);
        ANGLE.write(sensor.snapshot()).unwrap();

        let mut haptic_timer = device.TIM3.counter_us(&clocks);
        haptic_timer.start(config.tick_period_us().micros()).unwrap();
        haptic_timer.listen(Event::Update);

        let mut dcb = cx.core.DCB;
        let dwt = cx.core.DWT;
        let systick = cx.core.SYST;

        let mono = DwtSystick::new(&mut dcb, dwt, systick, MONO_HZ);

        let console = Console::new(channels.down.0, channels.up.1, config.telemetry_interval);

        slow::spawn().unwrap();
        rprintln!("spawned");

        (
            Shared {
                driver,
                sensor,
                knob,
                control_timer,
            },
            Local {
                haptic_timer,
                console,
                session,
                registry,
                delay,
                config,
                faults_seen: 0,
            },
            init::Monotonics(mono),
        )
    }

    #[task(binds = TIM2, shared = [driver, sensor, control_timer], priority = 3)]
    fn commutation(cx: commutation::Context) {
        let commutation::SharedResources {
            mut driver,
            mut sensor,
            mut control_timer,
        } = cx.shared;

        control_timer.lock(|timer| timer.clear_interrupt());

        // a failed read keeps the last good angle for this tick, the sensor counts it
        let snapshot = sensor.lock(|sensor| match sensor.update() {
            Ok(snapshot) => snapshot,
            Err(_) => sensor.snapshot(),
        });
        let _ = ANGLE.write(snapshot);

        driver.lock(|driver| {
            driver.commutate(&snapshot);
        });
    }

    #[task(binds = TIM3, shared = [knob], local = [haptic_timer], priority = 2)]
    fn haptic_tick(mut cx: haptic_tick::Context) {
        cx.local.haptic_timer.clear_interrupt(Event::Update);

        let angle = ANGLE.read();
        cx.shared.knob.lock(|knob| {
            knob.tick(&angle, &TORQUE);
        });
    }

    #[task(shared = [driver, sensor, knob, control_timer], local = [console, session, registry, delay, config, faults_seen], priority = 1)]
    fn slow(cx: slow::Context) {
        let slow::SharedResources {
            mut driver,
            mut sensor,
            mut knob,
            mut control_timer,
        } = cx.shared;
        let slow::LocalResources {
            console,
            session,
            registry,
            delay,
            config,
            faults_seen,
        } = cx.local;

        let readout = knob.lock(|knob| session.update(knob));

        while let Some(request) = console.poll() {
            let reply = match request {
                Ok(HostToDevice::GetConfig) => DeviceToHost::Config(*config),
                Ok(command) => {
                    let result = match command {
                        HostToDevice::TelemetryInterval(interval) => {
                            console.set_telemetry_interval(interval);
                            Ok(())
                        }
                        command => {
                            let mut motor = Motor {
                                driver: &mut driver,
                                sensor: &mut sensor,
                                knob: &mut knob,
                                timer: &mut control_timer,
                            };
                            motor.handle(command, session, registry, delay, config)
                        }
                    };
                    if let Err(e) = result {
                        foc::warn!("{:?} failed: {:?}", command, e);
                    }
                    DeviceToHost::Ack(result)
                }
                Err(e) => {
                    foc::warn!("dropped a console frame");
                    DeviceToHost::Ack(Err(e))
                }
            };
            if let Err(e) = console.send(reply) {
                foc::warn!("console reply lost: {:?}", e);
            }
        }

        let faults = sensor.lock(|sensor| sensor.source_mut().errors);
        if faults != *faults_seen {
            foc::warn!("{} angle sensor read errors", faults.wrapping_sub(*faults_seen));
            *faults_seen = faults;
        }

        if let Some(id) = console.telemetry_due() {
            let sample = Telemetry {
                id,
                angle: ANGLE.read(),
                dq: TORQUE.read(),
                driver: driver.lock(|driver| driver.mode().kind()),
                knob_mode: registry.active() as u8,
                readout,
                detent: knob.lock(|knob| knob.detent_index()),
                sensor_faults: faults,
            };
            if let Err(e) = console.send(DeviceToHost::Sample(sample)) {
                foc::warn!("telemetry sample lost: {:?}", e);
            }
        }

        slow::spawn_after(config.ui_period_ms.millis()).ok();
    }

    /// The shared resources a console command may touch, borrowed from the slow task.
    struct Motor<'a, D, S, K, Tm> {
        driver: &'a mut D,
        sensor: &'a mut S,
        knob: &'a mut K,
        timer: &'a mut Tm,
    }

    impl<'a, D, S, K, Tm> Motor<'a, D, S, K, Tm>
    where
        D: rtic::Mutex<T = Driver>,
        S: rtic::Mutex<T = Sensor>,
        K: rtic::Mutex<T = HapticKnob>,
        Tm: rtic::Mutex<T = ControlTimer>,
    {
        fn handle(
            &mut self,
            command: HostToDevice,
            session: &mut KnobSession,
            registry: &mut ModeRegistry,
            delay: &mut DelayUs<TIM5>,
            config: &Config,
        ) -> Result<(), CommandError> {
            match command {
                HostToDevice::Control(params) => {
                    let control = ControlCommand::try_from(params)?;
                    // the console takes the motor away from the knob until it is resumed
                    self.knob.lock(|knob| session.stop_motor(knob, &TORQUE));
                    match control {
                        ControlCommand::Calibrate => {
                            (&mut *self.driver, &mut *self.sensor, &mut *self.timer)
                                .lock(|driver, sensor, timer| driver.calibrate(sensor, delay, timer))?;
                        }
                        control => self.driver.lock(|driver| control.apply(driver, config))?,
                    }
                }
                HostToDevice::Enable(enable) => {
                    let knob_active = self.knob.lock(|knob| knob.is_active());
                    self.driver.lock(|driver| enable_driver(driver, enable, knob_active))?
                }
                HostToDevice::RestoreCalibration(cal) => {
                    self.driver.lock(|driver| driver.restore_calibration(cal))?
                }
                HostToDevice::SelectMode(index) => self.activate(index as usize, session, registry)?,
                HostToDevice::NextMode => {
                    let index = registry.next_index();
                    self.activate(index, session, registry)?
                }
                HostToDevice::StopMotor => self.knob.lock(|knob| session.stop_motor(knob, &TORQUE)),
                HostToDevice::ResumeMotor => {
                    (&mut *self.knob, &mut *self.sensor).lock(|knob, sensor| {
                        session.resume_motor(knob, sensor);
                        let _ = ANGLE.write(sensor.snapshot());
                    });
                    self.driver.lock(|driver| driver.set_torque_mode())?
                }
                HostToDevice::TelemetryInterval(_) | HostToDevice::GetConfig => {}
            }
            Ok(())
        }

        /// Switches the knob mode in one critical section with the sensor, so neither tick
        /// sees the new mode with the old origin.
        fn activate(&mut self, index: usize, session: &mut KnobSession, registry: &mut ModeRegistry) -> Result<(), CommandError> {
            (&mut *self.knob, &mut *self.sensor).lock(|knob, sensor| -> Result<(), CommandError> {
                registry.switch(index, session, knob, sensor, &TORQUE)?;
                let _ = ANGLE.write(sensor.snapshot());
                Ok(())
            })?;
            self.driver.lock(|driver| driver.set_torque_mode())?;
            Ok(())
        }
    }
}
