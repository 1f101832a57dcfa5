/// Three half bridges plus their shared enable line.
pub trait Inverter {
    /// compare values in [0, max_duty]
    fn set_duty(&mut self, u: u16, v: u16, w: u16);
    fn max_duty(&self) -> u16;
    fn set_enabled(&mut self, enabled: bool);
}

/// The periodic interrupt that drives commutation.
pub trait CommutationTimer {
    fn start(&mut self);
    fn stop(&mut self);
}
