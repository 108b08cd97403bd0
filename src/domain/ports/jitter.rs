/// Uniform random numbers used to spread retry delays.
///
/// Implementations return values in `[0, 1)`. Any `Fn() -> f64` closure
/// is a jitter source, which makes fixed values trivial in tests.
pub trait JitterSource: Send + Sync {
    fn unit(&self) -> f64;
}

impl<F> JitterSource for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn unit(&self) -> f64 {
        self()
    }
}
