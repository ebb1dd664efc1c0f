use crate::data::Distribution;
use crate::error::BoxedError;

/// The boundary contract between the registry and metric backends.
///
/// One flush cycle invokes [`prep`](Reporter::prep) once, then
/// [`discrete`](Reporter::discrete) or [`sample`](Reporter::sample) once per
/// drained instrument, then [`flush`](Reporter::flush) once, always in that
/// order; `flush` is the point to emit buffered data to a backend as a bulk.
/// An error from any call aborts the cycle at that point, and the next cycle
/// starts over.
///
/// All calls arrive on the registry's flush thread. Implementations must not
/// retain the distribution reference past the call that delivered it.
pub trait Reporter: Send {
    /// Called once at the start of every flush cycle.
    fn prep(&mut self) -> Result<(), BoxedError> { Ok(()) }

    /// Accepts the drained value of a discrete instrument.
    fn discrete(&mut self, name: &str, tags: &[&str], value: f64) -> Result<(), BoxedError>;

    /// Accepts the drained distribution of a sample instrument. The
    /// distribution is only valid for the duration of the call.
    fn sample(&mut self, name: &str, tags: &[&str], dist: &Distribution) -> Result<(), BoxedError>;

    /// Called once at the end of every flush cycle.
    fn flush(&mut self) -> Result<(), BoxedError>;
}
