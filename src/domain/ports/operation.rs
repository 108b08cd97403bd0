//! The unit of work every wrapper accepts and produces.

/// A fallible operation over borrowed arguments.
///
/// Arguments are only ever lent to the operation, so a wrapper cannot
/// alter what the wrapped operation observes. Any
/// `Fn(&A) -> Result<R, E>` closure is an operation, and every wrapper in
/// this crate is itself an operation with the same argument type, which
/// is what lets them nest in any order.
///
/// # Examples
///
/// ```
/// use carapace::domain::ports::Operation;
///
/// let double = |x: &i64| -> Result<i64, String> { Ok(x * 2) };
/// assert_eq!(double.invoke(&21), Ok(42));
/// ```
pub trait Operation<A: ?Sized> {
    /// Success value.
    type Output;
    /// Failure signal.
    type Error;

    /// Run the operation once.
    fn invoke(&self, args: &A) -> Result<Self::Output, Self::Error>;

    /// Short name used in reports.
    ///
    /// Defaults to the last path segment of the type name, so a `fn` item
    /// is reported by its own name and a closure by the function defining
    /// it. Wrappers forward the name of what they wrap.
    fn name(&self) -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

const UNNAMED: &str = "operation";

fn short_type_name(full: &'static str) -> &'static str {
    let path = full.split('<').next().unwrap_or(full);
    // Function pointers, references, slices and tuples have no usable path.
    if path.contains(['(', ' ', '&', '[']) {
        return UNNAMED;
    }
    path.rsplit("::")
        .find(|segment| !segment.is_empty() && !segment.starts_with('{'))
        .unwrap_or(UNNAMED)
}

impl<A, R, E, F> Operation<A> for F
where
    A: ?Sized,
    F: Fn(&A) -> Result<R, E>,
{
    type Output = R;
    type Error = E;

    fn invoke(&self, args: &A) -> Result<R, E> {
        self(args)
    }
}
