/// Verifies a caller-supplied argument, returning an `InvalidArgument` error
/// from the enclosing function when `expr` is false.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Verifies decoded data, returning an `InvalidFormat` error from the
/// enclosing function when `expr` is false.
#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}
