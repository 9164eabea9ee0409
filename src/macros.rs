/// Asserts that a `Result` failed with an error matching the pattern.
macro_rules! assert_error {
    ($e:expr, $p:pat $(if $guard:expr)? $(,)?) => {
        match $e {
            Err($p) $(if $guard)? => {}
            other => panic!("Expected {}, but got {:?}", stringify!($p), other),
        }
    };
}
