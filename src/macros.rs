// `ok!` is a less bloaty alternative to the standard library's try operator (`?`).
// Since we do not need type conversions in this crate we can fall back to a much
// easier match pattern that compiles faster and produces less bloaty code.

macro_rules! ok {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(err) => return Err(err),
        }
    };
}

/// Creates a template context from keys and values.
///
/// ```rust
/// # use ministache::context;
/// let ctx = context! {
///     name => "Peter",
///     location => "World",
/// };
/// ```
///
/// Alternatively if the variable name matches the key name it can
/// be omitted:
///
/// ```rust
/// # use ministache::context;
/// let name = "Peter";
/// let ctx = context! { name };
/// ```
///
/// The return value is a [`Value`](crate::Value).
#[macro_export]
macro_rules! context {
    () => {
        $crate::Value::from($crate::value::ValueMap::new())
    };
    ($($key:ident $(=> $value:expr)?),+ $(,)?) => {{
        let mut ctx = $crate::value::ValueMap::new();
        $(
            $crate::__context_pair!(ctx, $key $(=> $value)?);
        )+
        $crate::Value::from(ctx)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __context_pair {
    ($ctx:ident, $key:ident) => {
        $crate::__context_pair!($ctx, $key => $key);
    };
    ($ctx:ident, $key:ident => $value:expr) => {
        $ctx.insert(
            ::std::sync::Arc::from(stringify!($key)),
            $crate::Value::from_serialize(&$value),
        );
    };
}
