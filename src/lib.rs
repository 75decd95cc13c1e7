//! ministache is a small template engine in the mustache family with
//! support for template inheritance.  Templates are compiled into a node
//! tree and rendered against any [`serde`] serializable value.
//!
//! # Syntax
//!
//! Tags are enclosed in `((` and `))` by default; the delimiters are
//! configurable.  Whitespace just inside the delimiters is insignificant,
//! whitespace in plain text is preserved verbatim.
//!
//! * `((name))` interpolates a value; dotted paths like `((user.name))`
//!   walk into the context.
//! * `((#items)) ... ((/items))` renders its body once for a truthy
//!   value, or once per element when the value is a sequence, with the
//!   context rebound to each element.
//! * `((^items)) ... ((/items))` is the inverted form: it renders its
//!   body exactly when the plain section would render nothing.
//! * `((>other))` includes the template registered as `other` in place.
//! * `((<base)) (($block))...((/block)) ((/base))` renders the template
//!   `base` with the named blocks replaced.
//! * `(($block)) ... ((/block))` declares a named, overridable block.
//! * `((! a comment))` is discarded.
//!
//! # Usage
//!
//! Templates live in an [`Environment`], which maps names to parsed
//! templates and holds the engine configuration:
//!
//! ```
//! use ministache::{context, Environment};
//!
//! let env = Environment::new();
//! env.add_template("hello", "Hello ((name))!").unwrap();
//! let rv = env.render_to_string("hello", context! { name => "John" }).unwrap();
//! assert_eq!(rv, "Hello John!");
//! ```
//!
//! # Inheritance
//!
//! A template can render another template while overriding its named
//! blocks:
//!
//! ```
//! use ministache::Environment;
//!
//! let env = Environment::new();
//! env.add_template("base", "<title>(($title))Untitled((/title))</title>").unwrap();
//! env.add_template("page", "((<base))(($title))Home((/title))((/base))").unwrap();
//! let rv = env.render_to_string("page", ()).unwrap();
//! assert_eq!(rv, "<title>Home</title>");
//! ```
//!
//! # Undefined variables
//!
//! Interpolating a variable that does not resolve is an error by
//! default.  [`Environment::set_undefined_behavior`] switches to the
//! lenient mode in which such variables render as nothing.
//!
//! # Features
//!
//! * `loader`: enabled by default, provides
//!   [`Environment::load_templates`] for batch loading template files
//!   from a directory.

#[macro_use]
mod macros;

mod compiler;
mod environment;
mod error;
#[cfg(feature = "loader")]
mod loader;
mod output;
mod render;
pub mod value;

pub use self::compiler::ast;
pub use self::compiler::parser::parse;
pub use self::environment::{Environment, TemplateFunction, UndefinedBehavior};
pub use self::error::{Error, ErrorKind};
pub use self::value::Value;
