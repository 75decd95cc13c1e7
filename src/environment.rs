use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::compiler::ast::Node;
use crate::compiler::lexer::{DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM};
use crate::compiler::parser::parse;
use crate::error::{Error, ErrorKind};
use crate::output::{Output, WriteWrapper};
use crate::render::Renderer;
use crate::value::Value;

/// A function callable from templates.
///
/// Functions receive the evaluated tail expressions of the variable tag
/// that invokes them.
pub type TemplateFunction = dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync;

/// Controls how undefined variables behave during rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UndefinedBehavior {
    /// Interpolating an undefined variable is an error.  This is the
    /// default.
    #[default]
    Strict,
    /// Interpolating an undefined variable renders nothing.
    Lenient,
}

/// An abstraction that holds the engine configuration and the templates.
///
/// The environment is the registry of parsed templates, keyed by name,
/// plus the configuration rendering consults: delimiters, undefined
/// variable behavior and registered functions.  Template registration
/// goes through a read-write lock, so an environment shared behind an
/// [`Arc`] can render from several threads while another registers
/// templates.
///
/// ```rust
/// use ministache::{context, Environment};
///
/// let env = Environment::new();
/// env.add_template("hello", "Hello ((name))!").unwrap();
/// let rv = env.render_to_string("hello", context! { name => "John" }).unwrap();
/// assert_eq!(rv, "Hello John!");
/// ```
pub struct Environment {
    templates: RwLock<BTreeMap<String, Arc<Node>>>,
    pub(crate) left_delim: String,
    pub(crate) right_delim: String,
    undefined_behavior: UndefinedBehavior,
    functions: BTreeMap<String, Arc<TemplateFunction>>,
    #[cfg(feature = "loader")]
    pub(crate) strip_extension: bool,
}

impl Default for Environment {
    fn default() -> Environment {
        Environment::new()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let templates = self.templates_read();
        f.debug_struct("Environment")
            .field("templates", &templates.keys().collect::<Vec<_>>())
            .field("undefined_behavior", &self.undefined_behavior)
            .finish()
    }
}

impl Environment {
    /// Creates a new environment with default delimiters and no templates.
    pub fn new() -> Environment {
        Environment {
            templates: RwLock::new(BTreeMap::new()),
            left_delim: DEFAULT_LEFT_DELIM.to_string(),
            right_delim: DEFAULT_RIGHT_DELIM.to_string(),
            undefined_behavior: UndefinedBehavior::default(),
            functions: BTreeMap::new(),
            #[cfg(feature = "loader")]
            strip_extension: false,
        }
    }

    /// Sets the delimiters used for templates added to this environment.
    pub fn set_delimiters(&mut self, left: impl Into<String>, right: impl Into<String>) {
        self.left_delim = left.into();
        self.right_delim = right.into();
    }

    /// Changes the undefined variable behavior.
    pub fn set_undefined_behavior(&mut self, behavior: UndefinedBehavior) {
        self.undefined_behavior = behavior;
    }

    pub(crate) fn undefined_behavior(&self) -> UndefinedBehavior {
        self.undefined_behavior
    }

    /// Registers a function callable from templates.
    ///
    /// A variable tag whose head does not resolve against the context but
    /// names a registered function invokes it with the evaluated tail
    /// expressions as arguments:
    ///
    /// ```rust
    /// # use ministache::{context, Environment, Value};
    /// let mut env = Environment::new();
    /// env.add_function("shout", |args| {
    ///     Ok(Value::from(args.iter().map(|a| a.to_string().to_uppercase())
    ///         .collect::<Vec<_>>()
    ///         .join(" ")))
    /// });
    /// let rv = env.render_str("((shout name))", context! { name => "ferris" }).unwrap();
    /// assert_eq!(rv, "FERRIS");
    /// ```
    pub fn add_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(f));
    }

    pub(crate) fn get_function(&self, name: &str) -> Option<Arc<TemplateFunction>> {
        self.functions.get(name).cloned()
    }

    /// Parses the given source and registers it under `name`.
    pub fn add_template(&self, name: &str, source: &str) -> Result<(), Error> {
        let root = ok!(parse(name, &self.left_delim, &self.right_delim, source));
        self.register_template(name, root);
        Ok(())
    }

    /// Registers an already parsed template under `name`, replacing any
    /// previous entry.
    pub fn register_template(&self, name: &str, root: Node) {
        self.templates_write()
            .insert(name.to_string(), Arc::new(root));
    }

    /// Looks up a registered template by name.
    pub fn get_template(&self, name: &str) -> Result<Arc<Node>, Error> {
        match self.templates_read().get(name) {
            Some(root) => Ok(root.clone()),
            None => Err(Error::new(
                ErrorKind::TemplateNotFound,
                format!("template not available: {name}"),
            )),
        }
    }

    /// Returns `true` if a template with the given name is registered.
    pub fn has_template(&self, name: &str) -> bool {
        self.templates_read().contains_key(name)
    }

    /// Renders the named template into the given sink.
    ///
    /// Output already written when an error occurs is left in the sink.
    pub fn execute<W, S>(&self, out: &mut W, name: &str, ctx: S) -> Result<(), Error>
    where
        W: fmt::Write,
        S: Serialize,
    {
        let root = ok!(self.get_template(name));
        let ctx = Value::from_serialize(&ctx);
        Renderer::new(self).render(&root, &ctx, &mut Output::new(out))
    }

    /// Renders the named template into an [`io::Write`] sink.
    pub fn execute_to_write<W, S>(&self, w: W, name: &str, ctx: S) -> Result<(), Error>
    where
        W: io::Write,
        S: Serialize,
    {
        let mut wrapper = WriteWrapper { w, err: None };
        self.execute(&mut wrapper, name, ctx)
            .map_err(|err| wrapper.take_err(err))
    }

    /// Renders the named template to a string.
    pub fn render_to_string<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, Error> {
        let mut rv = String::new();
        ok!(self.execute(&mut rv, name, ctx));
        Ok(rv)
    }

    /// Parses and renders a template from a string in one go.
    ///
    /// The template is not registered; partials and inherits inside it
    /// still resolve against this environment.  In errors the template
    /// name `<string>` is used.
    pub fn render_str<S: Serialize>(&self, source: &str, ctx: S) -> Result<String, Error> {
        let root = ok!(parse(
            "<string>",
            &self.left_delim,
            &self.right_delim,
            source
        ));
        let ctx = Value::from_serialize(&ctx);
        let mut rv = String::new();
        ok!(Renderer::new(self).render(&root, &ctx, &mut Output::new(&mut rv)));
        Ok(rv)
    }

    fn templates_read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<Node>>> {
        self.templates.read().unwrap_or_else(|err| err.into_inner())
    }

    fn templates_write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Arc<Node>>> {
        self.templates
            .write()
            .unwrap_or_else(|err| err.into_inner())
    }
}
