use std::borrow::Cow;
use std::fmt;

/// Represents template errors.
///
/// Errors produced while parsing carry the template name and the line and
/// column the parser had reached, and display as
/// `name:line:column: message`.  Errors produced while rendering carry no
/// location and display the message alone.
///
/// # Example
///
/// ```rust
/// # let env = ministache::Environment::new();
/// # env.add_template("", "").unwrap();
/// match env.render_to_string("", ()) {
///     Ok(result) => println!("{}", result),
///     Err(err) => eprintln!("could not render template: {}", err),
/// }
/// ```
pub struct Error {
    kind: ErrorKind,
    detail: Option<Cow<'static, str>>,
    name: Option<String>,
    lineno: usize,
    column: usize,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("detail", &self.detail)
            .field("name", &self.name)
            .field("lineno", &self.lineno)
            .field("column", &self.column)
            .field("source", &self.source)
            .finish()
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind()
    }
}

impl Eq for Error {}

/// An enum describing the error kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The template has malformed tag content.  Produced by the lexer and
    /// the parser; always fatal to the current parse.
    SyntaxError,
    /// A template was looked up by name and the registry had no entry.
    TemplateNotFound,
    /// A variable in a template did not resolve against the context.
    UndefinedError,
    /// An operation the renderer cannot carry out, such as calling a value
    /// that is not callable or exceeding the template recursion limit.
    InvalidOperation,
    /// A context value could not be serialized into the internal format.
    BadSerialization,
    /// Writing rendered output to the sink failed.
    WriteFailure,
}

impl ErrorKind {
    fn description(self) -> &'static str {
        match self {
            ErrorKind::SyntaxError => "syntax error",
            ErrorKind::TemplateNotFound => "template not available",
            ErrorKind::UndefinedError => "undefined value",
            ErrorKind::InvalidOperation => "invalid operation",
            ErrorKind::BadSerialization => "could not serialize to internal format",
            ErrorKind::WriteFailure => "failed to write rendered output",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref name) = self.name {
            ok!(write!(f, "{}:{}:{}: ", name, self.lineno, self.column));
        }
        match self.detail {
            Some(ref detail) => f.write_str(detail),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl Error {
    /// Creates a new error with kind and detail.
    pub fn new<D: Into<Cow<'static, str>>>(kind: ErrorKind, detail: D) -> Error {
        Error {
            kind,
            detail: Some(detail.into()),
            name: None,
            lineno: 0,
            column: 0,
            source: None,
        }
    }

    pub(crate) fn set_location(&mut self, name: &str, lineno: usize, column: usize) {
        self.name = Some(name.into());
        self.lineno = lineno;
        self.column = column;
    }

    /// Attaches another error as source to this error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the name of the template the error originated in, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the 1-indexed line of the error, if known.
    pub fn line(&self) -> Option<usize> {
        self.name.as_ref().map(|_| self.lineno)
    }

    /// Returns the 0-indexed byte column of the error, if known.
    ///
    /// The column is measured from the character following the last newline
    /// before the error, or from the start of the input.
    pub fn column(&self) -> Option<usize> {
        self.name.as_ref().map(|_| self.column)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|err| err.as_ref() as _)
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error {
            kind,
            detail: None,
            name: None,
            lineno: 0,
            column: 0,
            source: None,
        }
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Error::from(ErrorKind::WriteFailure)
    }
}

impl serde::ser::Error for Error {
    fn custom<T>(msg: T) -> Self
    where
        T: fmt::Display,
    {
        Error::new(ErrorKind::BadSerialization, msg.to_string())
    }
}
