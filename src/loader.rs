use std::fs;
use std::path::Path;

use crate::compiler::parser::parse;
use crate::environment::Environment;
use crate::error::{Error, ErrorKind};

impl Environment {
    /// Controls whether [`load_templates`](Environment::load_templates)
    /// registers files under their name with extensions stripped.
    ///
    /// Stripping removes everything from the first `.` after the last
    /// `/`: `pages/index.html.tmpl` registers as `pages/index`.  A name
    /// without such a `.` is kept whole.
    pub fn set_strip_extension(&mut self, strip: bool) {
        self.strip_extension = strip;
    }

    /// Reads, parses and registers the given files from a base directory.
    ///
    /// Each file is parsed with the environment's delimiters and
    /// registered under its filename, or under the filename with
    /// extensions stripped when so configured.  The first failing file
    /// aborts the load; files registered before it remain registered.
    pub fn load_templates<P: AsRef<Path>>(
        &self,
        basedir: P,
        filenames: &[&str],
    ) -> Result<(), Error> {
        if filenames.is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidOperation,
                "no files named in call to load_templates",
            ));
        }

        for filename in filenames {
            let path = basedir.as_ref().join(filename);
            let source = match fs::read_to_string(&path) {
                Ok(source) => source,
                Err(err) => {
                    return Err(Error::new(
                        ErrorKind::InvalidOperation,
                        format!("could not read template {filename:?}"),
                    )
                    .with_source(err));
                }
            };
            let root = ok!(parse(
                filename,
                &self.left_delim,
                &self.right_delim,
                &source
            ));
            let name = if self.strip_extension {
                strip_extension(filename)
            } else {
                filename
            };
            self.register_template(name, root);
        }

        Ok(())
    }
}

fn strip_extension(filename: &str) -> &str {
    let start = filename.rfind('/').map(|idx| idx + 1).unwrap_or(0);
    match filename[start..].find('.') {
        Some(idx) => &filename[..start + idx],
        None => filename,
    }
}
