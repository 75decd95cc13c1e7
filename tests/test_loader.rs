#![cfg(feature = "loader")]

use std::env::temp_dir;
use std::fs;
use std::path::PathBuf;

use ministache::{context, Environment, ErrorKind};

use similar_asserts::assert_eq;

struct TestDir(PathBuf);

impl TestDir {
    fn new(name: &str) -> TestDir {
        let path = temp_dir().join(format!("ministache-{}-{}", name, std::process::id()));
        fs::create_dir_all(&path).unwrap();
        TestDir(path)
    }

    fn write(&self, name: &str, contents: &str) {
        fs::write(self.0.join(name), contents).unwrap();
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.0).ok();
    }
}

#[test]
fn test_load_templates() {
    let dir = TestDir::new("load");
    dir.write("header.html", "H:((title))");
    dir.write("page.html", "((>header.html))|((body))");

    let env = Environment::new();
    env.load_templates(&dir.0, &["header.html", "page.html"])
        .unwrap();
    let rv = env
        .render_to_string("page.html", context! { title => "T", body => "B" })
        .unwrap();
    assert_eq!(rv, "H:T|B");
}

#[test]
fn test_load_templates_strips_extensions() {
    let dir = TestDir::new("strip");
    dir.write("index.html.tmpl", "hello");

    let mut env = Environment::new();
    env.set_strip_extension(true);
    env.load_templates(&dir.0, &["index.html.tmpl"]).unwrap();
    assert!(env.has_template("index"));
    assert!(!env.has_template("index.html.tmpl"));
    assert_eq!(env.render_to_string("index", ()).unwrap(), "hello");
}

#[test]
fn test_load_templates_requires_files() {
    let env = Environment::new();
    let err = env.load_templates("anywhere", &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert_eq!(
        err.to_string(),
        "no files named in call to load_templates"
    );
}

#[test]
fn test_load_templates_missing_file() {
    let dir = TestDir::new("missing");
    let env = Environment::new();
    let err = env.load_templates(&dir.0, &["nope.html"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
    assert!(err.to_string().contains("could not read template"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_load_templates_reports_parse_errors_with_filename() {
    let dir = TestDir::new("broken");
    dir.write("broken.html", "((#a))");

    let env = Environment::new();
    let err = env.load_templates(&dir.0, &["broken.html"]).unwrap_err();
    assert_eq!(err.to_string(), "broken.html:1:6: tag not closed");
}
