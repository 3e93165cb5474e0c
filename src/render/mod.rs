use std::collections::HashMap;
use std::path::Path;

use tera::{Context, Tera, Value};
use thiserror::Error;
use tracing::debug;

pub mod views;

pub use views::{CardView, GalleryView, PhotoDetailView, PhotoView};

const GALLERY: &str = "gallery.txt";
const PHOTO: &str = "photo.txt";
const HELP: &str = "help.txt";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (GALLERY, include_str!("../../templates/gallery.txt")),
    (PHOTO, include_str!("../../templates/photo.txt")),
    (HELP, include_str!("../../templates/help.txt")),
];

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("rendering error")]
    Tera(#[from] tera::Error),
}

/// Renders gallery and photo views as plain text.
#[derive(Debug)]
pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Loads `*.txt` templates from `template_path`, if given, and falls back
    /// to the built-in template for every name the directory lacks.
    pub fn new(template_path: Option<&Path>) -> Result<Self, tera::Error> {
        let mut tera = match template_path {
            Some(path) => Tera::new(&path.join("**/*.txt").to_string_lossy())?,
            None => Tera::default(),
        };

        for (name, source) in BUILTIN_TEMPLATES {
            if tera.get_template_names().any(|loaded| loaded == *name) {
                debug!(template = name, "Using template from template path");
                continue;
            }
            tera.add_raw_template(name, source)?;
        }
        tera.register_filter("thousands", thousands);

        Ok(Renderer { tera })
    }

    pub fn gallery(&self, view: &GalleryView) -> Result<String, RenderError> {
        self.render(GALLERY, &Context::from_serialize(view)?)
    }

    pub fn photo(&self, view: &PhotoView) -> Result<String, RenderError> {
        self.render(PHOTO, &Context::from_serialize(view)?)
    }

    pub fn help(&self) -> Result<String, RenderError> {
        self.render(HELP, &Context::new())
    }

    fn render(&self, template: &'static str, context: &Context) -> Result<String, RenderError> {
        Ok(self.tera.render(template, context)?)
    }
}

fn thousands(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value.as_u64() {
        Some(n) => Ok(Value::String(group_thousands(n))),
        None => Err(tera::Error::msg(format!(
            "Filter `thousands` expects an unsigned integer, got {}",
            value
        ))),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}
