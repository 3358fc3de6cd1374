use include_dir::{include_dir, Dir};
use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

static PROMPTS: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/prompts");

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render one of the prompts compiled into the binary, by file name
pub fn load_embedded_prompt<T: Serialize>(name: &str, context_data: &T) -> Result<String, TeraError> {
    let template = PROMPTS
        .get_file(name)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| TeraError::template_not_found(name))?;
    load_prompt(template, context_data)
}
