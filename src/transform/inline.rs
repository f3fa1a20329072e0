//! Rendering of the `<odoo-*>` inline markup elements.
//!
//! | Element                                  | Output                           |
//! |------------------------------------------|----------------------------------|
//! | `<odoo-field [help]>model/field</…>`     | `<code>` with the label or help  |
//! | `<odoo-menu [nameonly]>module/menu</…>`  | `<span class="menuselection">`   |
//! | `<odoo-model>model</…>`                  | `<code>` with the model name     |
//! | `<odoo-fields [fields="a b"]>model</…>`  | `<dl class="field-list">`        |
//! | `<odoo-icon>name</…>`                    | Font Awesome `<i>`               |
//!
//! All of them accept a `class` attribute with extra classes.

use crate::doctree::{Element, escape};
use crate::reference::{Reference, ReferenceError, Resolver};
use std::fmt::Write;

/// Outcome of rendering one inline element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Html(String),
    /// Reference resolved to nothing; carries the warning message.
    Missing(String),
}

/// Render `element` if it is inline markup, `Ok(None)` otherwise.
pub fn render(element: &Element, resolver: &Resolver<'_>) -> Result<Option<Inline>, ReferenceError> {
    let inline = match element.name() {
        "odoo-field" => field(element, resolver)?,
        "odoo-menu" => menu(element, resolver)?,
        "odoo-model" => model(element, resolver),
        "odoo-fields" => field_list(element, resolver),
        "odoo-icon" => icon(element),
        _ => return Ok(None),
    };
    Ok(Some(inline))
}

fn field(element: &Element, resolver: &Resolver<'_>) -> Result<Inline, ReferenceError> {
    let content = element.text_content();
    let content = content.trim();
    let reference = Reference::field(content, element.has_attr("help"))?;

    Ok(match resolver.lookup(&reference) {
        Some(text) => Inline::Html(format!(
            r#"<code class="{}">{}</code>"#,
            class_list(&resolver.settings().field_class, element),
            escape(&text)
        )),
        None => Inline::Missing(format!("Model/Field \"{content}\" not found.")),
    })
}

fn menu(element: &Element, resolver: &Resolver<'_>) -> Result<Inline, ReferenceError> {
    let content = element.text_content();
    let content = content.trim();
    let reference = Reference::menu(content, element.has_attr("nameonly"))?;

    Ok(match resolver.lookup(&reference) {
        Some(text) => Inline::Html(format!(
            r#"<span class="menuselection {}">{}</span>"#,
            class_list(&resolver.settings().menu_class, element),
            escape(&text)
        )),
        None => Inline::Missing(format!("Menu entry \"{content}\" not found.")),
    })
}

fn model(element: &Element, resolver: &Resolver<'_>) -> Inline {
    let model = element.text_content();
    let model = model.trim();

    match resolver.lookup_model(model) {
        Some(name) => Inline::Html(format!(
            r#"<code class="{}">{}</code>"#,
            class_list(&resolver.settings().model_class, element),
            escape(&name)
        )),
        None => Inline::Missing(format!("Model \"{model}\" not found.")),
    }
}

/// Definition list of the fields that have a help text.
fn field_list(element: &Element, resolver: &Resolver<'_>) -> Inline {
    let model = element.text_content();
    let model = model.trim();
    let requested: Option<Vec<String>> = element
        .attr("fields")
        .map(|fields| fields.split_ascii_whitespace().map(str::to_owned).collect())
        .filter(|fields: &Vec<String>| !fields.is_empty());

    let settings = resolver.settings();
    let docs = match resolver
        .source()
        .lookup_field_docs(model, requested.as_deref(), &settings.locale)
    {
        Ok(docs) => docs,
        Err(err) => {
            crate::debug!("resolve"; "fields of {model}: {err}");
            return Inline::Missing(format!("Model \"{model}\" not found."));
        }
    };

    let mut html = format!(
        r#"<dl class="field-list {}">"#,
        class_list(&settings.fieldlist_class, element)
    );
    for doc in &docs {
        let Some(help) = doc.help.as_deref() else {
            continue;
        };
        let label = doc.label.as_deref().unwrap_or(&doc.name);
        let _ = write!(html, r#"<dt>{}</dt><dd><div class="line-block">"#, escape(label));
        for line in help.split('\n') {
            let _ = write!(html, r#"<div class="line">{}</div>"#, escape(line));
        }
        html.push_str("</div></dd>");
    }
    html.push_str("</dl>");
    Inline::Html(html)
}

fn icon(element: &Element) -> Inline {
    let name = element.text_content();
    Inline::Html(format!(
        r#"<i class="fa fa-{}" aria-hidden="true"></i>"#,
        escape(name.trim())
    ))
}

/// Configured class followed by the element's own `class` attribute.
fn class_list(base: &str, element: &Element) -> String {
    let mut classes = escape(base).into_owned();
    for class in element.classes() {
        classes.push(' ');
        classes.push_str(&escape(class));
    }
    classes
}
