//! Schema-driven rendering of product configuration files.
//!
//! The products consume sectioned key/value files: bracketed `[section]`
//! headers followed by assignment lines. Instead of reflecting over typed
//! structs, every file is described as data. A [`ConfigFile`] holds ordered
//! [`Section`]s, which hold ordered [`Field`]s; rendering is a deterministic
//! walk over that description. Logically equal descriptions always produce
//! byte-identical text, because every unordered map boundary is re-sorted
//! before rendering. The diff-based reconcilers depend on this.
//!
//! Assignment spacing (`key = value` vs `key=value`) and key casing are
//! per-file-family constants carried in a [`RenderStyle`]; they are part of
//! the format the products parse and must not drift.

mod casing;
mod value;

use std::collections::BTreeMap;

use snafu::Snafu;

pub use crate::confgen::{
    casing::config_key,
    value::{Scalar, SectionValue},
};

/// Reserved section identifier that renders as the wildcard header `[*]`.
pub const WILDCARD_SECTION: &str = "All";

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    /// A scalar value arrived at a section position. This is a programming
    /// error in the product assembly code, never a recoverable condition;
    /// callers must not apply partial output.
    #[snafu(display("section {section:?} must be record-shaped, got a scalar value"))]
    NotARecord { section: String },
}

/// How one config-file family spells its assignments and keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderStyle {
    pub assignment: Assignment,
    pub key_case: KeyCase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// `key = value`
    Spaced,
    /// `key=value`
    Compact,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCase {
    /// Field identifiers run through [`config_key`].
    Kebab,
    /// Field identifiers render exactly as declared.
    Verbatim,
}

/// One field of a section: a declared identifier plus a renderable value.
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    ident: String,
    key_override: Option<String>,
    value: FieldValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    /// Explicit-optional: `None` is omitted, `Some` always renders, even
    /// when the contained value is zero. Used for settings where an
    /// explicitly cleared value means something to the product (an empty
    /// claim, for example).
    Optional(Option<Scalar>),
    /// One assignment line per non-empty element, in declared order.
    List(Vec<Scalar>),
    /// Opens a new bracketed header named after the field key.
    Section(SectionValue),
}

impl Field {
    pub fn scalar(ident: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self {
            ident: ident.into(),
            key_override: None,
            value: FieldValue::Scalar(value.into()),
        }
    }

    pub fn optional(ident: impl Into<String>, value: Option<impl Into<Scalar>>) -> Self {
        Self {
            ident: ident.into(),
            key_override: None,
            value: FieldValue::Optional(value.map(Into::into)),
        }
    }

    pub fn list<I, S>(ident: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Scalar>,
    {
        Self {
            ident: ident.into(),
            key_override: None,
            value: FieldValue::List(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn section(ident: impl Into<String>, value: SectionValue) -> Self {
        Self {
            ident: ident.into(),
            key_override: None,
            value: FieldValue::Section(value),
        }
    }

    /// Overrides the rendered key name, bypassing case conversion.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key_override = Some(key.into());
        self
    }

    fn rendered_key(&self, key_case: KeyCase) -> String {
        if let Some(key) = &self.key_override {
            return key.clone();
        }

        match key_case {
            KeyCase::Kebab => config_key(&self.ident),
            KeyCase::Verbatim => self.ident.clone(),
        }
    }
}

/// How the sub-headers of a map-of-section body are spelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapHeaderStyle {
    /// `[SectionName "key"]`
    Quoted,
    /// `[key]`
    Bare,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    name: String,
    body: SectionBody,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SectionBody {
    /// The whole section is skipped: no header, no lines.
    Absent,
    Record(Vec<Field>),
    /// One sub-section per map key, rendered in sorted key order. A bare
    /// `[name]` header for the section itself is never emitted.
    Map {
        entries: BTreeMap<String, SectionValue>,
        headers: MapHeaderStyle,
    },
}

impl Section {
    pub fn record(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            body: SectionBody::Record(fields.into_iter().collect()),
        }
    }

    pub fn absent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: SectionBody::Absent,
        }
    }

    pub fn map(
        name: impl Into<String>,
        entries: BTreeMap<String, SectionValue>,
        headers: MapHeaderStyle,
    ) -> Self {
        Self {
            name: name.into(),
            body: SectionBody::Map { entries, headers },
        }
    }
}

/// A renderable configuration file: a logical file name, the family's
/// [`RenderStyle`] and the sections in declaration order.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigFile {
    name: String,
    style: RenderStyle,
    sections: Vec<Section>,
}

impl ConfigFile {
    pub fn new(name: impl Into<String>, style: RenderStyle) -> Self {
        Self {
            name: name.into(),
            style,
            sections: Vec::new(),
        }
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders the file to its final text, normalized to exactly one
    /// trailing newline.
    pub fn render(&self) -> Result<String> {
        let mut out = String::new();
        for section in &self.sections {
            self.render_section(&mut out, section)?;
        }

        let content_len = out.trim_end_matches('\n').len();
        out.truncate(content_len);
        out.push('\n');
        Ok(out)
    }

    fn render_section(&self, out: &mut String, section: &Section) -> Result<()> {
        match &section.body {
            SectionBody::Absent => {}
            SectionBody::Record(fields) => {
                push_header(out, &section.name);
                self.render_fields(out, &section.name, fields)?;
            }
            SectionBody::Map { entries, headers } => {
                // BTreeMap iteration is already the deterministic sorted
                // order the output needs.
                for (key, value) in entries {
                    let fields = match value {
                        SectionValue::Absent => continue,
                        SectionValue::Record(fields) => fields,
                        SectionValue::Scalar(_) => {
                            return NotARecordSnafu {
                                section: format!("{name} \"{key}\"", name = section.name),
                            }
                            .fail();
                        }
                    };

                    match headers {
                        MapHeaderStyle::Quoted => {
                            out.push_str(&format!("\n[{name} \"{key}\"]\n", name = section.name));
                        }
                        MapHeaderStyle::Bare => push_header(out, key),
                    }
                    self.render_fields(out, key, fields)?;
                }
            }
        }

        Ok(())
    }

    fn render_fields(&self, out: &mut String, section: &str, fields: &[Field]) -> Result<()> {
        for field in fields {
            let key = field.rendered_key(self.style.key_case);
            match &field.value {
                FieldValue::Scalar(scalar) => {
                    if !scalar.is_zero() {
                        self.push_assignment(out, &key, scalar);
                    }
                }
                FieldValue::Optional(None) => {}
                FieldValue::Optional(Some(scalar)) => self.push_assignment(out, &key, scalar),
                FieldValue::List(values) => {
                    for scalar in values {
                        if !scalar.is_zero() {
                            self.push_assignment(out, &key, scalar);
                        }
                    }
                }
                FieldValue::Section(value) => {
                    let nested = match value {
                        SectionValue::Absent => continue,
                        SectionValue::Record(nested) => nested,
                        SectionValue::Scalar(_) => {
                            return NotARecordSnafu {
                                section: format!("{section}.{ident}", ident = field.ident),
                            }
                            .fail();
                        }
                    };

                    if field.ident == WILDCARD_SECTION {
                        push_header(out, WILDCARD_SECTION);
                    } else {
                        push_header(out, &key);
                    }
                    self.render_fields(out, &field.ident, nested)?;
                }
            }
        }

        Ok(())
    }

    fn push_assignment(&self, out: &mut String, key: &str, value: &Scalar) {
        match self.style.assignment {
            Assignment::Spaced => out.push_str(&format!("{key} = {value}\n")),
            Assignment::Compact => out.push_str(&format!("{key}={value}\n")),
        }
    }
}

fn push_header(out: &mut String, name: &str) {
    let name = if name == WILDCARD_SECTION { "*" } else { name };
    out.push_str(&format!("\n[{name}]\n"));
}

/// A set of rendered files keyed by logical file name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigFileSet {
    files: BTreeMap<String, String>,
}

impl ConfigFileSet {
    pub fn render(files: &[ConfigFile]) -> Result<Self> {
        let mut set = Self::default();
        for file in files {
            set.files.insert(file.name.clone(), file.render()?);
        }
        Ok(set)
    }

    /// Unions `other` into `self`. Entries from `other` win on file-name
    /// collisions, so callers sequence families intentionally.
    pub fn merge(&mut self, other: ConfigFileSet) {
        self.files.extend(other.files);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.files
    }
}
