//! Data objects, the tree both parsers produce.

use std::fmt::{self, Write};

use indexmap::IndexMap;

use crate::{
    error::ChildError,
    template::{ArraySize, Kind, Template},
};

/// Value of a member
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `WORD` or `DWORD`
    Integer(u32),
    /// `float`, widened to 64 bits
    Float(f64),
    /// Quoted string
    String(String),
    /// Nested object
    Object(DataObject),
    /// Array member
    Array(Vec<Value>),
}

impl Value {
    /// The integer held, if any
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The number held, integers included
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// The string held, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// The nested object, if any
    pub fn as_object(&self) -> Option<&DataObject> {
        match self {
            Value::Object(value) => Some(value),
            _ => None,
        }
    }

    /// The elements, if this is an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) => Some(values),
            _ => None,
        }
    }

    fn write_text(&self, out: &mut impl Write, indent: usize) -> fmt::Result {
        match self {
            Value::Integer(value) => write!(out, "{value}"),
            // Avoid printing negative zero
            Value::Float(value) if *value == 0.0 => out.write_str("0.000000"),
            Value::Float(value) => write!(out, "{value:.6}"),
            Value::String(value) => write!(out, "\"{value}\""),
            Value::Object(object) => object.write_members(out, indent),
            Value::Array(values) => {
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.write_char(',')?;
                        newline(out, indent)?;
                    }
                    value.write_text(out, indent)?;
                }
                Ok(())
            }
        }
    }
}

/// Entry in the children of an open object
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// Nested object
    Object(DataObject),
    /// Name of an object defined elsewhere, left for the consumer to resolve
    Reference(String),
}

/// Parsed instance of a [`Template`]
#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    /// Kind of the object
    pub kind: Kind,
    /// Name given to the object, empty when anonymous
    pub name: String,
    /// Member values in template order
    pub fields: IndexMap<&'static str, Value>,
    /// Children, present only for open kinds
    pub children: Option<Vec<Child>>,
}

impl DataObject {
    /// Create an object without members
    pub fn new(kind: Kind, name: impl Into<String>) -> DataObject {
        DataObject {
            kind,
            name: name.into(),
            fields: IndexMap::with_capacity(kind.template().members.len()),
            children: kind.template().open.then(Vec::new),
        }
    }

    /// Template of the object's kind
    pub fn template(&self) -> &'static Template {
        self.kind.template()
    }

    /// Value of a member
    pub fn get(&self, member: &str) -> Option<&Value> {
        self.fields.get(member)
    }

    /// Children in order, empty for closed kinds
    pub fn children(&self) -> &[Child] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Names of the referenced objects in order
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.children().iter().filter_map(|child| match child {
            Child::Reference(name) => Some(name.as_str()),
            Child::Object(_) => None,
        })
    }

    /// Insert an object or reference into the children.
    ///
    /// References inserted into an `Animation` go in front of the existing children, so the
    /// animated frame is always the first child. Everything else is appended.
    pub fn insert_child(&mut self, child: Child) -> Result<(), ChildError> {
        let template = self.template();
        let Some(children) = self.children.as_mut() else {
            return Err(ChildError::NotOpen(self.kind.name()));
        };

        match &child {
            Child::Reference(name) if name.is_empty() => return Err(ChildError::EmptyReference),
            Child::Object(object) if !template.allows(object.kind) => {
                return Err(ChildError::Restricted {
                    parent: self.kind.name(),
                    child: object.kind.name(),
                })
            }
            _ => {}
        }

        if self.kind == Kind::Animation && matches!(child, Child::Reference(_)) {
            children.insert(0, child);
        } else {
            children.push(child);
        }
        Ok(())
    }

    /// Every object below this one, depth first, references skipped
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![self.children().iter()],
        }
    }

    /// Render the object in the text encoding
    pub fn write_text(&self, out: &mut impl Write, indent: usize) -> fmt::Result {
        out.write_str(self.kind.name())?;
        if !self.name.is_empty() {
            write!(out, " {}", self.name)?;
        }
        out.write_str(" {\n")?;

        let inner = indent + 1;
        if !self.template().members.is_empty() {
            spaces(out, inner)?;
            self.write_members(out, inner)?;
            out.write_char('\n')?;
        }

        if !self.children().is_empty() {
            spaces(out, inner)?;
            self.write_children(out, inner)?;
        }

        spaces(out, indent)?;
        out.write_char('}')
    }

    /// Render the members only, the form nested objects take inside their parent
    pub fn write_members(&self, out: &mut impl Write, indent: usize) -> fmt::Result {
        let members = self.template().members;
        for (i, member) in members.iter().enumerate() {
            match (self.fields.get(member.name), member.array) {
                // Matrices keep four elements per line
                (Some(Value::Array(values)), Some(ArraySize::Literal(16))) => {
                    for (j, value) in values.iter().enumerate() {
                        value.write_text(out, indent)?;
                        if j + 1 < values.len() {
                            out.write_char(',')?;
                            if (j + 1) % 4 == 0 {
                                newline(out, indent)?;
                            }
                        }
                    }
                }
                (Some(value), _) => value.write_text(out, indent)?,
                (None, _) => {}
            }

            out.write_char(';')?;
            if i + 1 < members.len() {
                newline(out, indent)?;
            }
        }
        Ok(())
    }

    fn write_children(&self, out: &mut impl Write, indent: usize) -> fmt::Result {
        let children = self.children();
        for (i, child) in children.iter().enumerate() {
            match child {
                Child::Reference(name) => write!(out, "{{{name}}}")?,
                Child::Object(object) => object.write_text(out, indent)?,
            }
            out.write_char('\n')?;
            if i + 1 < children.len() {
                spaces(out, indent)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f, 0)
    }
}

fn spaces(out: &mut impl Write, count: usize) -> fmt::Result {
    write!(out, "{:count$}", "")
}

fn newline(out: &mut impl Write, indent: usize) -> fmt::Result {
    out.write_char('\n')?;
    spaces(out, indent)
}

/// Iterator returned by [`DataObject::descendants`]
#[derive(Debug, Clone)]
pub struct Descendants<'a> {
    stack: Vec<std::slice::Iter<'a, Child>>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a DataObject;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(children) = self.stack.last_mut() {
            match children.next() {
                Some(Child::Object(object)) => {
                    self.stack.push(object.children().iter());
                    return Some(object);
                }
                Some(Child::Reference(_)) => continue,
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}
