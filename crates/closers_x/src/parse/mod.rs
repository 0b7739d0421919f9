//! Object construction shared by the binary and text parsers.
//!
//! Both encodings describe the same grammar, only their tokens differ. A [`Syntax`] supplies
//! values and delimiters, [`read_object`] walks the template of each object and asks the syntax
//! for what comes next.

pub mod binary;
pub mod text;

use tracing::trace;

use crate::{
    error::{Error, Result},
    object::{Child, DataObject, Value},
    template::{ArraySize, Kind, Member, Scalar, ValueKind},
};

/// Upper bound on preallocated array elements, sizes come from the file
const MAX_PREALLOCATED: usize = 4096;

/// Entry read after the members of an open object
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OpenItem {
    /// Closing brace of the object
    Close,
    /// `{ name }`
    Reference(String),
    /// Start of a nested object of this kind
    Object(Kind),
}

/// Tokenizer side of a parser
pub(crate) trait Syntax {
    /// Position in the input, for error reporting
    fn offset(&self) -> usize;

    /// Read a primitive value. `in_array` is set for elements of primitive arrays.
    fn scalar(&mut self, scalar: Scalar, in_array: bool) -> Result<Value>;

    /// Consume whatever ends a member that is not an array
    fn member_end(&mut self) -> Result<()> {
        Ok(())
    }

    /// Consume whatever follows element `index` of an array of `len` elements
    fn element_end(&mut self, _index: usize, _len: usize) -> Result<()> {
        Ok(())
    }

    /// Consume whatever stands for an array without elements
    fn empty_array(&mut self) -> Result<()> {
        Ok(())
    }

    /// Read the optional object name and the opening brace
    fn object_header(&mut self) -> Result<String>;

    /// Read the next child, reference or closing brace of an open object
    fn open_item(&mut self) -> Result<OpenItem>;

    /// Read the closing brace of a closed object
    fn close_object(&mut self) -> Result<()>;
}

/// Read an object of `kind` whose type name has already been consumed.
pub(crate) fn read_object<S: Syntax>(syntax: &mut S, kind: Kind) -> Result<DataObject> {
    let name = syntax.object_header()?;
    let mut object = DataObject::new(kind, name);
    read_members(syntax, &mut object)?;

    if !object.template().open {
        syntax.close_object()?;
        trace!(kind = %object.kind, name = %object.name, "read object");
        return Ok(object);
    }

    loop {
        let child = match syntax.open_item()? {
            OpenItem::Close => break,
            OpenItem::Reference(name) => Child::Reference(name),
            OpenItem::Object(kind) => Child::Object(read_object(syntax, kind)?),
        };
        object
            .insert_child(child)
            .map_err(|source| Error::InvalidChild {
                offset: syntax.offset(),
                source,
            })?;
    }

    trace!(
        kind = %object.kind,
        name = %object.name,
        children = object.children().len(),
        "read object"
    );
    Ok(object)
}

fn read_members<S: Syntax>(syntax: &mut S, object: &mut DataObject) -> Result<()> {
    for member in object.template().members {
        let value = match member.array {
            None => {
                let value = read_value(syntax, member.kind, false)?;
                syntax.member_end()?;
                value
            }
            Some(size) => {
                let len = array_len(syntax, object, member, size)?;
                read_array(syntax, member.kind, len)?
            }
        };
        object.fields.insert(member.name, value);
    }
    Ok(())
}

fn array_len<S: Syntax>(
    syntax: &S,
    object: &DataObject,
    member: &Member,
    size: ArraySize,
) -> Result<usize> {
    match size {
        ArraySize::Literal(len) => Ok(len),
        ArraySize::Member(name) => object
            .get(name)
            .and_then(Value::as_u32)
            .map(|len| len as usize)
            .ok_or(Error::MissingArraySize {
                offset: syntax.offset(),
                member: member.name,
                size: name,
            }),
    }
}

fn read_array<S: Syntax>(syntax: &mut S, kind: ValueKind, len: usize) -> Result<Value> {
    if len == 0 {
        syntax.empty_array()?;
        return Ok(Value::Array(Vec::new()));
    }

    let mut values = Vec::with_capacity(len.min(MAX_PREALLOCATED));
    for index in 0..len {
        values.push(read_value(syntax, kind, true)?);
        syntax.element_end(index, len)?;
    }
    Ok(Value::Array(values))
}

fn read_value<S: Syntax>(syntax: &mut S, kind: ValueKind, in_array: bool) -> Result<Value> {
    match kind {
        ValueKind::Scalar(scalar) => syntax.scalar(scalar, in_array),
        ValueKind::Object(kind) => {
            let mut nested = DataObject::new(kind, "");
            read_members(syntax, &mut nested)?;
            Ok(Value::Object(nested))
        }
    }
}
