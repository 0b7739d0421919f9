use closers_x::{
    decode,
    error::{Error, Result},
    Child, DataObject, Kind, Value,
};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

const CUBE: &[u8] = include_bytes!("resources/cube.x");

fn child<'a>(object: &'a DataObject, kind: Kind) -> &'a DataObject {
    object
        .children()
        .iter()
        .find_map(|child| match child {
            Child::Object(o) if o.kind == kind => Some(o),
            _ => None,
        })
        .unwrap_or_else(|| panic!("{} has no {kind}", object.kind))
}

#[traced_test]
#[test]
fn parse_cube() -> Result<()> {
    let file = decode(CUBE)?;
    let kinds: Vec<Kind> = file.objects.iter().map(|o| o.kind).collect();
    assert_eq!(
        kinds,
        vec![Kind::Header, Kind::Material, Kind::Frame, Kind::AnimationSet]
    );
    assert_eq!(file.texture_filenames().collect::<Vec<_>>(), vec!["red.dds"]);

    let cube = child(&file.objects[2], Kind::Frame);
    assert_eq!(cube.name, "Cube");

    let mesh = child(cube, Kind::Mesh);
    assert_eq!(mesh.get("nVertices"), Some(&Value::Integer(8)));
    assert_eq!(mesh.get("faces").and_then(Value::as_array).map(<[_]>::len), Some(6));

    let list = child(mesh, Kind::MeshMaterialList);
    assert_eq!(list.references().collect::<Vec<_>>(), vec!["Red"]);

    let transform = child(cube, Kind::FrameTransformMatrix);
    let matrix = transform
        .get("frameMatrix")
        .and_then(Value::as_object)
        .and_then(|m| m.get("matrix"))
        .and_then(Value::as_array)
        .unwrap();
    assert_eq!(matrix[13], Value::Float(2.5));
    Ok(())
}

#[traced_test]
#[test]
fn animation_reference_comes_first() -> Result<()> {
    let file = decode(CUBE)?;
    let animation = child(&file.objects[3], Kind::Animation);

    assert_eq!(animation.children()[0], Child::Reference("Cube".to_owned()));
    assert_eq!(animation.children().len(), 3);

    let key = child(animation, Kind::AnimationKey);
    let keys = key.get("keys").and_then(Value::as_array).unwrap();
    let second = keys[1].as_object().unwrap();
    assert_eq!(second.get("time"), Some(&Value::Integer(4800)));
    Ok(())
}

#[traced_test]
#[test]
fn serialization_is_stable() -> Result<()> {
    let file = decode(CUBE)?;
    let text = file.to_string();

    let reparsed = decode(text.as_bytes())?;
    assert_eq!(reparsed.objects, file.objects);
    assert_eq!(reparsed.to_string(), text);

    // The reference moved ahead of the key is written first
    let start = text.find("Animation {").unwrap();
    assert!(text[start..].starts_with("Animation {\n  {Cube}\n  AnimationKey {"));
    Ok(())
}

#[test]
fn corrupted_files() {
    let mut bytes = CUBE.to_vec();
    bytes[1] = b'X';
    assert!(matches!(decode(&bytes), Err(Error::InvalidMagic { .. })));

    let text = String::from_utf8_lossy(CUBE).replace("   8;\n", "   9;\n");
    assert!(matches!(
        decode(text.as_bytes()),
        Err(Error::ArraySizeMismatch {
            expected: 9,
            found: 8,
            ..
        })
    ));

    let text = String::from_utf8_lossy(CUBE).replace("AnimationSet Spin", "AnimSet Spin");
    assert!(matches!(
        decode(text.as_bytes()),
        Err(Error::UnknownKind { name, .. }) if name == "AnimSet"
    ));
}
