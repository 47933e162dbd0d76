//! Definitions documents and inclusion, read from the fixture files

use std::collections::HashMap;
use std::fs;

use xjconf::{
    load_schema, AccessorError, Bindable, Binder, ErrorKind, FileSource, MemorySource, Schema,
    TypeRegistry, Value,
};

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

#[derive(Debug, Default)]
struct Server {
    host: String,
    port: i32,
    secure: bool,
}

impl Bindable for Server {
    fn set(&mut self, accessor: &str, value: Value) -> Result<(), AccessorError> {
        match accessor {
            "setHost" => self.host = value.try_into()?,
            "setPort" => self.port = value.try_into()?,
            "setSecure" => self.secure = value.try_into()?,
            other => return Err(AccessorError::NotFound(other.to_string())),
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Cluster {
    servers: HashMap<String, Server>,
    motd: Option<String>,
}

impl Bindable for Cluster {
    fn set(&mut self, accessor: &str, _value: Value) -> Result<(), AccessorError> {
        Err(AccessorError::NotFound(accessor.to_string()))
    }

    fn add_keyed_child(&mut self, key: &str, child: Value) -> Result<(), AccessorError> {
        if key == "motd" {
            self.motd = Some(child.try_into()?);
        } else {
            self.servers.insert(key.to_string(), child.downcast()?);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StringList(Vec<String>);

impl Bindable for StringList {
    fn set(&mut self, accessor: &str, _value: Value) -> Result<(), AccessorError> {
        Err(AccessorError::NotFound(accessor.to_string()))
    }

    fn add_child(&mut self, child: Value) -> Result<(), AccessorError> {
        self.0.push(child.try_into()?);
        Ok(())
    }
}

fn fixture(name: &str) -> std::io::Result<String> {
    fs::read_to_string(format!("{FIXTURES}/{name}"))
}

fn schema() -> Result<Schema, Box<dyn std::error::Error>> {
    Ok(load_schema(&fixture("defines.xml")?)?)
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_bindable::<Server>("app.Server")
        .register_bindable::<Cluster>("app.Cluster")
        .register_bindable::<StringList>("app.StringList");
    registry
}

#[test]
fn test_fixture_schema_verifies() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    assert_eq!(schema.len(), 2);
    schema.verify(&registry())?;
    Ok(())
}

#[test]
fn test_bind_list_fixture() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let list: StringList = Binder::new(&schema, &registry)
        .bind_str(&fixture("list.xml")?)?
        .downcast()?;
    assert_eq!(list.0, ["a", "b"]);
    Ok(())
}

#[test]
fn test_bind_with_file_includes() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let source = FileSource::new(FIXTURES);
    let cluster: Cluster = Binder::new(&schema, &registry)
        .bind_str_with_includes(&fixture("cluster.xml")?, &source)?
        .downcast()?;

    let mut keys: Vec<&str> = cluster.servers.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, ["backup", "primary", "spare"]);

    let backup = cluster.servers.get("backup");
    assert_eq!(backup.map(|s| s.host.as_str()), Some("backup.internal"));
    assert_eq!(backup.map(|s| s.port), Some(8081));
    assert_eq!(cluster.servers.get("primary").map(|s| s.secure), Some(true));
    assert_eq!(cluster.servers.get("spare").map(|s| s.port), Some(9999));
    assert_eq!(cluster.motd.as_deref(), Some("Welcome aboard"));
    Ok(())
}

#[test]
fn test_inclusion_failure_aborts_bind() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let document = r#"<cluster xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include href="nowhere.xml"/></cluster>"#;
    let err = Binder::new(&schema, &registry)
        .bind_str_with_includes(document, &MemorySource::new())
        .err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::Inclusion {
            href: "nowhere.xml".to_string()
        })
    );
    Ok(())
}

#[test]
fn test_included_elements_are_validated() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let source = MemorySource::new().with("bad.xml", r#"<server id="x" port="1" colour="red"/>"#);
    let document = r#"<cluster xmlns:xi="http://www.w3.org/2001/XInclude"><xi:include href="bad.xml"/></cluster>"#;
    let err = Binder::new(&schema, &registry)
        .bind_str_with_includes(document, &source)
        .err();
    assert!(matches!(
        err.as_ref().map(xjconf::Error::kind),
        Some(ErrorKind::UnknownAttribute { attribute, .. }) if attribute == "colour"
    ));
    Ok(())
}

#[test]
fn test_broken_fixture_reports_position() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let err = Binder::new(&schema, &registry)
        .bind_str(&fixture("broken.xml")?)
        .err();
    let Some(err) = err else {
        panic!("missing port should fail");
    };
    assert!(matches!(err.kind(), ErrorKind::MissingAttribute { .. }));
    assert_eq!(err.span().start.line, 2);
    Ok(())
}
