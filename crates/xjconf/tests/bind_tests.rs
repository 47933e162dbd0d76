use std::collections::HashMap;
use std::net::Ipv4Addr;

use xjconf::{
    AccessorError, AttributeDefinition, BindOptions, Bindable, Binder, Config, DuplicateKeys, ErrorKind,
    Schema, TagDefinition, TypeRegistry, Value, DEPTH_CEILING,
};

#[derive(Debug, Default, PartialEq)]
struct Server {
    host: String,
    port: i32,
    secure: Option<bool>,
    address: Option<Ipv4Addr>,
    calls: Vec<String>,
}

impl Bindable for Server {
    fn set(&mut self, accessor: &str, value: Value) -> Result<(), AccessorError> {
        self.calls.push(accessor.to_string());
        match accessor {
            "setHost" => self.host = value.try_into()?,
            "setPort" => self.port = value.try_into()?,
            "setSecure" => self.secure = Some(value.try_into()?),
            "bindAddress" => self.address = Some(value.downcast()?),
            "setColour" => return Err(AccessorError::NotFound(accessor.to_string())),
            other => return Err(AccessorError::NotFound(other.to_string())),
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

#[derive(Debug, Default)]
struct Cluster {
    servers: HashMap<String, Server>,
    keys: Vec<String>,
}

impl Bindable for Cluster {
    fn set(&mut self, accessor: &str, _value: Value) -> Result<(), AccessorError> {
        Err(AccessorError::NotFound(accessor.to_string()))
    }

    fn add_keyed_child(&mut self, key: &str, child: Value) -> Result<(), AccessorError> {
        self.keys.push(key.to_string());
        self.servers.insert(key.to_string(), child.downcast()?);
        Ok(())
    }
}

fn server_definition() -> xjconf::Result<TagDefinition> {
    TagDefinition::new("server", "app.Server")?
        .with_name_attribute("id")
        .with_attribute(AttributeDefinition::typed("port", "int")?.required(true))?
        .with_attribute(AttributeDefinition::new("host")?.with_default("localhost"))?
        .with_attribute(AttributeDefinition::typed("secure", "boolean")?)?
        .with_attribute(AttributeDefinition::typed("address", "net.Ipv4")?.with_accessor("bindAddress"))?
        .with_attribute(AttributeDefinition::new("colour")?)
}

fn schema() -> xjconf::Result<Schema> {
    let list = TagDefinition::new("list", "app.StringList")?
        .indexed(true)
        .with_child(TagDefinition::new("item", "string")?)?;
    let cluster = TagDefinition::new("cluster", "app.Cluster")?.with_child(server_definition()?)?;
    Ok(Schema::new()
        .with(server_definition()?)
        .with(list)
        .with(cluster))
}

fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_bindable::<Server>("app.Server")
        .register_bindable::<StringList>("app.StringList")
        .register_bindable::<Cluster>("app.Cluster")
        .register_parse::<Ipv4Addr>("net.Ipv4");
    registry
}

fn bind(document: &str) -> xjconf::Result<Value> {
    let schema = schema()?;
    let registry = registry();
    Binder::new(&schema, &registry).bind_str(document)
}

#[test]
fn test_default_applied_like_document_text() -> Result<(), Box<dyn std::error::Error>> {
    let server: Server = bind(r#"<server port="8080"/>"#)?.downcast()?;
    assert_eq!(server.port, 8080);
    assert_eq!(server.host, "localhost");

    let explicit: Server = bind(r#"<server port="8080" host="localhost"/>"#)?.downcast()?;
    assert_eq!(explicit, server);
    Ok(())
}

#[test]
fn test_missing_required_attribute() {
    let err = bind("<server/>").err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::MissingAttribute {
            tag: "server".to_string(),
            attribute: "port".to_string(),
        })
    );
}

#[test]
fn test_optional_absent_attribute_skips_accessor() -> Result<(), Box<dyn std::error::Error>> {
    let server: Server = bind(r#"<server port="1"/>"#)?.downcast()?;
    assert_eq!(server.secure, None);
    assert_eq!(server.calls, ["setPort", "setHost"]);
    Ok(())
}

#[test]
fn test_attributes_bound_in_registration_order() -> Result<(), Box<dyn std::error::Error>> {
    let server: Server =
        bind(r#"<server secure="true" host="example.org" port="443"/>"#)?.downcast()?;
    assert_eq!(server.calls, ["setPort", "setHost", "setSecure"]);
    assert_eq!(server.secure, Some(true));
    Ok(())
}

#[test]
fn test_unknown_attribute() {
    let err = bind(r#"<server port="1" color="red"/>"#).err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::UnknownAttribute {
            tag: "server".to_string(),
            attribute: "color".to_string(),
        })
    );
}

#[test]
fn test_name_attribute_is_not_unknown() -> Result<(), Box<dyn std::error::Error>> {
    let server: Server = bind(r#"<server id="main" port="1"/>"#)?.downcast()?;
    assert_eq!(server.port, 1);
    Ok(())
}

#[test]
fn test_conversion_error_names_text_attribute_and_tag() {
    let err = bind(r#"<server port="eighty"/>"#).err();
    let Some(err) = err else {
        panic!("conversion should fail");
    };
    assert_eq!(
        err.kind(),
        &ErrorKind::ValueConversion {
            tag: "server".to_string(),
            attribute: "port".to_string(),
            value: "eighty".to_string(),
            target: "int".to_string(),
        }
    );
    let message = err.to_string();
    assert!(message.contains("eighty"), "{message}");
    assert!(message.contains("port"), "{message}");
    assert!(message.contains("server"), "{message}");
}

#[test]
fn test_strict_boolean() {
    let err = bind(r#"<server port="1" secure="yes"/>"#).err();
    assert!(matches!(
        err.as_ref().map(xjconf::Error::kind),
        Some(ErrorKind::ValueConversion { .. })
    ));
}

#[test]
fn test_object_converter_attribute() -> Result<(), Box<dyn std::error::Error>> {
    let server: Server = bind(r#"<server port="1" address="192.168.0.1"/>"#)?.downcast()?;
    assert_eq!(server.address, Some(Ipv4Addr::new(192, 168, 0, 1)));

    let err = bind(r#"<server port="1" address="not-an-ip"/>"#).err();
    assert!(matches!(
        err.as_ref().map(xjconf::Error::kind),
        Some(ErrorKind::ValueConversion { attribute, .. }) if attribute == "address"
    ));
    Ok(())
}

#[test]
fn test_accessor_failure() {
    let err = bind(r#"<server port="1" colour="red"/>"#).err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::Accessor {
            tag: "server".to_string(),
            accessor: "setColour".to_string(),
        })
    );
}

#[test]
fn test_indexed_children_in_document_order() -> Result<(), Box<dyn std::error::Error>> {
    let list: StringList = bind("<list><item>a</item><item>b</item></list>")?.downcast()?;
    assert_eq!(list.0, ["a", "b"]);
    Ok(())
}

#[test]
fn test_value_tag_text_is_trimmed() -> Result<(), Box<dyn std::error::Error>> {
    let list: StringList = bind("<list>\n  <item>  spaced  </item>\n</list>")?.downcast()?;
    assert_eq!(list.0, ["spaced"]);
    Ok(())
}

#[test]
fn test_unknown_child_tag() {
    let err = bind("<list><entry>a</entry></list>").err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::UnknownTag {
            tag: "entry".to_string()
        })
    );
}

#[test]
fn test_keyed_children_last_wins() -> Result<(), Box<dyn std::error::Error>> {
    let cluster: Cluster = bind(
        r#"<cluster><server id="a" port="1"/><server id="b" port="2"/><server id="a" port="3"/></cluster>"#,
    )?
    .downcast()?;
    assert_eq!(cluster.keys, ["a", "b", "a"]);
    assert_eq!(cluster.servers.get("a").map(|s| s.port), Some(3));
    assert_eq!(cluster.servers.get("b").map(|s| s.port), Some(2));
    Ok(())
}

#[test]
fn test_keyed_child_without_name_uses_tag_name() -> Result<(), Box<dyn std::error::Error>> {
    let cluster: Cluster = bind(r#"<cluster><server port="1"/></cluster>"#)?.downcast()?;
    assert_eq!(cluster.keys, ["server"]);
    Ok(())
}

#[test]
fn test_duplicate_keys_rejected_on_request() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let options = BindOptions {
        duplicate_keys: DuplicateKeys::Reject,
        ..BindOptions::default()
    };
    let err = xjconf::bind_str_with_options(
        &schema,
        &registry,
        r#"<cluster><server id="a" port="1"/><server id="a" port="2"/></cluster>"#,
        options,
    )
    .err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::DuplicateKey {
            tag: "cluster".to_string(),
            key: "a".to_string(),
        })
    );
    Ok(())
}

#[test]
fn test_child_errors_abort_the_whole_bind() {
    let err = bind(r#"<cluster><server id="a" port="1"/><server id="b"/></cluster>"#).err();
    assert!(matches!(
        err.as_ref().map(xjconf::Error::kind),
        Some(ErrorKind::MissingAttribute { .. })
    ));
}

#[test]
fn test_unregistered_target_type() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = TypeRegistry::new();
    let err = xjconf::bind_str(&schema, &registry, r#"<server port="1"/>"#).err();
    assert_eq!(err.map(|e| e.kind().clone()), Some(ErrorKind::Configuration));
    Ok(())
}

#[test]
fn test_depth_limit() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let options = BindOptions {
        max_depth: 1,
        ..BindOptions::default()
    };
    let binder = Binder::new(&schema, &registry).with_options(options);
    let err = binder.bind_str("<list><item>a</item></list>").err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::MaxDepthExceeded { max: 1 })
    );
    Ok(())
}

#[test]
fn test_zero_depth_limits_fall_back_to_ceiling() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let options = BindOptions {
        max_depth: 0,
        reader: Config::unlimited(),
        ..BindOptions::default()
    };
    let binder = Binder::new(&schema, &registry).with_options(options);
    let document = format!("{}{}", "<list>".repeat(10_000), "</list>".repeat(10_000));
    let err = binder.bind_str(&document).err();
    assert_eq!(
        err.map(|e| e.kind().clone()),
        Some(ErrorKind::MaxDepthExceeded { max: DEPTH_CEILING })
    );
    Ok(())
}

#[test]
fn test_check_runs_without_constructing() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = TypeRegistry::new();
    let binder = Binder::new(&schema, &registry);

    let tree = binder.parse(r#"<cluster><server id="a" port="1"/></cluster>"#)?;
    binder.check(&tree)?;

    let bad = binder.parse(r#"<cluster><server id="a" port="x"/></cluster>"#)?;
    assert!(matches!(
        binder.check(&bad).err().as_ref().map(xjconf::Error::kind),
        Some(ErrorKind::ValueConversion { .. })
    ));
    Ok(())
}

#[test]
fn test_schema_verify() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    schema.verify(&registry())?;

    let mut partial = TypeRegistry::new();
    partial.register_bindable::<Server>("app.Server");
    assert!(schema.verify(&partial).is_err());
    Ok(())
}

#[test]
fn test_binder_is_reusable() -> Result<(), Box<dyn std::error::Error>> {
    let schema = schema()?;
    let registry = registry();
    let binder = Binder::new(&schema, &registry);
    for port in [1, 2, 3] {
        let server: Server = binder
            .bind_str(&format!(r#"<server port="{port}"/>"#))?
            .downcast()?;
        assert_eq!(server.port, port);
    }
    Ok(())
}

#[test]
fn test_leading_byte_order_mark_ignored() -> Result<(), Box<dyn std::error::Error>> {
    let server: Server = bind("\u{FEFF}<?xml version=\"1.0\"?><server port=\"1\"/>")?.downcast()?;
    assert_eq!(server.port, 1);
    Ok(())
}

fn assert_sync<T: Sync>() {}

#[test]
fn test_schema_and_registry_shared_across_threads() -> Result<(), Box<dyn std::error::Error>> {
    assert_sync::<Schema>();
    assert_sync::<TypeRegistry>();

    let schema = schema()?;
    let registry = registry();
    std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=4)
            .map(|port| {
                let (schema, registry) = (&schema, &registry);
                scope.spawn(move || -> xjconf::Result<i32> {
                    let binder = Binder::new(schema, registry);
                    let mut last = 0;
                    for _ in 0..50 {
                        let server: Server = binder
                            .bind_str(&format!(r#"<server port="{port}"/>"#))?
                            .downcast()
                            .map_err(|_| xjconf::Error::configuration("not a server"))?;
                        last = server.port;
                    }
                    Ok(last)
                })
            })
            .collect();
        for (port, handle) in (1..=4).zip(handles) {
            assert_eq!(handle.join().ok().and_then(Result::ok), Some(port));
        }
    });
    Ok(())
}
