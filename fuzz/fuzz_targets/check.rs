#![no_main]

use libfuzzer_sys::fuzz_target;
use xjconf::{Binder, MemorySource, TypeRegistry};

const DEFINES: &str = r#"<defines>
  <tag name="cluster" type="app.Cluster">
    <tag name="server" type="app.Server" keyAttribute="id">
      <attribute name="port" type="int" required="true"/>
      <attribute name="host" default="localhost"/>
    </tag>
  </tag>
  <tag name="list" type="app.List" indexed="true">
    <tag name="item" type="string"/>
  </tag>
</defines>"#;

fuzz_target!(|data: &[u8]| {
    let (Ok(schema), Ok(document)) = (xjconf::load_schema(DEFINES), std::str::from_utf8(data))
    else {
        return;
    };
    let registry = TypeRegistry::new();
    let source = MemorySource::new().with("part.xml", "<item>x</item>");
    let binder = Binder::new(&schema, &registry);
    if let Ok(tree) = binder.parse_with_includes(document, &source) {
        let _ = binder.check(&tree);
    }
});
