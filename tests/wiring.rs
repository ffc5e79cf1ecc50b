use std::sync::Arc;

use kumiki::*;

pub trait Store: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

#[derive(Default, DeepClone, Component)]
#[component(implements(dyn Store))]
pub struct MemoryStore {
    pub prefix: String,
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        Some(format!("{}{}", self.prefix, key))
    }
}

#[derive(Default, DeepClone, Component)]
pub struct Limits {
    pub max: u32,
}

#[derive(Default, DeepClone, Component)]
pub struct Handler {
    #[inject]
    pub store: Option<Interface<dyn Store>>,
    #[inject(name = "greeting")]
    pub greeting: Option<Arc<String>>,
    #[inject]
    pub limits: Option<Arc<Limits>>,
}

#[derive(Default, DeepClone, Component)]
pub struct Server {
    #[inject]
    pub handler: Option<Arc<Handler>>,
    #[inject("port")]
    pub port: Option<Arc<u16>>,
}

fn injector() -> Result<Injector, WiringError> {
    let injector = Injector::new();
    injector.provide(Arc::new(MemoryStore {
        prefix: "mem:".into(),
    }))?;
    injector.provide_named("greeting", Arc::new("hello".to_string()))?;
    injector.provide_named("port", Arc::new(8080u16))?;
    Ok(injector)
}

#[test]
fn graph_is_wired_depth_first() -> Result<(), WiringError> {
    let injector = injector()?;
    let server: Arc<Server> = injector.instance()?;

    assert_eq!(**server.port.as_ref().unwrap(), 8080);
    let handler = server.handler.as_ref().unwrap();
    assert_eq!(handler.greeting.as_deref().map(String::as_str), Some("hello"));
    assert_eq!(handler.store.as_ref().unwrap().get("k").as_deref(), Some("mem:k"));
    assert_eq!(handler.limits.as_ref().unwrap().max, 0);

    // Synthesized records are shared with later requests but not enumerated
    let again: Arc<Handler> = injector.instance()?;
    assert!(Arc::ptr_eq(handler, &again));
    assert!(injector.lookup::<Limits>().unwrap().is_synthesized());
    assert_eq!(injector.providers().len(), 4);
    Ok(())
}

#[test]
fn seeded_fields_take_precedence() -> Result<(), WiringError> {
    let injector = injector()?;
    let seed = Server {
        port: Some(Arc::new(9090)),
        ..Default::default()
    };

    let server = injector.resolve_from(seed, Scope::Shared)?;
    assert_eq!(**server.port.as_ref().unwrap(), 9090);
    assert!(server.handler.is_some());
    Ok(())
}

#[test]
fn errors_carry_field_context() {
    let injector = Injector::new();
    let err = injector.instance::<Handler>().err().unwrap();

    assert_eq!(err.class(), ErrorClass::Resolution);
    let message = err.to_string();
    assert!(message.contains("store"), "{}", message);
    assert!(message.contains("Handler"), "{}", message);
    assert!(injector.providers().is_empty());
}

#[test]
fn global_injector_is_shared() -> Result<(), WiringError> {
    global().provide_named("wiring-test", Arc::new(7u64))?;
    let provider = global().lookup_named("wiring-test").unwrap();
    assert_eq!(*provider.downcast::<u64>().unwrap(), 7);
    assert!(std::ptr::eq(global(), global()));
    Ok(())
}
