use std::{sync::Arc, time::SystemTime};

use kumiki::*;

// Define regular traits and implementor structs

pub trait Logger: Send + Sync {
    fn log(&self, content: &str);
}

pub trait DateLogger: Send + Sync {
    fn log_date(&self);
}

#[derive(Default, DeepClone, Component)]
#[component(implements(dyn Logger))]
pub struct LoggerImpl {
    pub prefix: String,
}

impl Logger for LoggerImpl {
    fn log(&self, content: &str) {
        println!("{}{}", self.prefix, content);
    }
}

#[derive(Default, DeepClone, Component)]
#[component(implements(dyn DateLogger))]
pub struct DateLoggerImpl {
    #[inject]
    pub logger: Option<Interface<dyn Logger>>,
    #[inject("epoch")]
    pub epoch: Option<Arc<SystemTime>>,
}

impl DateLogger for DateLoggerImpl {
    fn log_date(&self) {
        let (Some(logger), Some(epoch)) = (&self.logger, &self.epoch) else {
            return;
        };
        let now = SystemTime::now()
            .duration_since(**epoch)
            .unwrap_or_default();
        logger.log(&format!("{}s since epoch", now.as_secs()));
    }
}

// The application only knows about the traits
#[derive(Default, DeepClone, Component)]
pub struct App {
    #[inject]
    pub dates: Option<Interface<dyn DateLogger>>,
}

fn main() -> Result<(), WiringError> {
    let injector = Injector::new();
    injector.provide(Arc::new(LoggerImpl {
        prefix: "[demo] ".into(),
    }))?;
    injector.provide_named("epoch", Arc::new(SystemTime::UNIX_EPOCH))?;
    // Build and register the implementation so that it can be found through its interface
    let _: Arc<DateLoggerImpl> = injector.instance()?;

    let app: Arc<App> = injector.instance()?;
    if let Some(dates) = &app.dates {
        dates.log_date();
    }

    // An isolated copy does not share anything with the registered instance
    let copy: Arc<App> = injector.resolve(Scope::Isolated)?;
    assert!(!Arc::ptr_eq(&app, &copy));

    for provider in injector.providers() {
        println!("{:?}", provider);
    }

    Ok(())
}
