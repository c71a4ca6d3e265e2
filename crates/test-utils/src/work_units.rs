use std::sync::{Arc, Mutex};

use tagflow::exec::{FnWorkUnit, WorkUnit, WorkUnitError};
use tagflow::filter::Filter;
use tagflow::item::TaggedItem;

/// Work unit returning its inputs unchanged.
pub fn echo(name: &str) -> Arc<FnWorkUnit> {
    Arc::new(FnWorkUnit::new(name, Ok))
}

/// Work unit that always fails with `message`.
pub fn failing(name: &str, message: &str) -> Arc<FnWorkUnit> {
    let message = message.to_string();
    Arc::new(FnWorkUnit::new(name, move |_| {
        Err(WorkUnitError::new(message.clone()))
    }))
}

/// Work unit setting `tag = value` on every input item.
pub fn tagging(name: &str, tag: &str, value: &str) -> Arc<FnWorkUnit> {
    let tag = tag.to_string();
    let value = value.to_string();
    Arc::new(FnWorkUnit::new(name, move |mut items: Vec<TaggedItem>| {
        for item in items.iter_mut() {
            item.set_tag(&tag, value.clone());
        }
        Ok(items)
    }))
}

/// Work unit that records the inputs of every call and echoes them back,
/// optionally failing for batches containing a given item name.
pub struct RecordingWorkUnit {
    name: String,
    consumes: Vec<Filter>,
    fail_on: Option<String>,
    calls: Mutex<Vec<Vec<TaggedItem>>>,
}

impl RecordingWorkUnit {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            consumes: Vec::new(),
            fail_on: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn consuming(mut self, filter: Filter) -> Self {
        self.consumes.push(filter);
        self
    }

    pub fn failing_on(mut self, item_name: &str) -> Self {
        self.fail_on = Some(item_name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Vec<TaggedItem>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl WorkUnit for RecordingWorkUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn mandatory_consumes(&self) -> Vec<Filter> {
        self.consumes.clone()
    }

    fn run(&self, items: Vec<TaggedItem>) -> Result<Vec<TaggedItem>, WorkUnitError> {
        self.calls.lock().unwrap().push(items.clone());
        if let Some(bad) = &self.fail_on {
            if items.iter().any(|i| &i.name == bad) {
                return Err(WorkUnitError::new(format!("refusing to process '{bad}'")));
            }
        }
        Ok(items)
    }
}
